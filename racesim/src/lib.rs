pub mod core {
    pub mod car;
    pub mod collision;
    pub mod contestant;
    pub mod driver;
    pub mod handle_race;
    pub mod race;
    pub mod state_handler;
    pub mod track;
}
pub mod interfaces {
    pub mod state_interface;
}
pub mod post {
    pub mod race_result;
}
pub mod pre {
    pub mod read_sim_pars;
    pub mod sim_opts;
}
