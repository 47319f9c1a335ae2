use crate::core::car::{CarTuning, Controls};
use crate::core::collision::TrackCorridor;
use crate::core::contestant::ControlSource;
use crate::core::race::{RaceSession, SessionError};
use crate::core::track::Circuit;
use crate::interfaces::state_interface::{RaceState, MAX_STATE_UPDATE_FREQUENCY};
use crate::post::race_result::RaceResult;
use crate::pre::read_sim_pars::{ControlKind, SimPars};
use anyhow::Context;
use flume::Sender;
use std::collections::HashMap;
use std::rc::Rc;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// build_session creates the session with all contestants of the parameter set. `seed` overrides
/// the seed of the session parameters.
pub fn build_session(
    sim_pars: &SimPars,
    circuit: Rc<Circuit>,
    seed: Option<u64>,
) -> anyhow::Result<RaceSession> {
    let mut session_pars = sim_pars.session_pars.to_owned();
    if seed.is_some() {
        session_pars.seed = seed;
    }
    let mut session = RaceSession::new(&session_pars, circuit);

    // every car type is loaded once and shared by all contestants driving it
    let mut tunings: HashMap<&str, Rc<CarTuning>> = HashMap::with_capacity(sim_pars.car_pars_all.len());
    for (car_name, car_pars) in sim_pars.car_pars_all.iter() {
        let mut car_pars = car_pars.to_owned();
        if car_pars.name.is_empty() {
            car_pars.name = car_name.to_owned();
        }
        tunings.insert(car_name.as_str(), Rc::new(CarTuning::from_pars(&car_pars)));
    }

    for contestant_pars in sim_pars.contestants.iter() {
        let tuning = Rc::clone(
            tunings
                .get(contestant_pars.car.as_str())
                .ok_or_else(|| SessionError::UnknownCar(contestant_pars.car.to_owned()))?,
        );
        let id = contestant_pars.id.as_str();
        let slot = contestant_pars.grid_slot;

        match contestant_pars.control {
            ControlKind::Human => {
                session.add_contestant(id, tuning, ControlSource::Human(Controls::default()), slot)?
            }
            ControlKind::NetworkMirror => {
                session.add_contestant(id, tuning, ControlSource::NetworkMirror(None), slot)?
            }
            ControlKind::Ai => {
                let personality = session.add_ai_contestant(id, tuning, slot)?;
                log::debug!(
                    "{} drives with skill {:.1} and aggression {:.1}",
                    id,
                    personality.skill,
                    personality.aggression
                );
            }
        }
    }

    Ok(session)
}

/// handle_race creates and simulates a session on the basis of the inserted parameters, and
/// returns the results for post-processing. If a sender is inserted, the session runs in (scaled)
/// real time and race states are streamed through it.
pub fn handle_race(
    sim_pars: &SimPars,
    timestep_size: f64,
    max_race_time: f64,
    seed: Option<u64>,
    tx: Option<&Sender<RaceState>>,
    realtime_factor: f64,
) -> anyhow::Result<RaceResult> {
    let circuit = Rc::new(Circuit::new(&sim_pars.circuit_pars)?);
    let terrain = TrackCorridor::new(&circuit);
    let mut session = build_session(sim_pars, Rc::clone(&circuit), seed)?;

    log::info!(
        "Simulating {} contestants on {} ({} path points) with a time step size of {:.3}s",
        session.get_no_contestants(),
        circuit.name,
        circuit.no_points(),
        timestep_size
    );

    let mut t_race_update_print = 0.0;
    let mut t_race_update_state = 0.0;

    while !session.is_finished() && session.cur_racetime < max_race_time {
        let t_start = Instant::now();
        session.tick(timestep_size, &terrain);

        if session.cur_racetime > t_race_update_print + 0.9999 {
            log::debug!(
                "Simulating... Current race time is {:.3}s, leader is {}",
                session.cur_racetime,
                session
                    .contestant_at_position(1)
                    .map_or("-", |c| c.id.as_str())
            );
            t_race_update_print = session.cur_racetime;
        }

        // check if sender was inserted -> in that case simulate in real time
        if let Some(tx) = tx {
            if session.cur_racetime > t_race_update_state + 1.0 / MAX_STATE_UPDATE_FREQUENCY - 0.001 {
                tx.send(session.get_race_state())
                    .context("Failed to send race state!")?;
                t_race_update_state = session.cur_racetime;
            }

            // sleep until time step is finished in real time as well (calculation in ms)
            let t_sleep = (timestep_size * 1000.0 / realtime_factor) as i64
                - t_start.elapsed().as_millis() as i64;

            if t_sleep > 0 {
                sleep(Duration::from_millis(t_sleep as u64));
            } else {
                log::warn!("Could not keep up with real time!");
            }
        }
    }

    if !session.is_finished() {
        log::warn!(
            "Session stopped at the race time limit of {:.1}s before all contestants finished",
            max_race_time
        );
    }

    let result = session.get_race_result();

    // send final result once
    if let Some(tx) = tx {
        let final_msg = RaceState {
            final_result: Some(result.to_owned()),
            ..session.get_race_state()
        };
        tx.send(final_msg)
            .context("Failed to send final race result!")?;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::car::CarPars;
    use crate::core::race::{RaceMode, SessionPars};
    use crate::core::track::tests::square_circuit_pars;
    use crate::pre::read_sim_pars::ContestantPars;

    fn sim_pars(control: ControlKind) -> SimPars {
        let mut car_pars_all = HashMap::new();
        car_pars_all.insert(String::from("gt"), CarPars::default());
        SimPars {
            session_pars: SessionPars {
                mode: RaceMode::Race,
                laps: 1,
                countdown_s: 0.5,
                finish_grace_s: 1.0,
                seed: Some(3),
            },
            circuit_pars: square_circuit_pars(100.0, 10),
            car_pars_all,
            contestants: vec![
                ContestantPars {
                    id: String::from("c1"),
                    car: String::from("gt"),
                    control,
                    grid_slot: 0,
                },
                ContestantPars {
                    id: String::from("c2"),
                    car: String::from("gt"),
                    control,
                    grid_slot: 1,
                },
            ],
        }
    }

    #[test]
    fn test_build_session() {
        let pars = sim_pars(ControlKind::Ai);
        let circuit = Rc::new(Circuit::new(&pars.circuit_pars).unwrap());
        let session = build_session(&pars, Rc::clone(&circuit), None).unwrap();
        assert_eq!(session.get_no_contestants(), 2);
        // unnamed car pars take the name of their key
        assert_eq!(session.get_contestant("c1").unwrap().tuning.name, "gt");
        assert!(Rc::ptr_eq(
            &session.get_contestant("c1").unwrap().tuning,
            &session.get_contestant("c2").unwrap().tuning
        ));
    }

    #[test]
    fn test_unknown_car_and_grid_slot() {
        let mut pars = sim_pars(ControlKind::Human);
        pars.contestants[1].car = String::from("kart");
        let circuit = Rc::new(Circuit::new(&pars.circuit_pars).unwrap());
        let err = build_session(&pars, Rc::clone(&circuit), None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SessionError>(),
            Some(&SessionError::UnknownCar(String::from("kart")))
        );

        let mut pars = sim_pars(ControlKind::Human);
        pars.contestants[1].grid_slot = 9;
        let err = build_session(&pars, circuit, None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SessionError>(),
            Some(&SessionError::GridSlotOutOfRange(9))
        );
    }

    #[test]
    fn test_time_limit_stops_headless_run() {
        // parked human cars never finish
        let pars = sim_pars(ControlKind::Human);
        let result = handle_race(&pars, 0.1, 5.0, None, None, 1.0).unwrap();
        assert_eq!(result.classification.len(), 2);
        assert!(result.racetime >= 5.0 && result.racetime < 5.2);
        assert!(result.classification.iter().all(|e| !e.finished && e.compl_laps == 0));
        assert!(result.fastest_lap.is_none());
    }

    #[test]
    fn test_streams_states_and_final_result() {
        let pars = sim_pars(ControlKind::Human);
        let (tx, rx) = flume::unbounded();
        let result = handle_race(&pars, 0.05, 1.0, None, Some(&tx), 1000.0).unwrap();

        let states: Vec<RaceState> = rx.try_iter().collect();
        assert!(states.len() >= 10);
        assert!(states[..states.len() - 1].iter().all(|s| s.final_result.is_none()));
        let last = states.last().unwrap();
        assert_eq!(last.contestants.len(), 2);
        assert_eq!(
            last.final_result.as_ref().unwrap().classification,
            result.classification
        );
    }
}
