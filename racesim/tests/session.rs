use racesim::core::car::CarTuning;
use racesim::core::collision::TrackCorridor;
use racesim::core::race::{RaceMode, RaceSession, SessionPars};
use racesim::core::track::{Circuit, CircuitPars, CircuitPointPars, GridSlot};
use std::f64::consts::PI;
use std::rc::Rc;

const DT: f64 = 1.0 / 60.0;
const NO_CARS: usize = 4;
const LAPS: usize = 2;

fn point(x: f64, z: f64) -> CircuitPointPars {
    CircuitPointPars {
        x,
        z,
        alt_x: None,
        alt_z: None,
        speed: None,
        intermediate: false,
    }
}

/// oval builds a stadium shaped circuit: two 200 m straights along z joined by half circles of
/// 60 m radius, one point every 10 m. Both corner entries carry a suggested speed of 20 m/s.
fn oval() -> Circuit {
    let straight = 200.0;
    let radius = 60.0;
    let step = 10.0;
    let no_straight = (straight / step) as usize;
    let no_corner = (PI * radius / step) as usize;

    let mut points = Vec::new();
    for k in 0..no_straight {
        points.push(point(0.0, k as f64 * step));
    }
    for k in 0..no_corner {
        let phi = PI * k as f64 / no_corner as f64;
        points.push(point(-radius + radius * phi.cos(), straight + radius * phi.sin()));
    }
    for k in 0..no_straight {
        points.push(point(-2.0 * radius, straight - k as f64 * step));
    }
    for k in 0..no_corner {
        let phi = PI + PI * k as f64 / no_corner as f64;
        points.push(point(-radius + radius * phi.cos(), radius * phi.sin()));
    }

    points[no_straight].speed = Some(20.0);
    points[2 * no_straight + no_corner].speed = Some(20.0);

    let n = points.len();
    points[no_straight + no_corner / 2].intermediate = true;
    points[2 * no_straight + no_corner + no_corner / 2].intermediate = true;
    points[n - 1].intermediate = true;

    let grid = (0..NO_CARS)
        .map(|i| GridSlot {
            x: if i % 2 == 0 { 2.0 } else { -2.0 },
            z: -8.0 * i as f64,
            orientation: 0.0,
        })
        .collect();

    Circuit::new(&CircuitPars {
        name: String::from("oval"),
        track_half_width: 8.0,
        wall_distance: 14.0,
        points,
        grid,
        cameras: vec![],
    })
    .unwrap()
}

fn ai_session(mode: RaceMode, seed: u64) -> (RaceSession, Rc<Circuit>) {
    let circuit = Rc::new(oval());
    let pars = SessionPars {
        mode,
        laps: LAPS,
        countdown_s: 1.0,
        finish_grace_s: 30.0,
        seed: Some(seed),
    };
    let mut session = RaceSession::new(&pars, Rc::clone(&circuit));
    let tuning = Rc::new(CarTuning::default());
    for slot in 0..NO_CARS {
        session
            .add_ai_contestant(&format!("ai_{}", slot + 1), Rc::clone(&tuning), slot)
            .unwrap();
    }
    (session, circuit)
}

#[test]
fn test_ai_session_runs_to_completion() {
    let (mut session, circuit) = ai_session(RaceMode::Race, 11);
    let terrain = TrackCorridor::new(&circuit);

    let mut was_started = false;
    let mut was_finished = false;
    let mut step = 0;

    while !session.is_finished() && session.cur_racetime < 200.0 {
        let no_laps_before: Vec<usize> = session
            .get_contestants()
            .iter()
            .map(|c| c.sh.get_laps().len())
            .collect();

        session.tick(DT, &terrain);
        step += 1;

        // flags are one-way and finished implies started
        assert!(!was_started || session.is_started());
        assert!(!was_finished || session.is_finished());
        assert!(!session.is_finished() || session.is_started());
        was_started = session.is_started();
        was_finished = session.is_finished();

        for (c, no_before) in session.get_contestants().iter().zip(no_laps_before) {
            assert!(c.state.is_finite(), "{} left the finite state space", c.id);
            assert!(c.state.gear >= -1 && c.state.gear <= c.tuning.gears as i32);
            assert!(c.state.rpm >= c.tuning.neutral_rpm && c.state.rpm <= c.tuning.max_rpm);

            // lap records are only appended, one at a time
            let no_after = c.sh.get_laps().len();
            if c.sh.get_new_lap() {
                assert_eq!(no_after, no_before + 1);
                assert_eq!(c.sh.get_intermediate(), 0);
                assert!(c.sh.get_laps()[no_before - 1].completed);
            } else {
                assert!(no_after == no_before || no_after == no_before + 1);
            }
        }

        if step % 60 == 0 {
            let mut positions: Vec<usize> = session
                .get_contestants()
                .iter()
                .map(|c| session.race_position(&c.id).unwrap())
                .collect();
            positions.sort_unstable();
            assert_eq!(positions, (1..=NO_CARS).collect::<Vec<usize>>());

            for p in 1..=NO_CARS {
                let c = session.contestant_at_position(p).unwrap();
                assert_eq!(session.race_position(&c.id), Some(p));
            }
        }
    }

    assert!(session.is_finished());
    for c in session.get_contestants() {
        assert!(c.finished, "{} did not finish", c.id);
        assert_eq!(c.sh.get_compl_lap(), LAPS);
        assert_eq!(c.sh.get_laps().len(), LAPS + 1);
        assert!(c.sh.get_laps()[..LAPS].iter().all(|l| l.completed));
        assert!(c.sh.get_laps()[..LAPS].iter().all(|l| l.sectors_ms.iter().all(|&t| t > 0)));
    }

    let result = session.get_race_result();
    assert_eq!(result.classification.len(), NO_CARS);
    for (i, entry) in result.classification.iter().enumerate() {
        assert_eq!(entry.position, i + 1);
        assert_eq!(entry.lap_times_ms.len(), LAPS);
        assert!(entry.finished);
    }
    assert_eq!(result.track_records.len(), NO_CARS);
    assert!(result.track_records.iter().all(|r| r.circuit_name == "oval"));

    let holder = session.fastest_lap_holder().unwrap();
    let best = holder.sh.get_best_lap_time().unwrap();
    assert!(session
        .get_contestants()
        .iter()
        .all(|c| c.sh.get_best_lap_time().unwrap() >= best));
    assert_eq!(result.fastest_lap, Some((holder.id.to_owned(), best)));
}

#[test]
fn test_time_mode_leader_holds_best_lap() {
    let (mut session, circuit) = ai_session(RaceMode::Time, 5);
    let terrain = TrackCorridor::new(&circuit);

    while !session.is_finished() && session.cur_racetime < 200.0 {
        session.tick(DT, &terrain);
    }

    let leader = session.contestant_at_position(1).unwrap();
    let best = leader.sh.get_best_lap_time().unwrap();
    for c in session.get_contestants() {
        assert!(c.sh.get_best_lap_time().unwrap() >= best);
    }
}

#[test]
fn test_same_seed_same_session() {
    let run = |seed: u64| {
        let (mut session, circuit) = ai_session(RaceMode::Race, seed);
        let terrain = TrackCorridor::new(&circuit);
        for _ in 0..1200 {
            session.tick(DT, &terrain);
        }
        session.snapshots()
    };
    assert_eq!(run(3), run(3));
}
