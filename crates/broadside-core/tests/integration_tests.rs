//! Integration tests for the Broadside match engine.
//!
//! These tests verify complete match flows from setup through to victory.

use broadside_core::*;
use pretty_assertions::assert_eq;
use std::collections::HashSet;

/// A valid fleet: no overlaps, no contact, all on the board
fn human_fleet() -> Vec<Placement> {
    vec![
        Placement::new(1, 9, 4, Orientation::Horizontal),
        Placement::new(2, 1, 5, Orientation::Vertical),
        Placement::new(3, 5, 1, Orientation::Horizontal),
        Placement::new(4, 6, 6, Orientation::Horizontal),
        Placement::new(5, 7, 2, Orientation::Vertical),
    ]
}

fn alternate_fleet() -> Vec<Placement> {
    vec![
        Placement::new(1, 0, 0, Orientation::Vertical),
        Placement::new(2, 0, 9, Orientation::Vertical),
        Placement::new(3, 9, 7, Orientation::Horizontal),
        Placement::new(4, 4, 4, Orientation::Horizontal),
        Placement::new(5, 7, 4, Orientation::Vertical),
    ]
}

/// Dual-seat match with both fleets placed
fn dual_seat_match() -> Match {
    let mut game = Match::with_seed("Alice", MatchMode::DualSeat, 42).unwrap();
    game.claim_seat("Bob").unwrap();
    game.set_fleet(SEAT_ONE, &human_fleet()).unwrap();
    game.set_fleet(SEAT_TWO, &alternate_fleet()).unwrap();
    game
}

/// Cells a vessel of `fleet` covers
fn vessel_cells(fleet: &[Placement], vessel: VesselId) -> Vec<Coord> {
    let placement = fleet.iter().find(|p| p.id == vessel).unwrap();
    let anchor = Coord::new(placement.row, placement.col).unwrap();
    Vessel::footprint(anchor, placement.length, placement.orientation).unwrap()
}

/// Fire down the grid in row-major order until a shot misses
fn fire_until_miss(game: &mut Match, cells: &mut impl Iterator<Item = Coord>) -> ShotReport {
    loop {
        let cell = cells.next().unwrap();
        let report = game.fire_shot(SEAT_ONE, cell.row, cell.col).unwrap();
        if !report.outcome.hit {
            return report;
        }
    }
}

fn any_own_vessel_sunk(game: &Match, seat: SeatId) -> bool {
    game.view(seat)
        .unwrap()
        .your_board
        .vessels
        .iter()
        .any(|v| v.sunk)
}

#[test]
fn test_valid_fleet_is_fully_placed() {
    for fleet in [human_fleet(), alternate_fleet()] {
        let mut game = Match::new("Alice", MatchMode::DualSeat).unwrap();
        game.set_fleet(SEAT_ONE, &fleet).unwrap();

        let vessels = game.view(SEAT_ONE).unwrap().your_board.vessels;
        assert_eq!(vessels.len(), 5);
        assert!(vessels.iter().all(|v| v.placed && !v.sunk));

        let occupied: HashSet<Coord> = (1..=5).flat_map(|id| vessel_cells(&fleet, id)).collect();
        assert_eq!(occupied.len(), 16);
    }
}

#[test]
fn test_scenario_a_scripted_match_starts_after_human_fleet() {
    let mut game = Match::with_seed("Alice", MatchMode::Scripted, 1).unwrap();
    assert_eq!(game.status(), MatchStatus::Setup);

    let events = game.set_fleet(SEAT_ONE, &human_fleet()).unwrap();

    assert_eq!(game.status(), MatchStatus::Playing);
    assert_eq!(game.current_turn(), SEAT_ONE);
    let scripted_fleet = game.view(SEAT_TWO).unwrap().your_board.vessels;
    assert!(scripted_fleet.iter().all(|v| v.placed));
    assert!(events.contains(&MatchEvent::MatchStarted { first_turn: SEAT_ONE }));
}

#[test]
fn test_scenario_b_miss_hands_turn_to_scripted_seat() {
    let mut game = Match::with_seed("Alice", MatchMode::Scripted, 2).unwrap();
    game.set_fleet(SEAT_ONE, &human_fleet()).unwrap();

    let report = fire_until_miss(&mut game, &mut Coord::all());

    assert_eq!(game.current_turn(), SEAT_TWO);
    assert!(report.scripted_turn_due);

    let reply = game.play_scripted_turn().unwrap();
    assert_eq!(reply.outcome.seat, SEAT_TWO);
    assert_eq!(game.moves().len(), game.seat(SEAT_ONE).unwrap().shots_fired().len() + 1);
}

#[test]
fn test_scenario_c_sinking_the_last_vessel_wins() {
    let mut game = dual_seat_match();

    let carrier = vessel_cells(&alternate_fleet(), 1);
    let mut last = None;
    for cell in &carrier {
        let report = game.fire_shot(SEAT_ONE, cell.row, cell.col).unwrap();
        assert!(report.outcome.hit);
        assert_eq!(game.current_turn(), SEAT_ONE);
        last = Some(report);
    }
    assert_eq!(last.unwrap().outcome.sunk, Some(1));
    assert_eq!(game.status(), MatchStatus::Playing);

    let remaining: Vec<Coord> = (2..=5)
        .flat_map(|id| vessel_cells(&alternate_fleet(), id))
        .collect();
    let mut final_report = None;
    for cell in remaining {
        final_report = Some(game.fire_shot(SEAT_ONE, cell.row, cell.col).unwrap());
    }

    let final_report = final_report.unwrap();
    assert_eq!(final_report.outcome.sunk, Some(5));
    assert!(final_report
        .events
        .contains(&MatchEvent::MatchWon { winner: SEAT_ONE }));
    assert_eq!(game.status(), MatchStatus::Finished);
    assert_eq!(game.winner(), Some(SEAT_ONE));

    // Nothing moves once finished
    assert_eq!(game.fire_shot(SEAT_ONE, 0, 5), Err(MatchError::NotPlaying));
    assert_eq!(
        game.set_fleet(SEAT_ONE, &human_fleet()),
        Err(MatchError::NotInSetup)
    );
}

#[test]
fn test_scenario_d_dual_seat_starts_after_second_fleet() {
    let mut game = Match::new("Alice", MatchMode::DualSeat).unwrap();
    game.claim_seat("Bob").unwrap();

    game.set_fleet(SEAT_ONE, &human_fleet()).unwrap();
    assert_eq!(game.status(), MatchStatus::Setup);

    // Resubmitting during setup replaces the fleet and still waits
    game.set_fleet(SEAT_ONE, &alternate_fleet()).unwrap();
    assert_eq!(game.status(), MatchStatus::Setup);

    game.set_fleet(SEAT_TWO, &human_fleet()).unwrap();
    assert_eq!(game.status(), MatchStatus::Playing);
    assert_eq!(game.current_turn(), SEAT_ONE);
}

#[test]
fn test_repeat_shot_rejected_but_board_is_idempotent() {
    let mut game = dual_seat_match();
    game.fire_shot(SEAT_ONE, 0, 0).unwrap();

    assert_eq!(
        game.fire_shot(SEAT_ONE, 0, 0).unwrap_err().kind(),
        ErrorKind::RuleViolation
    );
    assert_eq!(game.seat(SEAT_ONE).unwrap().shots_fired().len(), 1);
    assert_eq!(game.view(SEAT_TWO).unwrap().your_board.shots.len(), 1);

    // The same carrier as seat two's, on a board of its own
    let mut board = Board::new();
    board
        .place_vessel(1, Coord::new(0, 0).unwrap(), Orientation::Vertical)
        .unwrap();
    board.receive_shot(Coord::new(0, 0).unwrap());
    let again = board.receive_shot(Coord::new(0, 0).unwrap());
    assert!(again.already_shot);
    assert!(again.hit);
    assert_eq!(board.shots().len(), 1);
}

#[test]
fn test_turn_follows_hits_and_misses() {
    let mut game = dual_seat_match();

    for cell in Coord::all() {
        if game.is_finished() {
            break;
        }
        let seat = game.current_turn();
        if game.seat(seat).unwrap().has_fired_at(cell) {
            continue;
        }
        let report = game.fire_shot(seat, cell.row, cell.col).unwrap();
        if game.is_finished() {
            break;
        }
        if report.outcome.hit {
            assert_eq!(game.current_turn(), seat);
        } else {
            assert_eq!(game.current_turn(), Match::opponent_of(seat));
        }
    }
}

#[test]
fn test_rejected_calls_leave_match_usable() {
    let mut game = dual_seat_match();
    let before = game.snapshot().unwrap();

    assert!(game.fire_shot(SEAT_TWO, 0, 0).is_err());
    assert!(game.fire_shot(SEAT_ONE, 10, 0).is_err());
    assert!(game.fire_shot(7, 0, 0).is_err());
    assert!(game.set_fleet(SEAT_ONE, &human_fleet()).is_err());
    assert_eq!(game.snapshot().unwrap(), before);

    assert!(game.fire_shot(SEAT_ONE, 0, 0).is_ok());
}

#[test]
fn test_scripted_opponent_never_repeats_a_cell() {
    for seed in 0..8 {
        let mut game = Match::with_seed("Alice", MatchMode::Scripted, seed).unwrap();
        game.set_fleet(SEAT_ONE, &human_fleet()).unwrap();

        // The human walks the grid in row-major order
        let mut human_cells = Coord::all();
        let mut turns = 0;
        while !game.is_finished() && turns < 400 {
            turns += 1;
            if game.scripted_turn_due() {
                game.play_scripted_turn().unwrap();
                continue;
            }
            let cell = human_cells.next().unwrap();
            game.fire_shot(SEAT_ONE, cell.row, cell.col).unwrap();
        }

        assert!(game.is_finished());
        let scripted_shots = game.seat(SEAT_TWO).unwrap().shots_fired();
        let unique: HashSet<Coord> = scripted_shots.iter().map(FiredShot::coord).collect();
        assert_eq!(unique.len(), scripted_shots.len());
    }
}

#[test]
fn test_scripted_opponent_sinks_a_located_vessel() {
    let mut game = Match::with_seed("Alice", MatchMode::Scripted, 77).unwrap();
    game.set_fleet(SEAT_ONE, &human_fleet()).unwrap();

    // The human walks the grid; every miss hands the computer a turn
    let mut human_cells = Coord::all();
    let mut first_hit_at = None;
    while !any_own_vessel_sunk(&game, SEAT_ONE) {
        assert!(!game.is_finished());
        if game.scripted_turn_due() {
            let report = game.play_scripted_turn().unwrap();
            if report.outcome.hit && first_hit_at.is_none() {
                first_hit_at = Some(game.seat(SEAT_TWO).unwrap().shots_fired().len());
            }
        } else {
            let cell = human_cells.next().unwrap();
            game.fire_shot(SEAT_ONE, cell.row, cell.col).unwrap();
        }
    }

    // Once a vessel is found it goes down within a bounded number of shots
    let found = first_hit_at.unwrap();
    let sunk_at = game.seat(SEAT_TWO).unwrap().shots_fired().len();
    assert!(sunk_at - found <= 12);
}

#[test]
fn test_views_hide_each_others_fleets() {
    let mut game = dual_seat_match();
    game.fire_shot(SEAT_ONE, 0, 0).unwrap();

    let view = game.view(SEAT_ONE).unwrap();
    let json = serde_json::to_value(&view).unwrap();
    assert!(json["opponent_board"].get("vessels").is_none());
    assert_eq!(view.opponent_board.sunk_vessels.len(), 0);
    assert_eq!(view.opponent_name.as_deref(), Some("Bob"));
    assert_eq!(view.your_board.vessels.len(), 5);
}

#[test]
fn test_snapshot_reload_resumes_play() {
    let mut game = Match::with_seed("Alice", MatchMode::Scripted, 13).unwrap();
    game.set_fleet(SEAT_ONE, &human_fleet()).unwrap();

    fire_until_miss(&mut game, &mut Coord::all());

    let mut restored = Match::restore(&game.snapshot().unwrap()).unwrap();
    assert!(restored.scripted_turn_due());
    assert_eq!(restored.view(SEAT_ONE).unwrap(), game.view(SEAT_ONE).unwrap());
    restored.play_scripted_turn().unwrap();
}
