//! Record and replay tests
//!
//! A session driven through the input layer must replay, from its JSON
//! document alone, to the same states after every action and at the end.

use conference_core::{demo_scenario, DualRng, Scenario, SimulatorModel};
use conference_session::{
    PlaybackController, PlaybackError, PlaybackPhase, SessionConfig, SessionController,
};
use session_events::RecordedSession;

/// Runs `ticks` ticks, performing script steps through the input layer.
fn drive(session: &mut SessionController, scenario: &Scenario, ticks: u64) {
    for _ in 0..ticks {
        session.tick();
        let tick = session.model().tick();
        let due: Vec<_> = scenario
            .steps_at(tick)
            .map(|s| s.request.clone())
            .collect();
        for request in due {
            session.perform_via_input(&request);
        }
    }
}

/// Runs the demo script through the input layer while recording.
fn record_demo(scenario: &Scenario, rng: DualRng, ticks: u64) -> RecordedSession {
    let model = scenario.build_model().unwrap();
    let mut session = SessionController::new(model, SessionConfig::default(), rng);
    session.start_recording().unwrap();

    drive(&mut session, scenario, ticks);
    session.stop_recording().unwrap()
}

/// Test that the full demo replays in sync from disk
#[test]
fn test_demo_replays_from_file() {
    let scenario = demo_scenario();
    let recorded = record_demo(&scenario, DualRng::seeded(7), 1000);
    assert_eq!(recorded.actions.len(), scenario.script.len());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, recorded.to_json().unwrap()).unwrap();
    let loaded = RecordedSession::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();

    let mut playback = PlaybackController::new(loaded, None).unwrap();
    let report = playback.run_to_end().unwrap();

    assert_eq!(report.actions_verified, scenario.script.len());
    assert!(report.final_state_verified);
    assert_eq!(report.ticks, 1000);

    let final_state = recorded.final_state.as_ref().unwrap();
    let replayed = playback.session().simulator().verification_snapshot();
    assert_eq!(replayed.targets, final_state.snapshot.targets);
    assert_eq!(replayed.blended, final_state.snapshot.blended);
    assert_eq!(playback.session().simulator().rng_counts().model, final_state.rng.model);
}

/// Test that recording an entropy-seeded session still replays
#[test]
fn test_unseeded_session_gets_seed() {
    let scenario = demo_scenario();
    let recorded = record_demo(&scenario, DualRng::unseeded(), 300);

    let mut playback = PlaybackController::new(recorded, None).unwrap();
    let report = playback.run_to_end().unwrap();
    assert_eq!(playback.phase(), &PlaybackPhase::Finished);
    assert!(report.final_state_verified);
}

/// Test that a recording started mid-session replays from that point
#[test]
fn test_recording_started_mid_session() {
    let scenario = demo_scenario();
    let model = scenario.build_model().unwrap();
    let mut session = SessionController::with_seed(model, SessionConfig::default(), 21);

    // Some model draws and view activity before the recording starts
    drive(&mut session, &scenario, 150);
    session.start_recording().unwrap();
    drive(&mut session, &scenario, 300);
    let recorded = session.stop_recording().unwrap();
    assert!(recorded.actions.iter().all(|a| a.tick > 150));
    let initial = SimulatorModel::from_json(recorded.initial_state.clone()).unwrap();
    assert_eq!(initial.tick(), 150);

    let mut playback = PlaybackController::new(recorded, None).unwrap();
    let report = playback.run_to_end().unwrap();
    assert!(report.final_state_verified);
    assert_eq!(report.ticks, 450);
}

/// Test that a tampered action snapshot is reported, not replayed past
#[test]
fn test_divergence_is_reported() {
    let scenario = demo_scenario();
    let mut recorded = record_demo(&scenario, DualRng::seeded(3), 300);
    let last = recorded.actions.len() - 1;
    recorded.actions[last].rng.model += 1;

    let mut playback = PlaybackController::new(recorded, None).unwrap();
    match playback.run_to_end() {
        Err(PlaybackError::Mismatch(mismatch)) => {
            assert_eq!(mismatch.index, Some(last));
            let bundle = playback.diagnostic_bundle(&mismatch);
            let json = bundle.to_json().unwrap();
            assert!(json.contains("model_rng_calls"));
        }
        other => panic!("expected a mismatch, got {:?}", other),
    }
}
