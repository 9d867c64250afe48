use std::thread;
use std::time::Duration;

use lodeb::debugger::session::{IndexStatus, SessionPhase};
use lodeb::{Session, SessionEvent};

use crate::support::{
    lock, loaded_session, running_session, wait_for_index, FakeEngine, FakeTarget, SAMPLE_EXE, SAMPLE_SYMBOLS,
};

#[test]
fn test_empty_exe_path_stays_without_target() {
    let mut session = Session::new(FakeEngine::new());
    session.push_event(SessionEvent::LoadTarget);
    session.tick();

    assert_eq!(session.phase(), SessionPhase::NoTarget);
    assert!(session.engine().created.is_empty());
}

#[test]
fn test_whitespace_exe_path_is_empty() {
    let mut session = Session::new(FakeEngine::new());
    session.target_settings_mut().exe_path = "   ".to_string();
    session.push_event(SessionEvent::LoadTarget);
    session.tick();

    assert!(session.engine().created.is_empty());
}

#[test]
fn test_invalid_target_is_reported_and_ignored() {
    let mut session = Session::new(FakeEngine::new());
    session.target_settings_mut().exe_path = "/no/such/exe".to_string();
    session.push_event(SessionEvent::LoadTarget);
    session.tick();

    assert_eq!(session.engine().created, vec!["/no/such/exe".to_string()]);
    assert_eq!(session.phase(), SessionPhase::NoTarget);
    assert!(session.target().is_none());
}

#[test]
fn test_load_builds_index_in_background() {
    let (target, gate) = FakeTarget::new(SAMPLE_EXE, SAMPLE_SYMBOLS).gated();
    let mut session = Session::new(FakeEngine::new().with_target(target));
    session.target_settings_mut().exe_path = SAMPLE_EXE.to_string();
    session.push_event(SessionEvent::LoadTarget);
    session.tick();

    assert_eq!(session.phase(), SessionPhase::TargetLoading);
    assert!(matches!(session.index_status(), IndexStatus::Loading));
    assert_eq!(session.target().map(|t| t.executable()), Some(SAMPLE_EXE.to_string()));

    gate.send(()).unwrap();
    wait_for_index(&mut session);

    assert_eq!(session.phase(), SessionPhase::TargetReady);
    match session.index_status() {
        IndexStatus::Ready(index) => assert_eq!(index.len(), 3),
        other => panic!("Expected a ready index, got {:?}", other),
    }
}

#[test]
fn test_superseded_index_build_is_discarded() {
    let (old, release_old) = FakeTarget::new("/build/old", &[("old_function", "/src/old.c", 1)]).gated();
    let engine = FakeEngine::new()
        .with_target(old)
        .with_target(FakeTarget::new(SAMPLE_EXE, SAMPLE_SYMBOLS));
    let mut session = Session::new(engine);

    session.target_settings_mut().exe_path = "/build/old".to_string();
    session.push_event(SessionEvent::LoadTarget);
    session.tick();
    let old_generation = session.target().map(|t| t.generation());

    session.target_settings_mut().exe_path = SAMPLE_EXE.to_string();
    session.push_event(SessionEvent::LoadTarget);
    session.tick();
    let new_generation = session.target().map(|t| t.generation());
    assert_ne!(old_generation, new_generation);

    wait_for_index(&mut session);

    // Let the superseded build finish and hand in its result
    release_old.send(()).unwrap();
    for _ in 0..20 {
        thread::sleep(Duration::from_millis(5));
        session.tick();
    }

    let IndexStatus::Ready(index) = session.index_status() else {
        panic!("Expected a ready index");
    };
    assert_eq!(index.len(), 3);
    assert!(index.matches("old_function", usize::MAX).is_empty());
    assert_eq!(session.target().map(|t| t.generation()), new_generation);
}

#[test]
fn test_reload_replaces_target_state() {
    let (mut session, _target) = loaded_session();
    session.push_event(SessionEvent::ToggleBreakpoint(lodeb::FileLocation::new("/src/main.c", 3)));
    session.tick();
    assert_eq!(session.breakpoints().map(|b| b.count()), Some(1));

    session.push_event(SessionEvent::LoadTarget);
    session.tick();

    assert_eq!(session.breakpoints().map(|b| b.count()), Some(0));
    assert_eq!(session.engine().created.len(), 2);
}

#[test]
fn test_reload_kills_live_process() {
    let (mut session, target) = running_session();
    let generation = session.target().map(|t| t.generation());

    session.push_event(SessionEvent::LoadTarget);
    session.tick();

    assert_eq!(lock(&target.script).calls, vec!["kill"]);
    assert!(session.target().is_some_and(|t| t.process().is_none()));
    assert_ne!(session.target().map(|t| t.generation()), generation);
}

#[test]
fn test_failed_reload_keeps_live_target() {
    let (mut session, target) = running_session();
    let generation = session.target().map(|t| t.generation());

    session.target_settings_mut().exe_path = "/no/such/exe".to_string();
    session.push_event(SessionEvent::LoadTarget);
    session.tick();

    assert_eq!(session.phase(), SessionPhase::ProcessRunning);
    assert!(lock(&target.script).calls.is_empty());
    assert_eq!(session.target().map(|t| t.generation()), generation);
    assert_eq!(session.target().map(|t| t.executable()), Some(SAMPLE_EXE.to_string()));
}

#[test]
fn test_events_raised_during_tick_wait_for_next_tick() {
    let mut session = Session::new(FakeEngine::new());
    session.push_event(SessionEvent::ViewSource(lodeb::FileLocation::new("/src/a.c", 1)));
    assert_eq!(session.pending_events().len(), 1);

    session.tick();
    assert!(session.pending_events().is_empty());
    assert_eq!(session.source_view().map(|v| v.path()), Some("/src/a.c"));
}
