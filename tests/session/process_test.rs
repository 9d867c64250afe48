use lodeb::debugger::engine::{ProcessEvent, StopReason, ThreadId};
use lodeb::debugger::session::{RunState, SessionPhase};
use lodeb::{DebugStateChange, FileLocation, Session, SessionConfig, SessionEvent};

use crate::support::{lock, loaded_session, running_session, FakeEngine, FakeTarget, SAMPLE_EXE, SAMPLE_SYMBOLS};

const MAIN: ThreadId = ThreadId(1);

fn stop_location() -> FileLocation {
    FileLocation::new("/src/main.c", 20)
}

#[test]
fn test_start_without_target_is_ignored() {
    let mut session = Session::new(FakeEngine::new());
    session.push_event(SessionEvent::StartProcess);
    session.tick();

    assert!(session.process().is_none());
    assert_eq!(session.phase(), SessionPhase::NoTarget);
}

#[test]
fn test_start_launches_process() {
    let (session, target) = running_session();

    assert_eq!(session.phase(), SessionPhase::ProcessRunning);
    assert_eq!(session.process().and_then(|p| p.pid()), Some(4242));
    assert_eq!(lock(&target.script).launches, 1);
}

#[test]
fn test_start_twice_keeps_first_process() {
    let (mut session, target) = running_session();
    session.push_event(SessionEvent::StartProcess);
    session.tick();

    assert_eq!(lock(&target.script).launches, 1);
}

#[test]
fn test_failed_launch_leaves_target_ready() {
    let (mut session, target) = loaded_session();
    lock(&target.script).fail_launch = true;

    session.push_event(SessionEvent::StartProcess);
    session.tick();

    assert!(session.process().is_none());
    assert_eq!(session.phase(), SessionPhase::TargetReady);
}

#[test]
fn test_debug_state_change_while_running_is_ignored() {
    let (mut session, target) = running_session();

    for change in [
        DebugStateChange::StepIn,
        DebugStateChange::StepOver,
        DebugStateChange::Continue,
        DebugStateChange::Kill,
    ] {
        session.push_event(SessionEvent::ChangeDebugState(change));
    }
    session.tick();

    assert!(lock(&target.script).calls.is_empty());
    assert_eq!(session.phase(), SessionPhase::ProcessRunning);
}

#[test]
fn test_breakpoint_stop_selects_thread_and_shows_location() {
    let (mut session, target) = running_session();
    lock(&target.script).stop_at(MAIN, StopReason::Breakpoint, stop_location());

    session.tick();

    assert_eq!(session.phase(), SessionPhase::ProcessStopped);
    assert_eq!(session.selected_thread(), Some(MAIN));
    assert_eq!(session.pending_events(), &[SessionEvent::ViewSource(stop_location())]);

    session.tick();
    assert_eq!(session.source_view().map(|v| v.path()), Some("/src/main.c"));
    assert_eq!(session.take_scroll_to_line(), Some(20));
}

#[test]
fn test_step_completion_is_a_user_stop() {
    let (mut session, target) = running_session();
    lock(&target.script).stop_at(MAIN, StopReason::PlanComplete, stop_location());

    session.tick();

    assert_eq!(session.selected_thread(), Some(MAIN));
    assert_eq!(session.pending_events().len(), 1);
}

#[test]
fn test_signal_stop_does_not_move_the_view() {
    let (mut session, target) = running_session();
    lock(&target.script).stop_at(MAIN, StopReason::Signal(11), stop_location());

    session.tick();

    assert_eq!(session.phase(), SessionPhase::ProcessStopped);
    assert_eq!(session.selected_thread(), None);
    assert!(session.pending_events().is_empty());
}

#[test]
fn test_step_and_continue_when_stopped() {
    let (mut session, target) = running_session();
    lock(&target.script).stop_at(MAIN, StopReason::Breakpoint, stop_location());
    session.tick();

    session.push_event(SessionEvent::ChangeDebugState(DebugStateChange::StepOver));
    session.tick();
    assert_eq!(session.process().map(|p| p.run_state()), Some(RunState::Running));

    lock(&target.script).stop_at(MAIN, StopReason::PlanComplete, stop_location());
    session.tick();
    session.push_event(SessionEvent::ChangeDebugState(DebugStateChange::StepIn));
    session.tick();

    lock(&target.script).stop_at(MAIN, StopReason::PlanComplete, stop_location());
    session.tick();
    session.push_event(SessionEvent::ChangeDebugState(DebugStateChange::Continue));
    session.tick();

    assert_eq!(
        lock(&target.script).calls,
        vec!["step_over 0x1", "step_into 0x1", "resume"]
    );
}

#[test]
fn test_refused_control_keeps_process_stopped() {
    let (mut session, target) = running_session();
    lock(&target.script).stop_at(MAIN, StopReason::Breakpoint, stop_location());
    session.tick();
    lock(&target.script).fail_control = true;

    session.push_event(SessionEvent::ChangeDebugState(DebugStateChange::Continue));
    session.tick();

    assert_eq!(session.phase(), SessionPhase::ProcessStopped);
}

#[test]
fn test_kill_then_exit_clears_process() {
    let (mut session, target) = running_session();
    lock(&target.script).stop_at(MAIN, StopReason::Breakpoint, stop_location());
    session.tick();

    session.push_event(SessionEvent::ChangeDebugState(DebugStateChange::Kill));
    session.tick();
    assert_eq!(lock(&target.script).calls, vec!["kill"]);

    lock(&target.script).events.push_back(ProcessEvent::Exited(Some(9)));
    session.tick();

    assert!(session.process().is_none());
    assert_eq!(session.phase(), SessionPhase::TargetReady);
    assert!(session.frames().is_empty());
    assert!(session.threads().is_empty());
}

#[test]
fn test_process_can_be_restarted_after_exit() {
    let (mut session, target) = running_session();
    lock(&target.script).events.push_back(ProcessEvent::Detached);
    session.tick();
    assert!(session.process().is_none());

    session.push_event(SessionEvent::StartProcess);
    session.tick();

    assert_eq!(lock(&target.script).launches, 2);
    assert_eq!(session.phase(), SessionPhase::ProcessRunning);
}

#[test]
fn test_running_notification_resumes() {
    let (mut session, target) = running_session();
    lock(&target.script).stop_at(MAIN, StopReason::Breakpoint, stop_location());
    session.tick();

    lock(&target.script).events.push_back(ProcessEvent::Running);
    session.tick();

    assert_eq!(session.phase(), SessionPhase::ProcessRunning);
}

#[test]
fn test_output_is_collected_every_tick() {
    let (mut session, target) = running_session();
    {
        let mut script = lock(&target.script);
        script.stdout.extend(b"hello\n");
        script.stderr.extend(b"oops\n");
    }

    session.tick();

    assert_eq!(session.output().text(), "hello\noops\n");
}

#[test]
fn test_output_reads_are_bounded() {
    let engine = FakeEngine::new().with_target(FakeTarget::new(SAMPLE_EXE, SAMPLE_SYMBOLS));
    let target = engine.target(SAMPLE_EXE);
    let config = SessionConfig {
        read_chunk: 4,
        output_limit: 6,
    };
    let mut session = Session::with_config(engine, config);
    session.target_settings_mut().exe_path = SAMPLE_EXE.to_string();
    session.push_event(SessionEvent::LoadTarget);
    session.tick();
    session.push_event(SessionEvent::StartProcess);
    session.tick();

    lock(&target.script).stdout.extend(b"0123456789");
    session.tick();
    assert_eq!(session.output().as_bytes(), b"0123");

    session.tick();
    session.tick();
    assert_eq!(session.output().as_bytes(), b"456789");
}

#[test]
fn test_restart_clears_output() {
    let (mut session, target) = running_session();
    lock(&target.script).stdout.extend(b"first run\n");
    lock(&target.script).events.push_back(ProcessEvent::Exited(Some(0)));
    session.tick();
    assert_eq!(session.output().text(), "first run\n");

    session.push_event(SessionEvent::StartProcess);
    session.tick();

    assert!(session.output().is_empty());
}

#[test]
fn test_output_survives_target_reload() {
    let (mut session, target) = running_session();
    lock(&target.script).stdout.extend(b"tail\n");
    session.tick();

    session.push_event(SessionEvent::LoadTarget);
    session.tick();

    assert!(session.process().is_none());
    assert_eq!(session.output().text(), "tail\n");
}

#[test]
fn test_notifications_after_exit_are_not_polled() {
    let (mut session, target) = running_session();
    {
        let mut script = lock(&target.script);
        script.events.push_back(ProcessEvent::Exited(Some(0)));
        script.stop_at(MAIN, StopReason::Breakpoint, stop_location());
    }

    session.tick();

    assert!(session.process().is_none());
    assert_eq!(session.phase(), SessionPhase::TargetReady);
    assert!(session.pending_events().is_empty());
    assert_eq!(lock(&target.script).events, vec![ProcessEvent::Stopped]);
}
