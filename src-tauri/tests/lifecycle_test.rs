//! Integration tests for the window lifecycle under both exit conventions.

use tauri_quickstart_lib::config::{AppConfig, ExitPolicy};
use tauri_quickstart_lib::lifecycle::{ExitDecision, HostAction, HostEvent, Phase, Shell};
use tauri_quickstart_lib::test_utils::RecordingWindows;

fn shell_with(policy: ExitPolicy) -> Shell<RecordingWindows> {
    let config = AppConfig {
        exit_policy: policy,
        ..Default::default()
    };
    Shell::new(RecordingWindows::default(), &config)
}

#[test]
fn test_close_sole_window_exits() {
    let mut shell = shell_with(ExitPolicy::QuitOnLastClose);
    assert_eq!(shell.policy(), ExitPolicy::QuitOnLastClose);
    let label = shell.ready().expect("Should open first window");
    assert_eq!(
        shell.window(&label).map(|w| w.label.as_str()),
        Some("main")
    );

    let decision = shell.window_closed(&label).expect("Window is known");

    assert_eq!(decision, ExitDecision::Exit);
    assert_eq!(shell.phase(), Phase::Terminated);
    assert_eq!(shell.window_count(), 0);
    assert!(shell.activate().is_err(), "No window after termination");
    assert_eq!(shell.factory().opened().len(), 1);
}

#[test]
fn test_close_then_activate_reopens_one_window() {
    let mut shell = shell_with(ExitPolicy::StayResident);
    let label = shell.ready().expect("Should open first window");

    let decision = shell.window_closed(&label).expect("Window is known");
    assert_eq!(decision, ExitDecision::StayResident);
    assert_eq!(shell.window_count(), 0);
    assert!(shell.prevents_exit(None), "Implicit exit is vetoed");

    let reopened = shell.activate().expect("Activation should succeed");
    assert!(reopened.is_some());
    assert_eq!(shell.window_count(), 1);

    // Second activation with a window open does nothing
    assert_eq!(shell.activate().expect("Activation should succeed"), None);
    assert_eq!(shell.window_count(), 1);
    assert_eq!(shell.factory().opened(), ["main", "main-2"]);
}

#[test]
fn test_resident_cycle_repeats() {
    let mut shell = shell_with(ExitPolicy::StayResident);
    shell.ready().expect("Should open first window");

    for _ in 0..3 {
        let label = shell.labels().next().expect("One window").to_string();
        shell.window_closed(&label).expect("Window is known");
        assert_eq!(shell.phase(), Phase::WindowClosed);

        shell.activate().expect("Should reopen");
        assert_eq!(shell.phase(), Phase::WindowOpen);
        assert_eq!(shell.window_count(), 1);
    }

    let handle = shell.window("main-4").expect("Fourth window is open");
    assert_eq!(handle.label, "main-4");
    assert_eq!(handle.serial, 3);
}

#[test]
fn test_host_events_drive_exit_rules() {
    let mut quitting = shell_with(ExitPolicy::QuitOnLastClose);
    quitting.ready().expect("Should open first window");
    assert_eq!(
        quitting.handle_event(HostEvent::WindowDestroyed("main".to_string())),
        HostAction::Exit,
        "Closing the sole window exits"
    );
    assert_eq!(
        quitting.handle_event(HostEvent::ExitRequested(None)),
        HostAction::None,
        "Exit is not vetoed on the quit convention"
    );

    let mut resident = shell_with(ExitPolicy::StayResident);
    resident.ready().expect("Should open first window");
    assert_eq!(
        resident.handle_event(HostEvent::WindowDestroyed("main".to_string())),
        HostAction::None
    );
    assert_eq!(
        resident.handle_event(HostEvent::ExitRequested(None)),
        HostAction::PreventExit,
        "Implicit exit is vetoed while resident"
    );
    assert_eq!(
        resident.handle_event(HostEvent::ExitRequested(Some(0))),
        HostAction::None,
        "Explicit exit goes through while resident"
    );
    assert_eq!(resident.handle_event(HostEvent::Reopen), HostAction::None);
    assert_eq!(resident.window_count(), 1, "Reopen creates exactly one window");
}
