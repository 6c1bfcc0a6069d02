//! Application lifecycle: the window set and the exit rule.
//!
//! [`Shell`] owns every open window handle and walks the state machine
//!
//! ```text
//! NotReady -> Ready -> (WindowOpen <-> WindowClosed) -> Terminated
//! ```
//!
//! It never touches the windowing system directly; windows are created by a
//! [`WindowFactory`], so the rules can be exercised without a display.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::{AppConfig, ExitPolicy};

/// Errors that can occur while driving the lifecycle.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// The application has not signalled readiness yet.
    #[error("application is not ready")]
    NotReady,

    /// Readiness was signalled twice.
    #[error("application is already ready")]
    AlreadyReady,

    /// The application has terminated.
    #[error("application has terminated")]
    Terminated,

    /// A close event named a window this shell does not own.
    #[error("unknown window '{0}'")]
    UnknownWindow(String),

    /// The window factory failed.
    #[error("failed to open window: {0}")]
    Window(String),
}

/// Result type alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, LifecycleError>;

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Process started, platform not ready.
    NotReady,
    /// Platform ready, no window opened yet.
    Ready,
    /// At least one window is open.
    WindowOpen,
    /// Every window is closed but the process stays resident.
    WindowClosed,
    /// The process is exiting.
    Terminated,
}

/// What the host should do after a window closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    /// Other windows remain open.
    Continue,
    /// Last window closed; exit the process.
    Exit,
    /// Last window closed; keep running without windows.
    StayResident,
}

/// Platform events the host forwards to the [`Shell`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// The window with this label was destroyed.
    WindowDestroyed(String),
    /// The user reactivated the app (dock icon click on macOS).
    Reopen,
    /// Something asked the process to exit; `None` means the platform did
    /// because the last window went away.
    ExitRequested(Option<i32>),
    /// The process is exiting.
    Exit,
}

/// What the host must do in response to a [`HostEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    /// Nothing.
    None,
    /// Exit the process.
    Exit,
    /// Veto the pending exit request.
    PreventExit,
}

/// Creates display surfaces on behalf of the [`Shell`].
pub trait WindowFactory {
    /// Handle to an open window.
    type Handle;

    /// Opens a window identified by `label`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot create the window.
    fn open(&mut self, label: &str) -> anyhow::Result<Self::Handle>;
}

/// Lifecycle controller owning the window set.
pub struct Shell<F: WindowFactory> {
    factory: F,
    policy: ExitPolicy,
    label_prefix: String,
    phase: Phase,
    windows: BTreeMap<String, F::Handle>,
    opened: u32,
}

impl<F: WindowFactory> Shell<F> {
    /// Creates a controller in [`Phase::NotReady`].
    pub fn new(factory: F, config: &AppConfig) -> Self {
        Self {
            factory,
            policy: config.exit_policy,
            label_prefix: config.label_prefix.clone(),
            phase: Phase::NotReady,
            windows: BTreeMap::new(),
            opened: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Exit policy in effect.
    pub fn policy(&self) -> ExitPolicy {
        self.policy
    }

    /// Number of open windows.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Labels of open windows, sorted.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.windows.keys().map(String::as_str)
    }

    /// Handle of the window labelled `label`.
    pub fn window(&self, label: &str) -> Option<&F::Handle> {
        self.windows.get(label)
    }

    /// The underlying factory.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Marks the platform ready and opens the first window.
    ///
    /// Returns the new window's label.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyReady`] or
    /// [`LifecycleError::Terminated`] when called out of order, and
    /// [`LifecycleError::Window`] if the window cannot be opened.
    pub fn ready(&mut self) -> Result<String> {
        match self.phase {
            Phase::NotReady => {}
            Phase::Terminated => return Err(LifecycleError::Terminated),
            _ => return Err(LifecycleError::AlreadyReady),
        }

        self.phase = Phase::Ready;
        log::info!("Application ready (exit policy: {})", self.policy);
        self.open_window()
    }

    /// Handles reactivation: opens a window only if none are open.
    ///
    /// Returns the label of the window opened, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotReady`] before [`Shell::ready`],
    /// [`LifecycleError::Terminated`] after exit, and
    /// [`LifecycleError::Window`] if the window cannot be opened.
    pub fn activate(&mut self) -> Result<Option<String>> {
        match self.phase {
            Phase::NotReady => return Err(LifecycleError::NotReady),
            Phase::Terminated => return Err(LifecycleError::Terminated),
            _ => {}
        }

        if !self.windows.is_empty() {
            log::debug!("Activated with {} window(s) open", self.windows.len());
            return Ok(None);
        }

        log::info!("Activated with no windows open, reopening");
        self.open_window().map(Some)
    }

    /// Records that the window labelled `label` was destroyed.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownWindow`] if `label` is not open.
    pub fn window_closed(&mut self, label: &str) -> Result<ExitDecision> {
        if self.windows.remove(label).is_none() {
            return Err(LifecycleError::UnknownWindow(label.to_string()));
        }
        log::info!("Window '{}' closed, {} remaining", label, self.windows.len());

        if self.phase == Phase::Terminated {
            return Ok(ExitDecision::Exit);
        }
        if !self.windows.is_empty() {
            return Ok(ExitDecision::Continue);
        }

        match self.policy {
            ExitPolicy::QuitOnLastClose => {
                self.phase = Phase::Terminated;
                log::info!("All windows closed, exiting");
                Ok(ExitDecision::Exit)
            }
            ExitPolicy::StayResident => {
                self.phase = Phase::WindowClosed;
                log::info!("All windows closed, staying resident");
                Ok(ExitDecision::StayResident)
            }
        }
    }

    /// Whether an exit request should be vetoed.
    ///
    /// Only implicit requests (`code == None`, raised by the platform when
    /// the last window goes away) are vetoed, and only while resident.
    pub fn prevents_exit(&self, code: Option<i32>) -> bool {
        code.is_none()
            && self.policy == ExitPolicy::StayResident
            && self.phase == Phase::WindowClosed
    }

    /// Applies `event` and returns the action the host has to perform.
    ///
    /// Failures are logged; none of them stop the event loop.
    pub fn handle_event(&mut self, event: HostEvent) -> HostAction {
        match event {
            HostEvent::WindowDestroyed(label) => match self.window_closed(&label) {
                Ok(ExitDecision::Exit) => HostAction::Exit,
                Ok(_) => HostAction::None,
                Err(e) => {
                    log::warn!("Ignoring close of '{}': {}", label, e);
                    HostAction::None
                }
            },
            HostEvent::Reopen => {
                if let Err(e) = self.activate() {
                    log::error!("Could not reopen window: {}", e);
                }
                HostAction::None
            }
            HostEvent::ExitRequested(code) => {
                if self.prevents_exit(code) {
                    log::debug!("Exit request vetoed, staying resident");
                    HostAction::PreventExit
                } else {
                    HostAction::None
                }
            }
            HostEvent::Exit => {
                self.quit();
                HostAction::None
            }
        }
    }

    /// Explicit exit.
    pub fn quit(&mut self) {
        if self.phase != Phase::Terminated {
            log::info!("Quitting with {} window(s) open", self.windows.len());
            self.phase = Phase::Terminated;
        }
    }

    fn next_label(&mut self) -> String {
        self.opened += 1;
        if self.opened == 1 {
            self.label_prefix.clone()
        } else {
            format!("{}-{}", self.label_prefix, self.opened)
        }
    }

    fn open_window(&mut self) -> Result<String> {
        let label = self.next_label();
        let handle = self
            .factory
            .open(&label)
            .map_err(|e| LifecycleError::Window(format!("{:#}", e)))?;

        self.windows.insert(label.clone(), handle);
        self.phase = Phase::WindowOpen;
        log::info!("Opened window '{}'", label);
        Ok(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingWindows;

    fn shell(policy: ExitPolicy) -> Shell<RecordingWindows> {
        let config = AppConfig {
            exit_policy: policy,
            ..Default::default()
        };
        Shell::new(RecordingWindows::default(), &config)
    }

    #[test]
    fn test_new_shell_not_ready() {
        let shell = shell(ExitPolicy::QuitOnLastClose);
        assert_eq!(shell.phase(), Phase::NotReady);
        assert_eq!(shell.window_count(), 0);
    }

    #[test]
    fn test_ready_opens_one_window() {
        let mut shell = shell(ExitPolicy::QuitOnLastClose);
        let label = shell.ready().unwrap();

        assert_eq!(label, "main");
        assert_eq!(shell.phase(), Phase::WindowOpen);
        assert_eq!(shell.window_count(), 1);
        assert_eq!(shell.factory().opened(), ["main"]);
    }

    #[test]
    fn test_ready_twice_fails() {
        let mut shell = shell(ExitPolicy::QuitOnLastClose);
        shell.ready().unwrap();
        assert!(matches!(shell.ready(), Err(LifecycleError::AlreadyReady)));
        assert_eq!(shell.window_count(), 1);
    }

    #[test]
    fn test_activate_before_ready_fails() {
        let mut shell = shell(ExitPolicy::StayResident);
        assert!(matches!(shell.activate(), Err(LifecycleError::NotReady)));
    }

    #[test]
    fn test_activate_with_window_open_is_noop() {
        let mut shell = shell(ExitPolicy::StayResident);
        shell.ready().unwrap();

        assert_eq!(shell.activate().unwrap(), None);
        assert_eq!(shell.window_count(), 1);
    }

    #[test]
    fn test_last_close_exits_on_quit_policy() {
        let mut shell = shell(ExitPolicy::QuitOnLastClose);
        shell.ready().unwrap();

        assert_eq!(shell.window_closed("main").unwrap(), ExitDecision::Exit);
        assert_eq!(shell.phase(), Phase::Terminated);
        assert!(!shell.prevents_exit(None));
        assert!(matches!(shell.activate(), Err(LifecycleError::Terminated)));
        assert_eq!(shell.factory().opened().len(), 1);
    }

    #[test]
    fn test_last_close_stays_resident() {
        let mut shell = shell(ExitPolicy::StayResident);
        shell.ready().unwrap();

        assert_eq!(
            shell.window_closed("main").unwrap(),
            ExitDecision::StayResident
        );
        assert_eq!(shell.phase(), Phase::WindowClosed);
        assert!(shell.prevents_exit(None));
        assert!(!shell.prevents_exit(Some(0)));

        let label = shell.activate().unwrap();
        assert_eq!(label.as_deref(), Some("main-2"));
        assert_eq!(shell.phase(), Phase::WindowOpen);
        assert_eq!(shell.window_count(), 1);
        assert!(!shell.prevents_exit(None));
    }

    #[test]
    fn test_close_unknown_window() {
        let mut shell = shell(ExitPolicy::QuitOnLastClose);
        shell.ready().unwrap();

        let err = shell.window_closed("settings").unwrap_err();
        assert!(matches!(err, LifecycleError::UnknownWindow(ref l) if l == "settings"));
        assert_eq!(shell.window_count(), 1);
    }

    #[test]
    fn test_factory_failure_reported() {
        let config = AppConfig::default();
        let mut shell = Shell::new(RecordingWindows::failing(), &config);

        let err = shell.ready().unwrap_err();
        assert!(matches!(err, LifecycleError::Window(_)));
        assert_eq!(shell.phase(), Phase::Ready);
        assert_eq!(shell.window_count(), 0);
    }

    #[test]
    fn test_quit_is_terminal() {
        let mut shell = shell(ExitPolicy::StayResident);
        shell.ready().unwrap();
        shell.quit();

        assert_eq!(shell.phase(), Phase::Terminated);
        assert!(matches!(shell.ready(), Err(LifecycleError::Terminated)));
        assert_eq!(shell.window_closed("main").unwrap(), ExitDecision::Exit);
        assert!(!shell.prevents_exit(None));
    }

    #[test]
    fn test_policy_comes_from_config() {
        assert_eq!(shell(ExitPolicy::StayResident).policy(), ExitPolicy::StayResident);
        assert_eq!(
            shell(ExitPolicy::QuitOnLastClose).policy(),
            ExitPolicy::QuitOnLastClose
        );
    }

    #[test]
    fn test_events_quit_policy() {
        let mut shell = shell(ExitPolicy::QuitOnLastClose);
        shell.ready().unwrap();

        assert_eq!(
            shell.handle_event(HostEvent::WindowDestroyed("main".to_string())),
            HostAction::Exit
        );
        assert_eq!(
            shell.handle_event(HostEvent::ExitRequested(None)),
            HostAction::None
        );
        assert_eq!(shell.handle_event(HostEvent::Reopen), HostAction::None);
        assert_eq!(shell.window_count(), 0);
        assert_eq!(shell.factory().opened().len(), 1);
    }

    #[test]
    fn test_events_resident_policy() {
        let mut shell = shell(ExitPolicy::StayResident);
        shell.ready().unwrap();

        assert_eq!(
            shell.handle_event(HostEvent::WindowDestroyed("main".to_string())),
            HostAction::None
        );
        assert_eq!(
            shell.handle_event(HostEvent::ExitRequested(None)),
            HostAction::PreventExit
        );
        // Explicit exits are never vetoed
        assert_eq!(
            shell.handle_event(HostEvent::ExitRequested(Some(0))),
            HostAction::None
        );

        assert_eq!(shell.handle_event(HostEvent::Reopen), HostAction::None);
        assert_eq!(shell.window_count(), 1);
        assert_eq!(
            shell.handle_event(HostEvent::ExitRequested(None)),
            HostAction::None
        );
    }

    #[test]
    fn test_events_unknown_window_and_exit() {
        let mut shell = shell(ExitPolicy::StayResident);
        shell.ready().unwrap();

        assert_eq!(
            shell.handle_event(HostEvent::WindowDestroyed("settings".to_string())),
            HostAction::None
        );
        assert_eq!(shell.window_count(), 1);

        assert_eq!(shell.handle_event(HostEvent::Exit), HostAction::None);
        assert_eq!(shell.phase(), Phase::Terminated);
        assert_eq!(
            shell.handle_event(HostEvent::ExitRequested(None)),
            HostAction::None
        );
    }
}
