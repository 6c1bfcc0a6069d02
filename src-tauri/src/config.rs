//! Runtime configuration for the host process.

use std::fmt;
use std::str::FromStr;

/// Environment variable that overrides the platform exit policy.
pub const EXIT_POLICY_ENV: &str = "QUICKSTART_EXIT_POLICY";

/// What happens when the last window closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Terminate the process (Windows and Linux convention).
    QuitOnLastClose,
    /// Keep running with zero windows until reactivated (macOS convention).
    StayResident,
}

impl ExitPolicy {
    /// The convention of the platform this binary was built for.
    pub fn for_current_platform() -> Self {
        if cfg!(target_os = "macos") {
            Self::StayResident
        } else {
            Self::QuitOnLastClose
        }
    }
}

impl FromStr for ExitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quit" => Ok(Self::QuitOnLastClose),
            "resident" => Ok(Self::StayResident),
            other => Err(format!("unknown exit policy '{}'", other)),
        }
    }
}

impl fmt::Display for ExitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuitOnLastClose => write!(f, "quit"),
            Self::StayResident => write!(f, "resident"),
        }
    }
}

/// Window and lifecycle settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Title shown on every window
    pub title: String,
    /// Initial window width in logical pixels
    pub width: f64,
    /// Initial window height in logical pixels
    pub height: f64,
    /// Page loaded from the bundled frontend directory
    pub entry_page: String,
    /// Prefix for window labels ("main", "main-2", ...)
    pub label_prefix: String,
    /// Behavior when the last window closes
    pub exit_policy: ExitPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Hello from Tauri".to_string(),
            width: 800.0,
            height: 600.0,
            entry_page: "index.html".to_string(),
            label_prefix: "main".to_string(),
            exit_policy: ExitPolicy::for_current_platform(),
        }
    }
}

impl AppConfig {
    /// Defaults, with the exit policy taken from [`EXIT_POLICY_ENV`] if set.
    ///
    /// An unparseable value is logged and ignored. `resident` is only
    /// honored where the platform can reactivate a windowless app (macOS);
    /// elsewhere it falls back to [`ExitPolicy::QuitOnLastClose`].
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(EXIT_POLICY_ENV) {
            config.apply_exit_policy_override(&raw, cfg!(target_os = "macos"));
        }
        config
    }

    fn apply_exit_policy_override(&mut self, raw: &str, can_reactivate: bool) {
        match raw.parse() {
            Ok(ExitPolicy::StayResident) if !can_reactivate => {
                log::warn!(
                    "Ignoring {}=resident: this platform cannot reopen a window, quitting on last close",
                    EXIT_POLICY_ENV
                );
                self.exit_policy = ExitPolicy::QuitOnLastClose;
            }
            Ok(policy) => {
                log::info!("Exit policy overridden to '{}'", policy);
                self.exit_policy = policy;
            }
            Err(e) => log::warn!("Ignoring {}: {}", EXIT_POLICY_ENV, e),
        }
    }
}
