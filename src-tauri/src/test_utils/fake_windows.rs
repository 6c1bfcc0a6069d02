//! Window factory fake that records what it was asked to open.
//!
//! # Example
//!
//! ```rust,ignore
//! use tauri_quickstart_lib::lifecycle::Shell;
//! use tauri_quickstart_lib::test_utils::RecordingWindows;
//!
//! let mut shell = Shell::new(RecordingWindows::default(), &AppConfig::default());
//! shell.ready()?;
//! assert_eq!(shell.factory().opened(), ["main"]);
//! ```

use crate::lifecycle::WindowFactory;

/// Handle returned by [`RecordingWindows`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeWindow {
    /// Label the window was opened with
    pub label: String,
    /// Zero-based creation order
    pub serial: usize,
}

/// Records every label it opens; optionally refuses to open anything
#[derive(Debug, Default)]
pub struct RecordingWindows {
    opened: Vec<String>,
    fail: bool,
}

impl RecordingWindows {
    /// A factory whose every `open` call fails
    pub fn failing() -> Self {
        Self {
            opened: Vec::new(),
            fail: true,
        }
    }

    /// Labels opened so far, in order
    pub fn opened(&self) -> &[String] {
        &self.opened
    }
}

impl WindowFactory for RecordingWindows {
    type Handle = FakeWindow;

    fn open(&mut self, label: &str) -> anyhow::Result<FakeWindow> {
        if self.fail {
            anyhow::bail!("no display available for '{}'", label);
        }

        let window = FakeWindow {
            label: label.to_string(),
            serial: self.opened.len(),
        };
        self.opened.push(label.to_string());
        Ok(window)
    }
}
