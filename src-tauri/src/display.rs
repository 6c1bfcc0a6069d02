//! Display logic: what the page shows once it has loaded.
//!
//! Writes go through the [`Page`] trait so the same logic drives the real
//! webview and the in-memory [`Document`] used in tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::bridge::Bridge;
use crate::ipc::IpcError;

/// Element that receives the version status line.
pub const INFO_ELEMENT: &str = "info";

/// Element that receives the ping result.
pub const IPC_INFO_ELEMENT: &str = "ipcInfo";

/// Errors that can occur while updating the page.
#[derive(Error, Debug)]
pub enum DisplayError {
    /// The ping round trip failed.
    #[error("ping failed: {0}")]
    Ipc(#[from] IpcError),

    /// The page rejected a DOM update.
    #[error("page update failed: {0}")]
    Script(String),
}

/// Result type alias for display operations.
pub type Result<T> = std::result::Result<T, DisplayError>;

/// A page whose elements can be addressed by id.
pub trait Page {
    /// Replaces the text of the element with id `element_id`.
    ///
    /// A missing element is not an error; nothing happens.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::Script`] if the page could not be reached.
    fn replace_text(&self, element_id: &str, text: &str) -> Result<()>;
}

/// In-memory page: a set of element ids and their text.
#[derive(Debug, Default)]
pub struct Document {
    elements: Mutex<BTreeMap<String, String>>,
}

impl Document {
    /// Creates a page containing the given (initially empty) elements.
    pub fn with_elements<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let elements = ids
            .into_iter()
            .map(|id| (id.into(), String::new()))
            .collect();
        Self {
            elements: Mutex::new(elements),
        }
    }

    /// The elements of the bundled `index.html`.
    pub fn index_page() -> Self {
        Self::with_elements([
            INFO_ELEMENT,
            IPC_INFO_ELEMENT,
            "rust-version",
            "webview-version",
            "tauri-version",
        ])
    }

    /// Current text of `element_id`, or `None` if there is no such element.
    pub fn text(&self, element_id: &str) -> Option<String> {
        self.elements().get(element_id).cloned()
    }

    /// Snapshot of every element and its text.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.elements().clone()
    }

    // Element text stays consistent even if a writer panicked mid-update
    fn elements(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.elements.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Page for Document {
    fn replace_text(&self, element_id: &str, text: &str) -> Result<()> {
        if let Some(current) = self.elements().get_mut(element_id) {
            *current = text.to_string();
        }
        Ok(())
    }
}

/// The human-readable version line.
///
/// The first two slots both read the runtime version.
pub fn status_line(bridge: &Bridge) -> String {
    format!(
        "This app is using WebView (v{}), Rust (v{}), and Tauri (v{})",
        bridge.rust(),
        bridge.rust(),
        bridge.tauri()
    )
}

/// Writes the status line, performs one ping and writes its result.
///
/// # Errors
///
/// Returns [`DisplayError::Ipc`] if the ping fails; the status line has
/// already been written by then.
pub async fn render<P: Page + ?Sized>(page: &P, bridge: &Bridge) -> Result<()> {
    page.replace_text(INFO_ELEMENT, &status_line(bridge))?;

    let response = bridge.ping("arg").await?;
    log::debug!("Ping response: {:?}", response);
    page.replace_text(IPC_INFO_ELEMENT, &response.joined())?;

    Ok(())
}
