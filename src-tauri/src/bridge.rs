//! The capability object exposed to the page.
//!
//! A [`Bridge`] carries exactly four capabilities: three version accessors
//! and an asynchronous `ping`. Nothing else from the host is reachable from
//! the display context. The same contract is exposed to page scripts as a
//! frozen `window.versions` object through [`Bridge::init_script`].

use serde::Serialize;
use serde_json::Value;

use crate::display::{self, Page};
use crate::ipc::{IpcClient, PingResponse, Result, PING_CHANNEL};

/// Tauri command the page-side `ping` goes through.
pub const INVOKE_COMMAND: &str = "invoke_host";

/// Version sources shown on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionLabel {
    /// Compiler the host was built with.
    Rust,
    /// System webview rendering the page.
    Webview,
    /// Tauri runtime.
    Tauri,
}

impl VersionLabel {
    /// Every label, in the order the page is populated.
    pub const ALL: [VersionLabel; 3] = [Self::Webview, Self::Rust, Self::Tauri];

    /// Name used for the accessor and the element id.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Webview => "webview",
            Self::Tauri => "tauri",
        }
    }

    /// Id of the element showing this version.
    pub fn element_id(self) -> String {
        format!("{}-version", self.name())
    }
}

/// Version strings captured once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Versions {
    /// rustc version
    pub rust: String,
    /// webview version
    pub webview: String,
    /// Tauri version
    pub tauri: String,
}

impl Versions {
    /// Creates a version set from explicit strings.
    pub fn new(
        rust: impl Into<String>,
        webview: impl Into<String>,
        tauri: impl Into<String>,
    ) -> Self {
        Self {
            rust: rust.into(),
            webview: webview.into(),
            tauri: tauri.into(),
        }
    }

    /// Collects the versions of the running process.
    ///
    /// The webview version is queried from the platform; if that fails it
    /// is reported as `unknown`.
    pub fn detect() -> Self {
        let webview = tauri::webview_version().unwrap_or_else(|e| {
            log::warn!("Could not determine webview version: {}", e);
            "unknown".to_string()
        });

        Self::new(env!("BUILD_RUSTC_VERSION"), webview, tauri::VERSION)
    }

    /// Version for `label`.
    pub fn get(&self, label: VersionLabel) -> &str {
        match label {
            VersionLabel::Rust => &self.rust,
            VersionLabel::Webview => &self.webview,
            VersionLabel::Tauri => &self.tauri,
        }
    }
}

/// Capabilities handed to the display logic.
#[derive(Debug, Clone)]
pub struct Bridge {
    versions: Versions,
    client: IpcClient,
}

impl Bridge {
    /// Creates a bridge answering pings through `client`.
    pub fn new(versions: Versions, client: IpcClient) -> Self {
        Self { versions, client }
    }

    /// Compiler version.
    pub fn rust(&self) -> &str {
        &self.versions.rust
    }

    /// Webview version.
    pub fn webview(&self) -> &str {
        &self.versions.webview
    }

    /// Tauri version.
    pub fn tauri(&self) -> &str {
        &self.versions.tauri
    }

    /// Asks the host for its ping record.
    ///
    /// `_arg` is accepted for call-site compatibility and never sent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ipc::IpcError::Disconnected`] if the host is gone,
    /// or a JSON error if the reply is not a [`PingResponse`].
    pub async fn ping<A: Serialize>(&self, _arg: A) -> Result<PingResponse> {
        self.client.invoke_typed(PING_CHANNEL, Value::Null).await
    }

    /// Writes each version into its `<label>-version` element.
    ///
    /// Elements missing from the page are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the page itself cannot be updated.
    pub fn populate_version_labels<P: Page + ?Sized>(&self, page: &P) -> display::Result<()> {
        for label in VersionLabel::ALL {
            page.replace_text(&label.element_id(), self.versions.get(label))?;
        }
        Ok(())
    }

    /// Script run in every new webview before page scripts.
    ///
    /// Defines `window.versions` with the four bridge members; `ping`
    /// goes through the [`INVOKE_COMMAND`] Tauri command.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if the versions cannot be serialized.
    pub fn init_script(&self) -> serde_json::Result<String> {
        let versions = serde_json::to_string(&self.versions)?;
        let command = serde_json::to_string(INVOKE_COMMAND)?;
        let channel = serde_json::to_string(PING_CHANNEL)?;

        Ok(format!(
            r#"(() => {{
  const v = {versions};
  Object.defineProperty(window, "versions", {{
    value: Object.freeze({{
      rust: () => v.rust,
      webview: () => v.webview,
      tauri: () => v.tauri,
      ping: () => window.__TAURI_INTERNALS__.invoke({command}, {{ channel: {channel}, payload: null }}),
    }}),
    writable: false,
    configurable: false,
  }});
}})();"#
        ))
    }
}
