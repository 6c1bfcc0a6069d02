//! Tauri-backed windows and page updates.
//!
//! [`TauriWindows`] is the production [`WindowFactory`]: every window gets
//! the bridge initialization script and, once its page has loaded, the
//! version labels and the display logic are applied through [`WebviewPage`].

use anyhow::Context;
use std::path::PathBuf;
use tauri::webview::PageLoadEvent;
use tauri::{AppHandle, WebviewUrl, WebviewWindow, WebviewWindowBuilder};

use crate::bridge::Bridge;
use crate::config::AppConfig;
use crate::display::{self, DisplayError, Page};
use crate::lifecycle::WindowFactory;

/// Builds the script that sets the text of one element, if present.
///
/// # Errors
///
/// Returns [`DisplayError::Script`] if the arguments cannot be encoded.
pub fn text_update_script(element_id: &str, text: &str) -> display::Result<String> {
    let encode = |value: &str| {
        serde_json::to_string(value).map_err(|e| DisplayError::Script(e.to_string()))
    };
    let id = encode(element_id)?;
    let text = encode(text)?;

    Ok(format!(
        "(() => {{ const el = document.getElementById({id}); if (el) el.innerText = {text}; }})();"
    ))
}

/// A page rendered in a Tauri webview.
pub struct WebviewPage {
    window: WebviewWindow,
}

impl WebviewPage {
    /// Wraps `window`.
    pub fn new(window: WebviewWindow) -> Self {
        Self { window }
    }
}

impl Page for WebviewPage {
    fn replace_text(&self, element_id: &str, text: &str) -> display::Result<()> {
        let script = text_update_script(element_id, text)?;
        self.window
            .eval(&script)
            .map_err(|e| DisplayError::Script(format!("eval in '{}': {}", self.window.label(), e)))
    }
}

/// Opens webview windows for the lifecycle controller.
pub struct TauriWindows {
    app: AppHandle,
    config: AppConfig,
    bridge: Bridge,
}

impl TauriWindows {
    /// Creates a factory that attaches `bridge` to every window.
    pub fn new(app: AppHandle, config: AppConfig, bridge: Bridge) -> Self {
        Self {
            app,
            config,
            bridge,
        }
    }
}

impl WindowFactory for TauriWindows {
    type Handle = WebviewWindow;

    fn open(&mut self, label: &str) -> anyhow::Result<WebviewWindow> {
        let script = self
            .bridge
            .init_script()
            .context("could not render bridge script")?;
        let url = WebviewUrl::App(PathBuf::from(&self.config.entry_page));
        let bridge = self.bridge.clone();

        WebviewWindowBuilder::new(&self.app, label, url)
            .title(&self.config.title)
            .inner_size(self.config.width, self.config.height)
            .initialization_script(&script)
            .on_page_load(move |window, payload| {
                if matches!(payload.event(), PageLoadEvent::Finished) {
                    log::debug!("Page loaded in '{}': {}", window.label(), payload.url());
                    let bridge = bridge.clone();
                    tauri::async_runtime::spawn(async move {
                        render_page(WebviewPage::new(window), bridge).await;
                    });
                }
            })
            .build()
            .with_context(|| format!("could not create window '{}'", label))
    }
}

async fn render_page(page: WebviewPage, bridge: Bridge) {
    if let Err(e) = bridge.populate_version_labels(&page) {
        log::warn!("Could not populate version labels: {}", e);
    }

    if let Err(e) = display::render(&page, &bridge).await {
        log::error!("Page render failed: {}", e);
    }
}
