//! `tauri-quickstart` - a window, a static page and one IPC round trip
//!
//! This module wires the lifecycle controller, the IPC host and the bridge
//! into the Tauri application.

pub mod bridge;
pub mod config;
pub mod display;
pub mod ipc;
pub mod lifecycle;
pub mod test_utils;
pub mod window;

use serde_json::Value;
use std::sync::Mutex;
use tauri::{AppHandle, Manager, RunEvent, State, WindowEvent};

use bridge::{Bridge, Versions};
use config::AppConfig;
use ipc::{HandlerRegistry, IpcClient};
use lifecycle::{HostAction, HostEvent, Shell};
use window::TauriWindows;

/// Lifecycle controller as stored in Tauri managed state
pub type ShellState = Mutex<Shell<TauriWindows>>;

/// Forward a page request to the host handler registered for `channel`
#[tauri::command]
async fn invoke_host(
    channel: String,
    payload: Option<Value>,
    client: State<'_, IpcClient>,
) -> Result<Value, String> {
    client
        .invoke(&channel, payload.unwrap_or(Value::Null))
        .await
        .map_err(|e| e.to_string())
}

/// Run `f` against the lifecycle controller, if it has been installed
fn with_shell<T>(
    app: &AppHandle,
    f: impl FnOnce(&mut Shell<TauriWindows>) -> T,
) -> Option<T> {
    let state = app.try_state::<ShellState>()?;
    let result = match state.lock() {
        Ok(mut shell) => Some(f(&mut shell)),
        Err(e) => {
            log::error!("Lifecycle state poisoned: {}", e);
            None
        }
    };
    result
}

fn handle_run_event(app: &AppHandle, event: RunEvent) {
    let (event, api) = match event {
        RunEvent::WindowEvent {
            label,
            event: WindowEvent::Destroyed,
            ..
        } => (HostEvent::WindowDestroyed(label), None),
        #[cfg(target_os = "macos")]
        RunEvent::Reopen { .. } => (HostEvent::Reopen, None),
        RunEvent::ExitRequested { code, api, .. } => (HostEvent::ExitRequested(code), Some(api)),
        RunEvent::Exit => {
            log::info!("tauri-quickstart exiting");
            (HostEvent::Exit, None)
        }
        _ => return,
    };

    match with_shell(app, |shell| shell.handle_event(event)) {
        Some(HostAction::Exit) => app.exit(0),
        Some(HostAction::PreventExit) => {
            if let Some(api) = api {
                api.prevent_exit();
            }
        }
        Some(HostAction::None) | None => {}
    }
}

/// Run the `tauri-quickstart` application
///
/// Initializes logging, registers the ping handler, opens the first window
/// and drives the lifecycle until exit.
///
/// # Panics
///
/// Panics if the Tauri application fails to start.
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!(
        "tauri-quickstart {} starting up (built {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIMESTAMP")
    );

    let config = AppConfig::from_env();

    let app = tauri::Builder::default()
        .invoke_handler(tauri::generate_handler![invoke_host])
        .setup(move |app| {
            let mut registry = HandlerRegistry::new();
            ipc::register_ping_handler(&mut registry)?;

            let (client, host) = ipc::channel(registry);
            tauri::async_runtime::spawn(host.serve());

            let versions = Versions::detect();
            log::info!(
                "Versions: rust {}, webview {}, tauri {}",
                versions.rust,
                versions.webview,
                versions.tauri
            );

            let bridge = Bridge::new(versions, client.clone());
            app.manage(client);

            let windows = TauriWindows::new(app.handle().clone(), config.clone(), bridge);
            let mut shell = Shell::new(windows, &config);
            shell.ready()?;
            app.manage(Mutex::new(shell));

            log::info!("Tauri app setup complete");
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(handle_run_event);
}
