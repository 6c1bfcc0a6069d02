//! Test utilities for `tauri-quickstart`
//!
//! Provides in-process fakes for exercising the lifecycle and the IPC round
//! trip without a windowing system.

pub mod fake_windows;

pub use fake_windows::*;
