//! pipette: hosts the color picking engine and serves it over stdin/stdout.
//!
//! The engine runs on the main thread because overlay windows must be
//! created there on macOS. Requests are read on a bridge thread, engine
//! events are written by a second thread, and the global keyboard
//! listener runs on its own.

mod bridge;
mod logging;

use anyhow::Context;
use bridge::{spawn_event_writer, Bridge};
use crossbeam_channel::bounded;
use pipette_core::config::config_path;
use pipette_core::{engine_channel, ChannelSink, Engine, PickerConfig, SessionController, SessionSettings};
use pipette_platform::{desktop_parts, screen_capture_permitted, set_dpi_aware, KeyboardListener};
use std::io;
use std::thread;
use tracing::{info, warn};

const EVENT_CAPACITY: usize = 1024;

fn main() -> anyhow::Result<()> {
    let config = PickerConfig::load();
    logging::setup(&config);
    info!(version = env!("CARGO_PKG_VERSION"), "pipette starting");

    set_dpi_aware();
    if !screen_capture_permitted() {
        warn!("screen recording permission not granted, captures will fail or show only the desktop");
    }

    let persist = !std::env::args().skip(1).any(|arg| arg == "--no-persist");

    let (event_tx, event_rx) = bounded(EVENT_CAPACITY);
    let (handle, inbox) = engine_channel();

    let parts = desktop_parts(
        Box::new(inbox.tick_source()),
        Box::new(ChannelSink::new(event_tx.clone())),
    )
    .context("failed to set up desktop backends")?;
    let session = SessionController::new(parts, SessionSettings::from(&config));

    let key_handle = handle.clone();
    let _keyboard = match KeyboardListener::start(move |event| key_handle.key(event)) {
        Ok(listener) => Some(listener),
        Err(e) => {
            warn!(error = %e, "hotkey disabled");
            None
        }
    };

    let events = spawn_event_writer(event_rx, io::stdout()).context("failed to spawn event writer")?;

    let bridge = Bridge::new(
        handle,
        ChannelSink::new(event_tx),
        config,
        persist.then(config_path),
    );
    let requests = thread::Builder::new()
        .name("pipette-bridge".into())
        .spawn(move || bridge.serve(io::stdin().lock(), io::stdout()))
        .context("failed to spawn bridge")?;

    // Returns after the bridge sends shutdown. The session's sink is dropped
    // here, the bridge's when its thread ends, which closes the event stream.
    Engine::new(inbox, session).run();
    if requests.join().is_err() {
        warn!("bridge thread panicked");
    }
    if events.join().is_err() {
        warn!("event writer panicked");
    }
    info!("pipette exiting");
    Ok(())
}
