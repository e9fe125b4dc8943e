//! Development server command.
//!
//! Loads the configuration, starts the watcher and the HTTP server, and feeds
//! debounced file changes through the invalidation engine until Ctrl+C.

use crate::cli::DevArgs;
use crate::config::{ConfigOverrides, KiteConfig};
use crate::dev::{DevConfig, DevServer, DevServerState, FileWatcher};
use crate::error::Result;
use crate::ui;
use kite_hmr::FileChange;
use std::sync::Arc;
use tokio::signal;

/// Execute the dev command.
///
/// # Errors
///
/// Returns errors for invalid configuration, an unusable root or a watcher
/// that cannot start. Server failures after startup end the event loop.
pub async fn execute(args: DevArgs) -> Result<()> {
    ui::info("Starting development server...");

    let config = KiteConfig::load(&ConfigOverrides::from(&args), args.config.as_deref())?;
    config.validate()?;
    let dev_config = DevConfig::from_config(&config)?;

    ui::info(&format!("Serving: {}", dev_config.root.display()));

    let state = Arc::new(DevServerState::new(dev_config.clone()));

    let (watcher, mut change_rx) = FileWatcher::new(
        dev_config.root.clone(),
        dev_config.watch_ignore.clone(),
        dev_config.debounce_ms,
    )?;
    ui::info(&format!(
        "Watching for changes in: {}",
        watcher.root().display()
    ));

    let server = DevServer::new(dev_config.clone(), state.clone());
    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = server.start().await {
            ui::error(&format!("Server error: {}", e));
        }
    });

    if dev_config.open {
        open_browser(&dev_config.server_url());
    }

    ui::info("Press Ctrl+C to stop");

    loop {
        tokio::select! {
            Some(change) = change_rx.recv() => {
                ui::info(&describe_change(&change));
                state.apply_change(&change).await;
            }

            _ = signal::ctrl_c() => {
                ui::info("Shutting down development server...");
                break;
            }

            _ = &mut server_handle => {
                ui::warning("Server task completed unexpectedly");
                break;
            }
        }
    }

    server_handle.abort();
    drop(watcher);
    state.teardown();

    ui::success("Development server stopped");
    Ok(())
}

fn describe_change(change: &FileChange) -> String {
    let verb = match change {
        FileChange::Created(_) => "created",
        FileChange::Modified(_) => "changed",
        FileChange::Removed(_) => "removed",
    };
    format!("File {}: {}", verb, change.id())
}

fn open_browser(url: &str) {
    use std::process::Command;

    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(url).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", url]).spawn()
    } else {
        Command::new("xdg-open").arg(url).spawn()
    };

    match result {
        Ok(_) => ui::info(&format!("Opened browser at {}", url)),
        Err(e) => ui::warning(&format!("Failed to open browser: {}", e)),
    }
}
