//! Replay a recorded editing session against a dataset folder.
//!
//! ```text
//! labelcanvas <dataset-dir> <session.json>
//! ```
//!
//! The session file is a JSON list of steps, e.g.
//! `[{"step": "viewport", "width": 800, "height": 600},
//!   {"step": "down", "x": 100, "y": 100}, {"step": "up", "x": 300, "y": 250}]`.
//! Every step is followed by waiting for the storage work it started. The
//! final image list, with annotation counts, is printed as JSON.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use serde::Deserialize;

use labelcanvas::app::Direction;
use labelcanvas::keybindings::Shortcut;
use labelcanvas::model::ImageList;
use labelcanvas::{App, AppConfig, FolderBackend, Notification, PersistenceError, Point, Tool};

/// How long to wait for storage after each step.
const STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// One recorded host event.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
enum SessionStep {
    Viewport { width: f32, height: f32 },
    Tool { tool: String },
    Class { name: String },
    NoClass,
    AddClass { name: String, color: String },
    Image { name: String },
    Next,
    Prev,
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
    DoubleClick { x: f32, y: f32 },
    Leave,
    Key { shortcut: String },
    Select { id: Option<u64> },
    Delete { index: usize },
    Clear,
    Save,
}

#[derive(Debug, thiserror::Error)]
enum ReplayError {
    #[error("usage: labelcanvas <dataset-dir> <session.json>")]
    Usage,
    #[error("Failed to read session file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid session file: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("Unknown tool {0:?}")]
    UnknownTool(String),
    #[error("Invalid shortcut {0:?}")]
    InvalidShortcut(String),
}

fn apply(app: &mut App, step: SessionStep) -> Result<(), ReplayError> {
    match step {
        SessionStep::Viewport { width, height } => app.resize_viewport(width, height),
        SessionStep::Tool { tool } => {
            let parsed = Tool::from_name(&tool).ok_or(ReplayError::UnknownTool(tool))?;
            app.set_tool(parsed);
        }
        SessionStep::Class { name } => {
            app.select_class(&name);
        }
        SessionStep::NoClass => app.deselect_class(),
        SessionStep::AddClass { name, color } => {
            // Failures are reported as notifications
            let _ = app.add_class(&name, &color);
        }
        SessionStep::Image { name } => {
            app.select_image(&name);
        }
        SessionStep::Next => {
            app.navigate(Direction::Next);
        }
        SessionStep::Prev => {
            app.navigate(Direction::Prev);
        }
        SessionStep::Down { x, y } => app.pointer_down(Point::new(x, y)),
        SessionStep::Move { x, y } => app.pointer_move(Point::new(x, y)),
        SessionStep::Up { x, y } => app.pointer_up(Point::new(x, y)),
        SessionStep::DoubleClick { x, y } => app.double_click(Point::new(x, y)),
        SessionStep::Leave => app.pointer_leave(),
        SessionStep::Key { shortcut } => {
            let parsed = Shortcut::parse(&shortcut).ok_or(ReplayError::InvalidShortcut(shortcut))?;
            if !app.handle_key(&parsed.to_key_press()) {
                log::warn!("No action bound to {}", parsed);
            }
        }
        SessionStep::Select { id } => app.select_annotation(id),
        SessionStep::Delete { index } => {
            app.delete_annotation(index);
        }
        SessionStep::Clear => {
            app.clear_annotations();
        }
        SessionStep::Save => app.save_now(),
    }
    Ok(())
}

/// Print queued notifications, returning how many were errors.
fn report(app: &mut App) -> usize {
    let mut errors = 0;
    for note in app.notifications() {
        match note {
            Notification::Info(msg) => println!("{}", msg),
            Notification::Error(msg) => {
                errors += 1;
                eprintln!("error: {}", msg);
            }
        }
    }
    errors
}

/// Install the logger before anything that logs. Without `RUST_LOG` the
/// default level applies until the configured one is known.
/// Returns true if `RUST_LOG` sets the filter.
fn init_logging() -> bool {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Trace)
        .parse_default_env()
        .init();
    let env_filter = std::env::var_os("RUST_LOG").is_some();
    if let Some(level) = configured_level(env_filter, &AppConfig::default()) {
        log::set_max_level(level);
    }
    env_filter
}

/// Level to apply from a config, None when `RUST_LOG` already decided.
fn configured_level(env_filter: bool, config: &AppConfig) -> Option<log::LevelFilter> {
    (!env_filter).then(|| config.preferences.log_level.to_level_filter())
}

fn run() -> Result<usize, ReplayError> {
    let mut args = std::env::args().skip(1);
    let (Some(dataset), Some(session)) = (args.next(), args.next()) else {
        return Err(ReplayError::Usage);
    };

    let env_filter = init_logging();
    let config = AppConfig::load_from_default_path().unwrap_or_default();
    if let Some(level) = configured_level(env_filter, &config) {
        log::set_max_level(level);
    }

    let steps: Vec<SessionStep> = serde_json::from_str(&std::fs::read_to_string(PathBuf::from(&session))?)?;
    log::info!("Replaying {} steps from {}", steps.len(), session);

    let backend = FolderBackend::open(dataset)?;
    let mut app = App::new(backend, &config)?;
    app.wait_idle(STEP_TIMEOUT);

    let mut errors = report(&mut app);
    for step in steps {
        log::debug!("Step: {:?}", step);
        apply(&mut app, step)?;
        app.tick();
        if !app.wait_idle(STEP_TIMEOUT) {
            log::warn!("Storage did not settle after step");
        }
        errors += report(&mut app);
    }

    println!(
        "{}: {} annotations",
        app.current_image().unwrap_or("<no image>"),
        app.store().len()
    );
    let summary = ImageList {
        images: app.images().to_vec(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(errors)
}

fn main() -> ExitCode {
    match run() {
        Ok(0) => ExitCode::SUCCESS,
        Ok(errors) => {
            eprintln!("{} operations failed", errors);
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelcanvas::config::{LogLevel, Preferences};

    #[test]
    fn test_configured_level_yields_to_env() {
        let config = AppConfig {
            preferences: Preferences {
                log_level: LogLevel::Debug,
                ..Preferences::default()
            },
            ..AppConfig::default()
        };
        assert_eq!(configured_level(false, &config), Some(log::LevelFilter::Debug));
        assert_eq!(configured_level(true, &config), None);
        assert_eq!(
            configured_level(false, &AppConfig::default()),
            Some(log::LevelFilter::Info)
        );
    }

    #[test]
    fn test_session_steps_parse() {
        let steps: Vec<SessionStep> = serde_json::from_str(
            r#"[{"step": "viewport", "width": 800, "height": 600}, {"step": "no_class"}, {"step": "next"}]"#,
        )
        .unwrap();
        assert_eq!(steps.len(), 3);
        assert!(matches!(steps[1], SessionStep::NoClass));
    }
}
