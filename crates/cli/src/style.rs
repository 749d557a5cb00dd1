//! Shared styling utilities for terminal output.

use console::Style;

use conflict_resolver_core::conflict::ResolutionStrategy;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold, white).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Label for the strategy a rule picks; no strategy means manual.
pub fn strategy(strategy: Option<ResolutionStrategy>) -> String {
    match strategy {
        Some(ResolutionStrategy::Ours) => Style::new().blue().bold().apply_to("ours").to_string(),
        Some(ResolutionStrategy::Theirs) => {
            Style::new().magenta().bold().apply_to("theirs").to_string()
        }
        None => Style::new().yellow().apply_to("manual").to_string(),
    }
}
