//! Standardized log lines for file operations

use std::path::Path;

/// Log an operation start with consistent format
///
/// # Arguments
/// * `operation` - Description of the operation
/// * `path` - Path of the file or directory being operated on
pub fn log_operation_start(operation: &str, path: &Path) {
    log::info!("{} {}", operation, path.display());
}

/// Log an operation completion with consistent format
///
/// `items` is whatever unit the operation counts: records or files.
pub fn log_operation_complete(
    operation: &str,
    path: &Path,
    items: usize,
    unit: &str,
    elapsed: Option<std::time::Duration>,
) {
    if let Some(duration) = elapsed {
        log::info!(
            "Successfully {} {} {} at {} in {:?}",
            operation,
            items,
            unit,
            path.display(),
            duration
        );
    } else {
        log::info!(
            "Successfully {} {} {} at {}",
            operation,
            items,
            unit,
            path.display()
        );
    }
}

/// Log an operation warning with consistent format
///
/// # Arguments
/// * `message` - Warning message
/// * `path` - Optional path related to the warning
pub fn log_warning(message: &str, path: Option<&Path>) {
    if let Some(path) = path {
        log::warn!("{}: {}", message, path.display());
    } else {
        log::warn!("{message}");
    }
}