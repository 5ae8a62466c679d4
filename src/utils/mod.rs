//! Utility functions and helpers.
//!
//! - [`hash`]: Content fingerprinting and file comparison
//! - [`paths`]: Source-to-replica path mapping and path normalization
//!
//! # Examples
//!
//! ```
//! use mirrorsync::utils::format_size;
//!
//! assert_eq!(format_size(1024 * 1024), "1.00 MB");
//! ```

/// Content fingerprints (xxHash3-128) and the file comparator
pub mod hash;
/// Path mapping and resolution utilities
pub mod paths;

/// Formats a file size in bytes into a human-readable string with appropriate units.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size.round() as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
