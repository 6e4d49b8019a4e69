//! # Utility Functions
//!
//! Statistics helpers shared by the result collector, plus formatters for
//! the human-readable run summary.
//!
//! ## Usage Examples
//!
//! ```rust
//! use wirefight::utils::*;
//! use std::time::Duration;
//!
//! let sorted = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
//! assert!((percentile(&sorted, 90.0) - 9.1).abs() < 1e-9);
//! assert_eq!(mean(&sorted), 5.5);
//! assert_eq!(format_duration(Duration::from_micros(1500)), "1.50ms");
//! ```

use std::time::Duration;

/// Percentile of an ascending-sorted slice using linear interpolation
///
/// For percentile `p` (0–100) over `n` values the fractional rank is
/// `i = (p / 100) * (n - 1)`. When `i` is a whole number the value at that
/// rank is returned; otherwise the two neighbouring values are blended by
/// the fractional part of `i`.
///
/// ## Parameters
/// - `sorted`: Values in ascending order
/// - `p`: Percentile level between 0.0 and 100.0
///
/// ## Returns
/// The interpolated value, or 0.0 for an empty slice
///
/// ## Examples
///
/// ```rust
/// # use wirefight::utils::percentile;
/// let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
/// assert!((percentile(&values, 50.0) - 5.5).abs() < 1e-9);
/// assert!((percentile(&values, 99.0) - 9.91).abs() < 1e-9);
/// ```
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let p = p.clamp(0.0, 100.0);
    let index = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        return sorted[lower];
    }

    let weight = index - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Arithmetic mean, 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Format a duration with a unit suited to its magnitude
///
/// ## Examples
///
/// ```rust
/// # use wirefight::utils::format_duration;
/// # use std::time::Duration;
/// assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1.50m");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();

    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}μs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else if nanos < 60_000_000_000 {
        format!("{:.2}s", nanos as f64 / 1_000_000_000.0)
    } else {
        format!("{:.2}m", nanos as f64 / 60_000_000_000.0)
    }
}

/// Format a latency already expressed in milliseconds
pub fn format_latency_ms(ms: f64) -> String {
    format!("{:.2} ms", ms)
}

/// Format a request rate for display
pub fn format_rate(requests_per_second: f64) -> String {
    if requests_per_second < 1000.0 {
        format!("{:.2} req/s", requests_per_second)
    } else if requests_per_second < 1_000_000.0 {
        format!("{:.2}K req/s", requests_per_second / 1000.0)
    } else {
        format!("{:.2}M req/s", requests_per_second / 1_000_000.0)
    }
}

/// Format a fraction (0.0–1.0) as a percentage
pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}
