//! Skew between reported and observed time, and its human-readable rendering.

use std::fmt::{self, Write};
use std::time::Duration;

use chrono::{DateTime, Local};

/// Minimum skew that qualifies a delivery as an anomaly.
///
/// The comparison is strict: a skew equal to the threshold is not anomalous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Threshold(Duration);

impl Threshold {
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    #[must_use]
    pub const fn as_duration(self) -> Duration {
        self.0
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_duration(self.0))
    }
}

/// Absolute difference between observed and reported time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Skew(Duration);

impl Skew {
    /// Measure the skew between two instants, in either order.
    #[must_use]
    pub fn between(observed: DateTime<Local>, reported: DateTime<Local>) -> Self {
        let magnitude = (observed - reported)
            .to_std()
            .or_else(|_| (reported - observed).to_std())
            .unwrap_or_default();
        Self(magnitude)
    }

    #[must_use]
    pub const fn from_duration(value: Duration) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn as_duration(self) -> Duration {
        self.0
    }

    #[must_use]
    pub fn exceeds(self, threshold: Threshold) -> bool {
        self.0 > threshold.0
    }
}

impl fmt::Display for Skew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_duration(self.0))
    }
}

/// Render a duration compactly: `0s`, `750ns`, `1.5µs`, `2.25ms`, `10s`,
/// `1m30s`, `2h0m5.5s`.
///
/// Full nanosecond precision is kept; only trailing zeros of the fraction are
/// dropped, so the string always denotes exactly the measured value.
#[must_use]
pub fn render_duration(value: Duration) -> String {
    let nanos = value.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", decimal(nanos, 3));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", decimal(nanos, 6));
    }

    let total_secs = value.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs / 60) % 60;
    let seconds = u128::from(total_secs % 60) * 1_000_000_000 + u128::from(value.subsec_nanos());

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if total_secs >= 60 {
        let _ = write!(out, "{minutes}m");
    }
    out.push_str(&decimal(seconds, 9));
    out.push('s');
    out
}

/// `value / 10^digits` as a decimal string with trailing zeros trimmed.
fn decimal(value: u128, digits: u32) -> String {
    let scale = 10u128.pow(digits);
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let mut out = format!("{whole}.{frac:0width$}", width = digits as usize);
    while out.ends_with('0') {
        out.pop();
    }
    out
}
