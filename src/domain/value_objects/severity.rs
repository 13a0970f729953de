use serde::{Deserialize, Serialize};

/// Severity of a threshold alert.
///
/// An alert is `Critical` once the observed value exceeds the threshold by
/// more than [`CRITICAL_FACTOR`], otherwise it is a `Warning`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

/// Multiplier applied to a threshold above which a breach is critical.
pub const CRITICAL_FACTOR: f64 = 1.2;

impl Severity {
    /// Classifies a breach. The comparison is strict: a value of exactly
    /// `threshold * 1.2` is still a warning.
    #[must_use]
    pub fn classify(value: f64, threshold: f64) -> Self {
        if value > threshold * CRITICAL_FACTOR {
            Self::Critical
        } else {
            Self::Warning
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    /// Embed color used by Discord webhooks.
    #[must_use]
    pub const fn color_decimal(&self) -> u32 {
        match self {
            Self::Warning => 16_776_960,
            Self::Critical => 16_711_680,
        }
    }

    #[must_use]
    pub const fn color_hex(&self) -> &'static str {
        match self {
            Self::Warning => "#FFFF00",
            Self::Critical => "#FF0000",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Critical.to_string(), "critical");
    }

    #[test]
    fn ordering() {
        assert!(Severity::Warning < Severity::Critical);
    }

    #[test]
    fn classify_is_strictly_greater_than() {
        assert_eq!(Severity::classify(96.0, 80.0), Severity::Warning);
        assert_eq!(Severity::classify(96.01, 80.0), Severity::Critical);
        assert_eq!(Severity::classify(85.0, 80.0), Severity::Warning);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Severity::Critical).expect("serialize");
        assert_eq!(json, "\"critical\"");
        let back: Severity = serde_json::from_str("\"warning\"").expect("deserialize");
        assert_eq!(back, Severity::Warning);
    }
}
