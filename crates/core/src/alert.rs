//! Migration alert types and the severity tiers used to classify them.

use serde::Serialize;
use uuid::Uuid;

use crate::types::Timestamp;

/// Severity of a migration alert, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    ErrorRate,
    ResponseTime,
    FallbackRate,
}

/// Lower bounds of each severity tier. A value at or above `critical` is
/// critical, at or above `high` is high, and so on; below `low` is no alert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

/// Error rate tiers, in percent.
pub const ERROR_RATE_THRESHOLDS: SeverityThresholds = SeverityThresholds {
    low: 1.0,
    medium: 5.0,
    high: 10.0,
    critical: 20.0,
};

/// Average response time tiers, in milliseconds.
pub const RESPONSE_TIME_THRESHOLDS: SeverityThresholds = SeverityThresholds {
    low: 1000.0,
    medium: 3000.0,
    high: 5000.0,
    critical: 10000.0,
};

/// Fallback rate tiers, in percent.
pub const FALLBACK_RATE_THRESHOLDS: SeverityThresholds = SeverityThresholds {
    low: 5.0,
    medium: 10.0,
    high: 20.0,
    critical: 50.0,
};

impl SeverityThresholds {
    /// Highest tier reached by `value`, or `None` below the lowest tier.
    pub fn classify(&self, value: f64) -> Option<AlertSeverity> {
        if value >= self.critical {
            Some(AlertSeverity::Critical)
        } else if value >= self.high {
            Some(AlertSeverity::High)
        } else if value >= self.medium {
            Some(AlertSeverity::Medium)
        } else if value >= self.low {
            Some(AlertSeverity::Low)
        } else {
            None
        }
    }
}

/// A threshold violation raised by [`crate::migration::metrics::MigrationMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationAlert {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    /// Human-readable message; the text before the first `:` identifies the
    /// condition for deduplication.
    pub message: String,
    pub details: serde_json::Value,
    pub timestamp: Timestamp,
    pub resolved: bool,
}

impl MigrationAlert {
    /// The deduplication prefix of the message.
    pub fn message_prefix(&self) -> &str {
        message_prefix(&self.message)
    }
}

pub fn message_prefix(message: &str) -> &str {
    message.split(':').next().unwrap_or(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_uses_lower_bounds() {
        assert_eq!(ERROR_RATE_THRESHOLDS.classify(0.5), None);
        assert_eq!(ERROR_RATE_THRESHOLDS.classify(1.0), Some(AlertSeverity::Low));
        assert_eq!(ERROR_RATE_THRESHOLDS.classify(7.0), Some(AlertSeverity::Medium));
        assert_eq!(ERROR_RATE_THRESHOLDS.classify(10.0), Some(AlertSeverity::High));
        assert_eq!(ERROR_RATE_THRESHOLDS.classify(35.0), Some(AlertSeverity::Critical));
    }

    #[test]
    fn response_time_tiers() {
        assert_eq!(RESPONSE_TIME_THRESHOLDS.classify(999.0), None);
        assert_eq!(RESPONSE_TIME_THRESHOLDS.classify(3500.0), Some(AlertSeverity::Medium));
        assert_eq!(
            RESPONSE_TIME_THRESHOLDS.classify(12000.0),
            Some(AlertSeverity::Critical)
        );
    }

    #[test]
    fn fallback_tiers() {
        assert_eq!(FALLBACK_RATE_THRESHOLDS.classify(4.9), None);
        assert_eq!(FALLBACK_RATE_THRESHOLDS.classify(54.5), Some(AlertSeverity::Critical));
    }

    #[test]
    fn severity_orders_by_impact() {
        assert!(AlertSeverity::Critical > AlertSeverity::High);
        assert!(AlertSeverity::Low < AlertSeverity::Medium);
    }

    #[test]
    fn prefix_stops_at_first_colon() {
        assert_eq!(message_prefix("High fallback rate for submitChecklist: 54.5%"), "High fallback rate for submitChecklist");
        assert_eq!(message_prefix("no colon"), "no colon");
    }
}
