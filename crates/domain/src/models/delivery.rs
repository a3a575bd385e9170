//! Delivery-log status values and the aggregated stats view.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of one delivery-log entry. Sent/opened/clicked come from the
/// provider side; pending/failed/bounced from the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
    Bounced,
    Opened,
    Clicked,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Bounced => "bounced",
            DeliveryStatus::Opened => "opened",
            DeliveryStatus::Clicked => "clicked",
        }
    }

    /// Statuses counting toward successful delivery.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Sent | DeliveryStatus::Opened | DeliveryStatus::Clicked
        )
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            "bounced" => Ok(DeliveryStatus::Bounced),
            "opened" => Ok(DeliveryStatus::Opened),
            "clicked" => Ok(DeliveryStatus::Clicked),
            other => Err(format!("unknown delivery status: {other}")),
        }
    }
}

/// Aggregated counts over the delivery log, the source for
/// health/success-rate dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeliveryStats {
    pub total: u64,
    pub sent: u64,
    pub failed: u64,
    pub bounced: u64,
    pub pending: u64,
}

impl DeliveryStats {
    /// Success rate over terminal attempts, as a rounded percentage.
    /// 0 when nothing terminal has been recorded yet.
    pub fn success_rate(&self) -> u32 {
        let terminal = self.sent + self.failed + self.bounced;
        if terminal == 0 {
            0
        } else {
            ((self.sent as f64 / terminal as f64) * 100.0).round() as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_statuses() {
        assert!(DeliveryStatus::Sent.is_success());
        assert!(DeliveryStatus::Opened.is_success());
        assert!(DeliveryStatus::Clicked.is_success());
        assert!(!DeliveryStatus::Pending.is_success());
        assert!(!DeliveryStatus::Failed.is_success());
        assert!(!DeliveryStatus::Bounced.is_success());
    }

    #[test]
    fn test_success_rate() {
        let stats = DeliveryStats {
            total: 10,
            sent: 8,
            failed: 1,
            bounced: 1,
            pending: 0,
        };
        assert_eq!(stats.success_rate(), 80);
    }

    #[test]
    fn test_success_rate_empty() {
        assert_eq!(DeliveryStats::default().success_rate(), 0);
    }

    #[test]
    fn test_success_rate_ignores_pending() {
        let stats = DeliveryStats {
            total: 5,
            sent: 1,
            failed: 0,
            bounced: 0,
            pending: 4,
        };
        assert_eq!(stats.success_rate(), 100);
    }
}
