use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceStatus {
    Compliant,
    NeedsReview,
    NonCompliant,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "Compliant",
            ComplianceStatus::NeedsReview => "NeedsReview",
            ComplianceStatus::NonCompliant => "NonCompliant",
        }
    }

    /// Inverse of [`ComplianceStatus::as_str`]. Unrecognized text lands in the
    /// review queue instead of erroring.
    pub fn parse(s: &str) -> Self {
        match s {
            "Compliant" => ComplianceStatus::Compliant,
            "NonCompliant" => ComplianceStatus::NonCompliant,
            _ => ComplianceStatus::NeedsReview,
        }
    }
}

/// A truck compliance check. Drivers can only file a check for review;
/// status changes afterwards go through [`ComplianceCheck::set_status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub id: Uuid,
    pub site: String,
    pub truck_id: Uuid,
    pub truck_number: String,
    pub last_check: DateTime<Utc>,
    pub status: ComplianceStatus,
    pub notes: String,
}

impl ComplianceCheck {
    /// Driver-filed checks always enter the review queue regardless of what
    /// the client claims.
    pub fn from_driver(
        site: String,
        truck_id: Uuid,
        truck_number: String,
        notes: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            site,
            truck_id,
            truck_number,
            last_check: now,
            status: ComplianceStatus::NeedsReview,
            notes,
        }
    }

    pub fn set_status(&mut self, status: ComplianceStatus, now: DateTime<Utc>) {
        self.status = status;
        self.last_check = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_checks_always_start_in_review() {
        let check = ComplianceCheck::from_driver(
            "Sitio Norte".into(),
            Uuid::new_v4(),
            "T-014".into(),
            "brake wear".into(),
            Utc::now(),
        );
        assert_eq!(check.status, ComplianceStatus::NeedsReview);
    }

    #[test]
    fn status_updates_touch_last_check() {
        let filed = Utc::now();
        let mut check = ComplianceCheck::from_driver(
            "Sitio Norte".into(),
            Uuid::new_v4(),
            "T-014".into(),
            String::new(),
            filed,
        );

        let later = filed + chrono::Duration::hours(2);
        check.set_status(ComplianceStatus::NonCompliant, later);
        assert_eq!(check.status, ComplianceStatus::NonCompliant);
        assert_eq!(check.last_check, later);
    }

    #[test]
    fn status_text_round_trips_and_unknown_text_needs_review() {
        for status in [
            ComplianceStatus::Compliant,
            ComplianceStatus::NeedsReview,
            ComplianceStatus::NonCompliant,
        ] {
            assert_eq!(ComplianceStatus::parse(status.as_str()), status);
        }
        assert_eq!(
            ComplianceStatus::parse("Retired"),
            ComplianceStatus::NeedsReview
        );
    }
}
