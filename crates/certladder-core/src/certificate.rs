//! Certificate issuance for resolved attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::level::CompetencyLevel;
use crate::model::AttemptOutcome;
use crate::scoring::Percentage;

/// A certificate attesting a learner's level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    /// `CERT-<base36 millis>-<5 random chars>`, upper case.
    pub certificate_id: String,
    pub learner_id: String,
    pub level: CompetencyLevel,
    pub score: Percentage,
    pub issued_at: DateTime<Utc>,
}

impl Certificate {
    /// Issue a certificate for an outcome that resolved to a level.
    ///
    /// Returns `None` when the outcome carries no level (a failed first step).
    pub fn issue(learner_id: &str, outcome: &AttemptOutcome) -> Option<Self> {
        let level = outcome.level?;
        let issued_at = Utc::now();
        Some(Self {
            certificate_id: certificate_id(issued_at),
            learner_id: learner_id.to_string(),
            level,
            score: outcome.score,
            issued_at,
        })
    }
}

/// Build a certificate id from the issue time plus a random suffix.
pub fn certificate_id(at: DateTime<Utc>) -> String {
    let millis = u64::try_from(at.timestamp_millis()).unwrap_or(0);
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(5)
        .collect();
    format!("CERT-{}-{}", to_base36(millis), suffix).to_uppercase()
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
