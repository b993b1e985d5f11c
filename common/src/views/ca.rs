use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Human-readable summary of an issued SSH user certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInfo {
    pub serial: u64,
    pub key_id: String,
    pub principals: Vec<String>,
    pub valid_after: DateTime<Utc>,
    pub valid_before: DateTime<Utc>,
    /// Whether the certificate had expired at the time it was described.
    pub is_expired: bool,
    /// Seconds until `valid_before`. Negative once the certificate expired.
    pub time_left_secs: i64,
}

impl CertificateInfo {
    pub fn time_left(&self) -> Duration {
        Duration::seconds(self.time_left_secs)
    }
}
