use cassh_common::views::CertificateInfo;
use chrono::{DateTime, Utc};
use ssh_key::Certificate;

/// Summarise a certificate relative to the current time.
pub fn describe_certificate(cert: &Certificate) -> CertificateInfo {
    describe_certificate_at(cert, Utc::now())
}

/// Summarise a certificate relative to `now`. Derived purely from the
/// timestamps embedded in the certificate.
pub fn describe_certificate_at(cert: &Certificate, now: DateTime<Utc>) -> CertificateInfo {
    let valid_after = to_datetime(unix_seconds(cert.valid_after()));
    let valid_before = to_datetime(unix_seconds(cert.valid_before()));

    CertificateInfo {
        serial: cert.serial(),
        key_id: cert.key_id().to_string(),
        principals: cert.valid_principals().to_vec(),
        valid_after,
        valid_before,
        is_expired: now > valid_before,
        time_left_secs: valid_before.signed_duration_since(now).num_seconds(),
    }
}

// OpenSSH uses u64::MAX for "forever".
fn unix_seconds(timestamp: u64) -> i64 {
    i64::try_from(timestamp).unwrap_or(i64::MAX)
}

fn to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
