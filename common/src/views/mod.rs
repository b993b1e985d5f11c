//! Output views for the various functions within cassh.

use serde::{Deserialize, Serialize};

mod ca;
pub use ca::*;

mod user;
pub use user::*;

/// An error response suitable for handing back to a client. This is used to
/// return errors in a consistent format, without leaking internal detail in
/// release builds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiErrorResponse {
    /// An optional error code that can be used to identify the type of error
    /// that occurred.
    pub code: Option<String>,

    /// A human-readable message describing the error that occurred.
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
