//! Input parameters for the various functions within cassh.

mod auth;
pub use auth::*;
