//! Types shared between the cassh certificate authority, the identity flow and
//! the tools that drive them.

pub mod params;
pub mod views;
