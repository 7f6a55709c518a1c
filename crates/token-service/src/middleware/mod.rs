//! Custom middleware.

pub mod trusted_host;
