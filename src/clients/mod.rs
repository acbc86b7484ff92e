//! Outbound HTTP plumbing toward the remote capability services.

pub mod transport;
