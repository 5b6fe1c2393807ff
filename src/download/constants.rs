//! Constants for the download module (timeouts, pool sizing).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large payloads).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default per-host connection bound when no concurrency hint is given.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Minimum allowed pool size.
pub const MIN_POOL_SIZE: usize = 1;

/// Maximum allowed pool size.
pub const MAX_POOL_SIZE: usize = 1000;

/// Proxy-bound clients kept by one pool before the least recently used is dropped.
pub const MAX_PROXIED_CLIENTS: usize = 256;
