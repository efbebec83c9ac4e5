/// Versioned prefix every route is nested under
pub const API_PREFIX: &str = "/api/v0";

/// Largest accepted request body; every endpoint takes small JSON documents
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// How often expired upload-match results are purged
pub const TRANSIENT_CLEANUP_INTERVAL_SECS: u64 = 60;
