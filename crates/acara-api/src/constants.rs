/// API version segment
pub const API_VERSION: &str = "v0";

/// Prefix of every versioned route
pub const API_PREFIX: &str = "/api/v0";

/// Default page size of the record listing
pub const DEFAULT_LIST_LIMIT: i64 = 50;

pub const MAX_LIST_LIMIT: i64 = 200;

/// Server-level cap on in-flight requests
pub const HTTP_CONCURRENCY_LIMIT: usize = 1024;
