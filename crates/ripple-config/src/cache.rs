// ============================================================================
// Cache Configuration
// ============================================================================

use crate::env_parse_or;

/// Keyed-cache tunables for service read paths
#[derive(Clone, Copy, Debug)]
pub struct CacheConfig {
    /// TTL applied to cached query results, in seconds
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            ttl_secs: env_parse_or("CACHE_TTL_SECS", 300u64),
        }
    }
}
