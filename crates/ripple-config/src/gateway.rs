// ============================================================================
// Gateway Configuration
// ============================================================================

use crate::{env_or, env_parse_or};

/// Upstream addresses and dispatch tunables for the API gateway
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Base URL of the identity service (e.g., "http://localhost:3001")
    pub identity_service_url: String,
    /// Base URL of the post service
    pub post_service_url: String,
    /// Base URL of the media service
    pub media_service_url: String,
    /// Per-request forwarding timeout in seconds
    pub service_timeout_secs: u64,
}

impl GatewayConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            identity_service_url: env_or("IDENTITY_SERVICE_URL", "http://localhost:3001"),
            post_service_url: env_or("POST_SERVICE_URL", "http://localhost:3002"),
            media_service_url: env_or("MEDIA_SERVICE_URL", "http://localhost:3003"),
            service_timeout_secs: env_parse_or("SERVICE_TIMEOUT_SECS", 10u64),
        }
    }
}
