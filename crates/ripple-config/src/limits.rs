// ============================================================================
// Rate Limit Configuration
// ============================================================================

use crate::env_parse_or;

/// A single fixed-window counter policy: at most `max` requests per `window_secs`.
#[derive(Clone, Copy, Debug)]
pub struct FixedWindowConfig {
    pub max: u32,
    pub window_secs: u64,
}

/// Admission-control tunables.
///
/// Two independent policies coexist:
/// - fixed-window counters for general and sensitive traffic;
/// - a short burst window that places a key into an explicit blocked state
///   on overflow.
#[derive(Clone, Copy, Debug)]
pub struct RateLimitConfig {
    /// General gateway traffic, per client key
    pub general: FixedWindowConfig,
    /// Sensitive endpoints (registration), tighter ceiling
    pub sensitive: FixedWindowConfig,
    /// Burst budget consumed per request inside `burst_window_secs`
    pub burst_points: u32,
    pub burst_window_secs: u64,
    /// Cooldown applied once the burst budget overflows
    pub burst_block_secs: u64,
}

impl RateLimitConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            general: FixedWindowConfig {
                max: env_parse_or("RATE_LIMIT_GENERAL_MAX", 100u32),
                window_secs: env_parse_or("RATE_LIMIT_GENERAL_WINDOW_SECS", 900u64),
            },
            sensitive: FixedWindowConfig {
                max: env_parse_or("RATE_LIMIT_SENSITIVE_MAX", 50u32),
                window_secs: env_parse_or("RATE_LIMIT_SENSITIVE_WINDOW_SECS", 900u64),
            },
            burst_points: env_parse_or("RATE_LIMIT_BURST_POINTS", 15u32),
            burst_window_secs: env_parse_or("RATE_LIMIT_BURST_WINDOW_SECS", 1u64),
            burst_block_secs: env_parse_or("RATE_LIMIT_BURST_BLOCK_SECS", 180u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let limits = RateLimitConfig::from_env();
        // 100 requests per 15 minutes for general traffic
        assert_eq!(limits.general.window_secs, 900);
        // burst overflow blocks for 3 minutes
        assert_eq!(limits.burst_block_secs, 180);
    }
}
