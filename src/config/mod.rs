use serde::Deserialize;
use std::env;

// Top-level configuration - container for all settings
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub payment: PaymentConfig,
}

// Database settings
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Per-pool TTLs and sweep intervals, in seconds. Sweep intervals are
// coarser than entry TTLs on purpose: the sweep only bounds memory,
// expiry itself is enforced on read.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub event_ttl_secs: u64,
    pub event_sweep_secs: u64,
    pub booking_ttl_secs: u64,
    pub booking_sweep_secs: u64,
    pub profile_ttl_secs: u64,
    pub profile_sweep_secs: u64,
    pub seat_map_ttl_secs: u64,
    pub user_bookings_ttl_secs: u64,
}

// Payment gateway settings
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Probability that a payment draw succeeds, in [0, 1].
    pub success_rate: f64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_default(),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            cache: CacheConfig {
                event_ttl_secs: env_u64("CACHE_EVENT_TTL_SECS", 300),
                event_sweep_secs: env_u64("CACHE_EVENT_SWEEP_SECS", 60),
                booking_ttl_secs: env_u64("CACHE_BOOKING_TTL_SECS", 180),
                booking_sweep_secs: env_u64("CACHE_BOOKING_SWEEP_SECS", 60),
                profile_ttl_secs: env_u64("CACHE_PROFILE_TTL_SECS", 600),
                profile_sweep_secs: env_u64("CACHE_PROFILE_SWEEP_SECS", 120),
                seat_map_ttl_secs: env_u64("CACHE_SEAT_MAP_TTL_SECS", 120),
                user_bookings_ttl_secs: env_u64("CACHE_USER_BOOKINGS_TTL_SECS", 180),
            },
            payment: PaymentConfig {
                success_rate: env::var("PAYMENT_SUCCESS_RATE")
                    .unwrap_or_else(|_| "0.9".to_string())
                    .parse::<f64>()
                    .expect("PAYMENT_SUCCESS_RATE must be a valid number")
                    .clamp(0.0, 1.0),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: DatabaseConfig {
                url: String::new(),
                pool_size: 20,
            },
            cache: CacheConfig {
                event_ttl_secs: 300,
                event_sweep_secs: 60,
                booking_ttl_secs: 180,
                booking_sweep_secs: 60,
                profile_ttl_secs: 600,
                profile_sweep_secs: 120,
                seat_map_ttl_secs: 120,
                user_bookings_ttl_secs: 180,
            },
            payment: PaymentConfig { success_rate: 0.9 },
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
