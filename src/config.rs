use std::env;

use crate::error::AppError;
use crate::models::courier::GeoPoint;
use crate::sim::SimSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    /// Fixed pickup point every delivery starts from.
    pub merchant: GeoPoint,
    pub sim: SimSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let sim = SimSettings {
            speed_mps: parse_or_default("SIM_SPEED_MPS", 10.0)?,
            tick_interval_ms: parse_or_default("SIM_TICK_MS", 250)?,
            arrival_threshold_m: parse_or_default("SIM_ARRIVAL_THRESHOLD_M", 20.0)?,
            pickup_delay_ms: parse_or_default("SIM_PICKUP_DELAY_MS", 2_000)?,
            delivering_delay_ms: parse_or_default("SIM_DELIVERING_DELAY_MS", 3_500)?,
            traffic_probability: parse_or_default("SIM_TRAFFIC_PROBABILITY", 0.08)?,
            traffic_pause_min_ms: parse_or_default("SIM_TRAFFIC_PAUSE_MIN_MS", 2_000)?,
            traffic_pause_max_ms: parse_or_default("SIM_TRAFFIC_PAUSE_MAX_MS", 6_000)?,
            seed: parse_optional("SIM_SEED")?,
        };

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            merchant: GeoPoint {
                lat: parse_or_default("MERCHANT_LAT", -33.9249)?,
                lng: parse_or_default("MERCHANT_LNG", 18.4241)?,
            },
            sim,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

fn parse_optional<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(None),
    }
}
