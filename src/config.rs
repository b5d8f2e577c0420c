use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,
    pub flush_interval_secs: u64,
    pub flush_jitter_ms: u64,
    pub gps_batch_size: usize,
    pub queue_capacity: usize,
    pub queue_spool: String,
    pub rate_per_km: f64,
    pub geo_timeout_secs: i64,
    pub geo_max_age_secs: i64,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
        let db_name = env::var("DB_DATABASE").unwrap_or_else(|_| "minehaul".to_string());
        let db_user = env::var("DB_USER").unwrap_or_else(|_| "minehaul".to_string());
        let db_pwd = env::var("DB_PWD").unwrap_or_else(|_| "minehaul".to_string());

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            db_user, db_pwd, db_host, db_port, db_name
        );

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let flush_interval_secs = env::var("FLUSH_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);
        let flush_jitter_ms = env::var("FLUSH_JITTER_MS")
            .unwrap_or_else(|_| "500".to_string())
            .parse()
            .unwrap_or(500);
        let gps_batch_size = env::var("GPS_BATCH_SIZE")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);
        let queue_capacity = env::var("QUEUE_CAPACITY")
            .unwrap_or_else(|_| "500".to_string())
            .parse()
            .unwrap_or(500);
        let queue_spool =
            env::var("QUEUE_SPOOL").unwrap_or_else(|_| "minehaul-queue.json".to_string());
        let rate_per_km = env::var("RATE_PER_KM")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50.0);
        let geo_timeout_secs = env::var("GEO_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let geo_max_age_secs = env::var("GEO_MAX_AGE_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        Ok(Self {
            database_url,
            log_level,
            flush_interval_secs,
            flush_jitter_ms,
            gps_batch_size,
            queue_capacity,
            queue_spool,
            rate_per_km,
            geo_timeout_secs,
            geo_max_age_secs,
        })
    }
}
