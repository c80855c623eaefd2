use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub meili_url: String,
    pub meili_key: String,
    pub sweep_interval: Duration,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "8080"),
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379"),
            meili_url: try_load("MEILI_URL", "http://127.0.0.1:7700"),
            meili_key: read_secret("MEILI_ADMIN_KEY"),
            sweep_interval: Duration::from_secs(try_load("SWEEP_INTERVAL_SECS", "30")),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

// Docker secret first, environment variable as the dev fallback.
fn read_secret(secret_name: &str) -> String {
    let path = format!("/run/secrets/{secret_name}");

    if let Ok(value) = read_to_string(&path) {
        return value.trim().to_string();
    }

    env::var(secret_name)
        .map_err(|_| {
            warn!("Failed to read {secret_name} from file or environment");
        })
        .expect("Secrets misconfigured!")
}
