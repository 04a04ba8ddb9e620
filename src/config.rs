use std::{env, fmt::Display, str::FromStr};

use log::{info, warn};

pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub jwt_secret: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            host: env_or("HOST", "127.0.0.1"),
            port: env_or("PORT", "8080"),
            database_path: env_or("DATABASE_PATH", "placerate.db"),
            jwt_secret: require("JWT_SECRET"),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = match env::var(key) {
        Ok(value) => value,
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default.to_string()
        }
    };

    raw.parse()
        .map_err(|e| warn!("Invalid {key} value: {e}"))
        .expect("Environment misconfigured!")
}

fn require(key: &str) -> String {
    env::var(key)
        .map_err(|_| warn!("Required environment variable {key} is not set"))
        .expect("Environment misconfigured!")
}
