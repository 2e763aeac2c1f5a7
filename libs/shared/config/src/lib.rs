use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub default_avg_consultation_minutes: i64,
    pub delay_threshold_minutes: i64,
    pub default_break_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("PORT not set, using default 3000");
                    3000
                }),
            default_avg_consultation_minutes: Self::minutes_var(
                "QUEUE_DEFAULT_AVG_CONSULT_MINUTES",
                15,
            ),
            delay_threshold_minutes: Self::minutes_var("QUEUE_DELAY_THRESHOLD_MINUTES", 15),
            default_break_minutes: Self::minutes_var("QUEUE_DEFAULT_BREAK_MINUTES", 15),
        }
    }

    fn minutes_var(name: &str, default: i64) -> i64 {
        match env::var(name).ok().and_then(|v| v.parse::<i64>().ok()) {
            Some(v) if v > 0 => v,
            Some(v) => {
                warn!(
                    "{} must be positive, got {}; using default {}",
                    name, v, default
                );
                default
            }
            None => default,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            default_avg_consultation_minutes: 15,
            delay_threshold_minutes: 15,
            default_break_minutes: 15,
        }
    }
}
