use std::time::Duration;

pub const DEFAULT_API_ROOT: &str = "http://localhost:5000";
pub const POLLING_INTERVAL: Duration = Duration::from_millis(500);
pub const ANIMATION_TICK: Duration = Duration::from_millis(100);
/// Arrival radius in km (10 m).
pub const PROXIMITY_THRESHOLD_KM: f64 = 0.01;
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(2);
pub const INITIAL_ZOOM: u8 = 11;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub polling_interval: Duration,
    pub animation_tick: Duration,
    pub proximity_threshold_km: f64,
    pub notification_ttl: Duration,
    pub initial_zoom: u8,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_ROOT.to_string(),
            polling_interval: POLLING_INTERVAL,
            animation_tick: ANIMATION_TICK,
            proximity_threshold_km: PROXIMITY_THRESHOLD_KM,
            notification_ttl: NOTIFICATION_TTL,
            initial_zoom: INITIAL_ZOOM,
        }
    }
}

impl ClientConfig {
    /// Defaults, with the backend root taken from `ROUTE_VIZ_API_ROOT` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("ROUTE_VIZ_API_ROOT") {
            config.api_base_url = normalize_api_root(&url);
        }
        config
    }

    pub fn with_api_root(mut self, url: &str) -> Self {
        self.api_base_url = normalize_api_root(url);
        self
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }
}

fn normalize_api_root(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_constants() {
        let config = ClientConfig::default();
        assert_eq!(config.polling_interval, Duration::from_millis(500));
        assert_eq!(config.animation_tick, Duration::from_millis(100));
        assert_eq!(config.proximity_threshold_km, 0.01);
        assert_eq!(config.notification_ttl, Duration::from_secs(2));
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = ClientConfig::default().with_api_root("http://127.0.0.1:9000/");
        assert_eq!(config.endpoint("/status"), "http://127.0.0.1:9000/status");
        assert_eq!(config.endpoint("marker-close"), "http://127.0.0.1:9000/marker-close");
    }
}
