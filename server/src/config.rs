use soccer_shared::config::MatchConfig;
use std::str::FromStr;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub tick_rate_hz: u32,
    /// AI controller interval, independent of the physics tick
    pub ai_interval_ms: u64,
    pub broadcast_rate_hz: u32,
    pub rng_seed: u64,
    /// Used for every match unless `start_match` overrides it
    pub match_config: MatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9002".to_string(),
            tick_rate_hz: 60,
            ai_interval_ms: 16,
            broadcast_rate_hz: 30,
            rng_seed: 42,
            match_config: MatchConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults with `SOCCER_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides from `lookup`. Values that fail to parse are logged
    /// and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("SOCCER_LISTEN_ADDR").filter(|a| !a.is_empty()) {
            self.listen_addr = addr;
        }
        if let Some(v) = parse_var(&lookup, "SOCCER_TICK_RATE_HZ") {
            self.tick_rate_hz = v;
        }
        if let Some(v) = parse_var(&lookup, "SOCCER_AI_INTERVAL_MS") {
            self.ai_interval_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "SOCCER_BROADCAST_RATE_HZ") {
            self.broadcast_rate_hz = v;
        }
        if let Some(v) = parse_var(&lookup, "SOCCER_RNG_SEED") {
            self.rng_seed = v;
        }
        if let Some(v) = parse_var(&lookup, "SOCCER_BALL_COUNT") {
            self.match_config.ball_count = v;
        }
        if let Some(v) = parse_var(&lookup, "SOCCER_MATCH_SECONDS") {
            self.match_config.match_seconds = v;
        }
        if let Some(v) = parse_var(&lookup, "SOCCER_PERFORMANCE_MODE") {
            self.match_config.performance_mode = v;
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!(
                "listen_addr is not a valid socket address: {}",
                self.listen_addr
            ));
        }
        if self.tick_rate_hz == 0 {
            return Err("tick_rate_hz must be > 0".to_string());
        }
        if self.ai_interval_ms == 0 {
            return Err("ai_interval_ms must be > 0".to_string());
        }
        if self.broadcast_rate_hz == 0 {
            return Err("broadcast_rate_hz must be > 0".to_string());
        }
        if self.broadcast_rate_hz > self.tick_rate_hz {
            return Err(format!(
                "broadcast_rate_hz ({}) must not exceed tick_rate_hz ({})",
                self.broadcast_rate_hz, self.tick_rate_hz
            ));
        }
        self.match_config.validate()
    }

    /// Broadcast a frame every N physics ticks. Performance mode halves the
    /// frame rate.
    pub fn broadcast_every_n(&self) -> u64 {
        let n = (self.tick_rate_hz / self.broadcast_rate_hz.max(1)).max(1) as u64;
        if self.match_config.performance_mode {
            n * 2
        } else {
            n
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}
