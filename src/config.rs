use crate::domain::{Decimal, Symbol};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub hyperliquid_api_url: String,
    pub hyperliquid_account: String,
    pub bybit_api_url: String,
    pub bybit_settle_coin: String,
    /// Multiplier applied to Bybit's derived settlement interval.
    pub bybit_interval_scale: Decimal,
    pub refresh_interval: Duration,
    pub meta_refresh: Duration,
    pub watch_symbols: Vec<Symbol>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let hyperliquid_api_url = env_map
            .get("HYPERLIQUID_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.hyperliquid.xyz".to_string());

        let hyperliquid_account = env_map
            .get("HYPERLIQUID_ACCOUNT")
            .map(|s| s.trim().to_string())
            .ok_or_else(|| ConfigError::MissingEnv("HYPERLIQUID_ACCOUNT".to_string()))?;
        if !is_hex_address(&hyperliquid_account) {
            return Err(ConfigError::InvalidValue(
                "HYPERLIQUID_ACCOUNT".to_string(),
                "must be a 0x-prefixed hex address".to_string(),
            ));
        }

        let bybit_api_url = env_map
            .get("BYBIT_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.bybit.com".to_string());

        let bybit_settle_coin = env_map
            .get("BYBIT_SETTLE_COIN")
            .map(|s| s.trim().to_uppercase())
            .unwrap_or_else(|| "USDT".to_string());
        if bybit_settle_coin.is_empty() {
            return Err(ConfigError::InvalidValue(
                "BYBIT_SETTLE_COIN".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let bybit_interval_scale = env_map
            .get("BYBIT_INTERVAL_SCALE")
            .map(|s| s.as_str())
            .unwrap_or("1")
            .parse::<Decimal>()
            .ok()
            .filter(|scale| scale.is_positive())
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "BYBIT_INTERVAL_SCALE".to_string(),
                    "must be a positive decimal".to_string(),
                )
            })?;

        let refresh_interval_secs = parse_secs(&env_map, "REFRESH_INTERVAL_SECS", 200)?;
        if refresh_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "REFRESH_INTERVAL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let meta_refresh_secs = parse_secs(&env_map, "META_REFRESH_SECS", 300)?;

        let watch_symbols = parse_watch_symbols_from_map(&env_map)?;

        Ok(Config {
            port,
            hyperliquid_api_url,
            hyperliquid_account,
            bybit_api_url,
            bybit_settle_coin,
            bybit_interval_scale,
            refresh_interval: Duration::from_secs(refresh_interval_secs),
            meta_refresh: Duration::from_secs(meta_refresh_secs),
            watch_symbols,
        })
    }
}

fn parse_secs(
    env_map: &HashMap<String, String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match env_map.get(key) {
        Some(value) => value.trim().parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), "must be a whole number of seconds".to_string())
        }),
        None => Ok(default),
    }
}

fn is_hex_address(s: &str) -> bool {
    s.strip_prefix("0x")
        .map(|hex| !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

fn parse_watch_symbols_from_map(
    env_map: &HashMap<String, String>,
) -> Result<Vec<Symbol>, ConfigError> {
    let raw: Vec<String> = if let Some(symbols_str) = env_map.get("WATCH_SYMBOLS") {
        symbols_str.split(',').map(|s| s.to_string()).collect()
    } else if let Some(file_path) = env_map.get("WATCH_SYMBOLS_FILE") {
        let content = std::fs::read_to_string(file_path).map_err(|_| {
            ConfigError::InvalidValue(
                "WATCH_SYMBOLS_FILE".to_string(),
                "file not found or unreadable".to_string(),
            )
        })?;
        content.lines().map(|line| line.to_string()).collect()
    } else {
        Vec::new()
    };

    Ok(raw
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(Symbol::canonical)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(
            "HYPERLIQUID_ACCOUNT".to_string(),
            "0x00000000000000000000000000000000000000ab".to_string(),
        );
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.hyperliquid_api_url, "https://api.hyperliquid.xyz");
        assert_eq!(config.bybit_api_url, "https://api.bybit.com");
        assert_eq!(config.bybit_settle_coin, "USDT");
        assert_eq!(config.bybit_interval_scale, Decimal::from_i64(1));
        assert_eq!(config.refresh_interval, Duration::from_secs(200));
        assert_eq!(config.meta_refresh, Duration::from_secs(300));
        assert!(config.watch_symbols.is_empty());
    }

    #[test]
    fn test_missing_hyperliquid_account() {
        let mut env_map = setup_required_env();
        env_map.remove("HYPERLIQUID_ACCOUNT");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "HYPERLIQUID_ACCOUNT"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_hyperliquid_account() {
        let mut env_map = setup_required_env();
        env_map.insert("HYPERLIQUID_ACCOUNT".to_string(), "alice".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "HYPERLIQUID_ACCOUNT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_zero_refresh_interval_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("REFRESH_INTERVAL_SECS".to_string(), "0".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "REFRESH_INTERVAL_SECS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_non_positive_interval_scale_rejected() {
        for value in ["0", "-1", "abc"] {
            let mut env_map = setup_required_env();
            env_map.insert("BYBIT_INTERVAL_SCALE".to_string(), value.to_string());
            match Config::from_env_map(env_map) {
                Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "BYBIT_INTERVAL_SCALE"),
                _ => panic!("Expected InvalidValue error for {}", value),
            }
        }
    }

    #[test]
    fn test_watch_symbols_are_canonicalized() {
        let mut env_map = setup_required_env();
        env_map.insert("WATCH_SYMBOLS".to_string(), "BTC, ETHUSDT,,SOL-PERP ".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        let names: Vec<&str> = config.watch_symbols.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["BTC", "ETH", "SOL"]);
    }

    #[test]
    fn test_watch_symbols_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "BTC").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  kPEPE  ").unwrap();

        let mut env_map = setup_required_env();
        env_map.insert(
            "WATCH_SYMBOLS_FILE".to_string(),
            file.path().to_string_lossy().to_string(),
        );
        let config = Config::from_env_map(env_map).unwrap();
        let names: Vec<&str> = config.watch_symbols.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["BTC", "kPEPE"]);
    }

    #[test]
    fn test_missing_watch_symbols_file() {
        let mut env_map = setup_required_env();
        env_map.insert(
            "WATCH_SYMBOLS_FILE".to_string(),
            "/nonexistent/watch.txt".to_string(),
        );
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "WATCH_SYMBOLS_FILE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
