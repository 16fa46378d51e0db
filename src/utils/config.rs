use crate::error::{ConfigError, Result};
use crate::executor::submission::ConfirmationPolicy;
use crate::solver::funding::DEFAULT_FUNDING_MARGIN_BPS;
use crate::storage::TitleEncoding;
use crate::utils::hex::{is_private_key_hex, parse_address, to_u256};
use alloy::primitives::{Address, U256};
use std::env;
use std::time::Duration;

/// 0.005 ether.
pub const DEFAULT_MIN_BALANCE_WEI: u64 = 5_000_000_000_000_000;
const DEFAULT_CONFIRMATION_TIMEOUT_MS: u64 = 60_000;
const MIN_CONFIRMATION_TIMEOUT_MS: u64 = 1_000;
const MAX_CONFIRMATION_TIMEOUT_MS: u64 = 600_000;
const DEFAULT_RECEIPT_POLL_MS: u64 = 1_000;
const DEFAULT_VERIFIER_TIMEOUT_MS: u64 = 10_000;
const MAX_EXTRA_WAITS: u32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: Option<String>,
    pub chain_id: Option<u64>,
    pub private_key: Option<String>,
    pub target: Option<Address>,
    pub verifier_url: Option<String>,
    pub user_id: Option<String>,
    pub min_balance_wei: U256,
    pub funding_margin_bps: u64,
    pub title_encoding: TitleEncoding,
    pub confirmation: ConfirmationPolicy,
    pub receipt_poll_ms: u64,
    pub verifier_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: None,
            chain_id: None,
            private_key: None,
            target: None,
            verifier_url: None,
            user_id: None,
            min_balance_wei: U256::from(DEFAULT_MIN_BALANCE_WEI),
            funding_margin_bps: DEFAULT_FUNDING_MARGIN_BPS,
            title_encoding: TitleEncoding::default(),
            confirmation: ConfirmationPolicy::new(Duration::from_millis(
                DEFAULT_CONFIRMATION_TIMEOUT_MS,
            )),
            receipt_poll_ms: DEFAULT_RECEIPT_POLL_MS,
            verifier_timeout_ms: DEFAULT_VERIFIER_TIMEOUT_MS,
        }
    }
}

pub fn validate_http_url(name: &str, raw: &str) -> Result<()> {
    let parsed = raw.parse::<reqwest::Url>().map_err(|e| {
        ConfigError::InvalidConfig(format!("{name} must be a valid URL, got `{raw}`: {e}"))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidConfig(format!(
            "{name} must use http(s) scheme, got `{other}`"
        ))
        .into()),
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| {
        ConfigError::InvalidConfig(format!("{name} must be an unsigned integer, got `{raw}`")).into()
    })
}

pub fn parse_target_address(name: &str, raw: &str) -> Result<Address> {
    parse_address(raw).ok_or_else(|| {
        ConfigError::InvalidConfig(format!("{name} must be a 20-byte hex address, got `{raw}`"))
            .into()
    })
}

pub fn parse_wei(name: &str, raw: &str) -> Result<U256> {
    to_u256(raw).ok_or_else(|| {
        ConfigError::InvalidConfig(format!("{name} must be a wei amount, got `{raw}`")).into()
    })
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Unset optional keys keep their defaults;
    /// set keys must parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = non_empty(lookup("ETH_RPC_URL")) {
            validate_http_url("ETH_RPC_URL", &url)?;
            config.rpc_url = Some(url);
        }
        if let Some(raw) = non_empty(lookup("CHAIN_ID")) {
            let chain_id: u64 = parse_number("CHAIN_ID", &raw)?;
            if chain_id == 0 {
                return Err(ConfigError::InvalidConfig("CHAIN_ID must be non-zero".into()).into());
            }
            config.chain_id = Some(chain_id);
        }
        if let Some(key) = non_empty(lookup("ETH_PRIVATE_KEY")) {
            if !is_private_key_hex(&key) {
                return Err(ConfigError::InvalidConfig(
                    "ETH_PRIVATE_KEY must be 32 bytes of hex".to_string(),
                )
                .into());
            }
            config.private_key = Some(key);
        }
        if let Some(raw) = non_empty(lookup("TARGET_ADDRESS")) {
            config.target = Some(parse_target_address("TARGET_ADDRESS", &raw)?);
        }
        if let Some(url) = non_empty(lookup("VERIFIER_URL")) {
            validate_http_url("VERIFIER_URL", &url)?;
            config.verifier_url = Some(url);
        }
        config.user_id = non_empty(lookup("USER_ID"));

        if let Some(raw) = non_empty(lookup("MIN_BALANCE_WEI")) {
            config.min_balance_wei = parse_wei("MIN_BALANCE_WEI", &raw)?;
        }
        if let Some(raw) = non_empty(lookup("FUNDING_MARGIN_BPS")) {
            config.funding_margin_bps = parse_number("FUNDING_MARGIN_BPS", &raw)?;
        }
        if let Some(raw) = non_empty(lookup("TITLE_ENCODING")) {
            config.title_encoding = raw
                .parse()
                .map_err(|err| ConfigError::InvalidConfig(format!("TITLE_ENCODING: {err}")))?;
        }

        let timeout_ms = match non_empty(lookup("CONFIRMATION_TIMEOUT_MS")) {
            Some(raw) => parse_number::<u64>("CONFIRMATION_TIMEOUT_MS", &raw)?
                .clamp(MIN_CONFIRMATION_TIMEOUT_MS, MAX_CONFIRMATION_TIMEOUT_MS),
            None => DEFAULT_CONFIRMATION_TIMEOUT_MS,
        };
        let extra_waits = match non_empty(lookup("CONFIRMATION_EXTRA_WAITS")) {
            Some(raw) => parse_number::<u32>("CONFIRMATION_EXTRA_WAITS", &raw)?.min(MAX_EXTRA_WAITS),
            None => 0,
        };
        config.confirmation =
            ConfirmationPolicy::new(Duration::from_millis(timeout_ms)).with_extra_waits(extra_waits);

        if let Some(raw) = non_empty(lookup("RECEIPT_POLL_MS")) {
            config.receipt_poll_ms = parse_number::<u64>("RECEIPT_POLL_MS", &raw)?.clamp(50, 30_000);
        }
        if let Some(raw) = non_empty(lookup("VERIFIER_TIMEOUT_MS")) {
            config.verifier_timeout_ms =
                parse_number::<u64>("VERIFIER_TIMEOUT_MS", &raw)?.clamp(500, 120_000);
        }

        Ok(config)
    }

    pub fn require_rpc_url(&self) -> Result<&str> {
        self.rpc_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingConfig("ETH_RPC_URL must be set".to_string()).into())
    }

    pub fn require_private_key(&self) -> Result<&str> {
        self.private_key.as_deref().ok_or_else(|| {
            ConfigError::MissingConfig("ETH_PRIVATE_KEY must be set".to_string()).into()
        })
    }

    pub fn require_target(&self) -> Result<Address> {
        self.target.ok_or_else(|| {
            ConfigError::MissingConfig("TARGET_ADDRESS (or --target) must be set".to_string())
                .into()
        })
    }

    pub fn require_user_id(&self) -> Result<&str> {
        self.user_id.as_deref().ok_or_else(|| {
            ConfigError::MissingConfig("USER_ID (or --user-id) must be set".to_string()).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForgeError;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.min_balance_wei, U256::from(DEFAULT_MIN_BALANCE_WEI));
        assert_eq!(config.funding_margin_bps, 2_000);
        assert_eq!(config.confirmation.timeout, Duration::from_secs(60));
        assert_eq!(config.confirmation.extra_waits, 0);
        assert_eq!(config.title_encoding, TitleEncoding::Bytes32Word);
        assert!(config.require_rpc_url().is_err());
    }

    #[test]
    fn test_values_are_parsed_and_clamped() {
        let config = Config::from_lookup(lookup(&[
            ("ETH_RPC_URL", "http://127.0.0.1:8545"),
            ("CHAIN_ID", "31337"),
            ("TARGET_ADDRESS", "0x00000000000000000000000000000000000000aa"),
            ("MIN_BALANCE_WEI", "0x10"),
            ("CONFIRMATION_TIMEOUT_MS", "5"),
            ("CONFIRMATION_EXTRA_WAITS", "99"),
            ("TITLE_ENCODING", "string"),
        ]))
        .unwrap();
        assert_eq!(config.title_encoding, TitleEncoding::SolidityString);
        assert_eq!(config.chain_id, Some(31337));
        assert_eq!(config.require_target().unwrap(), Address::with_last_byte(0xaa));
        assert_eq!(config.min_balance_wei, U256::from(16u64));
        assert_eq!(
            config.confirmation.timeout,
            Duration::from_millis(MIN_CONFIRMATION_TIMEOUT_MS)
        );
        assert_eq!(config.confirmation.extra_waits, MAX_EXTRA_WAITS);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = Config::from_lookup(lookup(&[("ETH_RPC_URL", "ws://localhost:8546")]))
            .unwrap_err();
        assert!(matches!(err, ForgeError::Config(ConfigError::InvalidConfig(_))));
        assert!(Config::from_lookup(lookup(&[("ETH_PRIVATE_KEY", "0x12")])).is_err());
        assert!(Config::from_lookup(lookup(&[("CHAIN_ID", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("MIN_BALANCE_WEI", "lots")])).is_err());
        assert!(Config::from_lookup(lookup(&[("TITLE_ENCODING", "utf8")])).is_err());
    }
}
