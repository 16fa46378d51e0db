use crate::utils::config::{parse_target_address, parse_wei, validate_http_url, Config};
use alloy::primitives::{Address, U256};
use anyhow::anyhow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Submit against the configured node and verifier.
    #[default]
    Live,
    /// Print the plan as JSON and exit.
    DryRun,
    /// Execute against the in-memory ledger.
    Simulate,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::DryRun => "dry-run",
            Self::Simulate => "simulate",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeArgs {
    pub target: Option<Address>,
    pub rpc_url: Option<String>,
    pub chain_id: Option<u64>,
    pub user_id: Option<String>,
    pub verifier_url: Option<String>,
    pub min_balance_wei: Option<U256>,
    pub mode: RunMode,
    pub help: bool,
}

pub const USAGE: &str = "usage: slot_forge [--target <0x...>] [--rpc-url <url>] [--chain-id <id>]\n\
    \x20                 [--user-id <id>] [--verifier-url <url>] [--min-balance-wei <wei>]\n\
    \x20                 [--dry-run | --simulate]\n\
    env fallback: TARGET_ADDRESS, ETH_RPC_URL, CHAIN_ID, USER_ID, VERIFIER_URL, MIN_BALANCE_WEI";

pub fn parse_runtime_args_from_iter<I, S>(args: I) -> anyhow::Result<RuntimeArgs>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = RuntimeArgs::default();
    let mut iter = args.into_iter().map(|arg| arg.as_ref().to_string());
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .ok_or_else(|| anyhow!("missing value for {flag}"))
        };
        match arg.as_str() {
            "--help" | "-h" => parsed.help = true,
            "--dry-run" => parsed.mode = RunMode::DryRun,
            "--simulate" => parsed.mode = RunMode::Simulate,
            "--target" | "-t" => {
                let raw = value(&arg)?;
                parsed.target = Some(parse_target_address("--target", &raw)?);
            }
            "--rpc-url" | "-r" => {
                let raw = value(&arg)?;
                validate_http_url("--rpc-url", &raw)?;
                parsed.rpc_url = Some(raw);
            }
            "--chain-id" | "-c" => {
                let raw = value(&arg)?;
                parsed.chain_id = Some(
                    raw.parse::<u64>()
                        .map_err(|e| anyhow!("invalid chain id '{raw}': {e}"))?,
                );
            }
            "--user-id" | "-u" => parsed.user_id = Some(value(&arg)?),
            "--verifier-url" => {
                let raw = value(&arg)?;
                validate_http_url("--verifier-url", &raw)?;
                parsed.verifier_url = Some(raw);
            }
            "--min-balance-wei" => {
                let raw = value(&arg)?;
                parsed.min_balance_wei = Some(parse_wei("--min-balance-wei", &raw)?);
            }
            other => return Err(anyhow!("unknown argument '{other}'")),
        }
    }
    Ok(parsed)
}

pub fn parse_runtime_args() -> anyhow::Result<RuntimeArgs> {
    parse_runtime_args_from_iter(std::env::args().skip(1))
}

impl RuntimeArgs {
    /// Flags win over environment values.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(target) = self.target {
            config.target = Some(target);
        }
        if let Some(url) = &self.rpc_url {
            config.rpc_url = Some(url.clone());
        }
        if let Some(chain_id) = self.chain_id {
            config.chain_id = Some(chain_id);
        }
        if let Some(user_id) = &self.user_id {
            config.user_id = Some(user_id.clone());
        }
        if let Some(url) = &self.verifier_url {
            config.verifier_url = Some(url.clone());
        }
        if let Some(min) = self.min_balance_wei {
            config.min_balance_wei = min;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_args_default_to_live_mode() {
        let parsed = parse_runtime_args_from_iter(Vec::<&str>::new()).expect("parse");
        assert_eq!(parsed.mode, RunMode::Live);
        assert!(parsed.target.is_none());
        assert!(!parsed.help);
    }

    #[test]
    fn runtime_args_parse_flags_and_override_config() {
        let parsed = parse_runtime_args_from_iter([
            "--target",
            "0x000000000000000000000000000000000000dEaD",
            "--chain-id",
            "31337",
            "--min-balance-wei",
            "5000",
            "--user-id",
            "player-1",
            "--simulate",
        ])
        .expect("parse");
        assert_eq!(parsed.mode, RunMode::Simulate);

        let mut config = Config::default();
        parsed.apply_to(&mut config);
        assert_eq!(
            config.target,
            Some(
                "0x000000000000000000000000000000000000dEaD"
                    .parse::<Address>()
                    .expect("valid address")
            )
        );
        assert_eq!(config.chain_id, Some(31337));
        assert_eq!(config.min_balance_wei, U256::from(5_000u64));
        assert_eq!(config.user_id.as_deref(), Some("player-1"));
    }

    #[test]
    fn runtime_args_reject_unknown_and_incomplete_flags() {
        let err = parse_runtime_args_from_iter(["--profile", "deep"]).expect_err("unknown flag");
        assert!(err.to_string().contains("unknown argument"), "{err}");

        let err = parse_runtime_args_from_iter(["--target"]).expect_err("missing value");
        assert!(err.to_string().contains("missing value for --target"), "{err}");

        assert!(parse_runtime_args_from_iter(["--target", "not-an-address"]).is_err());
        assert!(parse_runtime_args_from_iter(["--rpc-url", "ws://x"]).is_err());
    }
}
