use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{anyhow, Context, Result};
use slot_forge::executor::{
    ConfirmationPolicy, ExecutionReport, HttpVerificationClient, LedgerVerifier, Orchestrator,
    SelfDestructForwarder, SessionIdentity, VerificationClient,
};
use slot_forge::ledger::rpc::RpcLedger;
use slot_forge::ledger::simulated::fixture;
use slot_forge::ledger::Ledger;
use slot_forge::runtime::args::{parse_runtime_args, RunMode, USAGE};
use slot_forge::solver::plan::{ExploitPlan, PlanConfig};
use slot_forge::storage::StorageLayout;
use slot_forge::utils::config::Config;
use slot_forge::utils::env_guard::load_dot_env;
use slot_forge::utils::hex::clean_hex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const SIMULATED_SECRET: &str = "simulated-run";

fn plan_for(config: &Config, target: Address, attacker: Address) -> Result<ExploitPlan> {
    let mut plan_config = PlanConfig::for_default_target(target, attacker, config.min_balance_wei);
    plan_config.funding_margin_bps = config.funding_margin_bps;
    plan_config.title_encoding = config.title_encoding;
    Ok(ExploitPlan::build(
        &StorageLayout::default_target(),
        &plan_config,
    )?)
}

fn signer_address(config: &Config) -> Result<Option<Address>> {
    config
        .private_key
        .as_deref()
        .map(|key| {
            clean_hex(key)
                .parse::<PrivateKeySigner>()
                .map(|signer| signer.address())
                .map_err(|err| anyhow!("invalid ETH_PRIVATE_KEY: {err}"))
        })
        .transpose()
}

fn print_report(report: &ExecutionReport) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(report).context("failed to render report")?
    );
    Ok(())
}

fn dry_run(config: &Config) -> Result<()> {
    let target = config.require_target()?;
    let attacker = match signer_address(config)? {
        Some(address) => address,
        None => {
            tracing::warn!(
                attacker = %fixture::ATTACKER,
                "ETH_PRIVATE_KEY unset; planning for the placeholder attacker"
            );
            fixture::ATTACKER
        }
    };
    let plan = plan_for(config, target, attacker)?;
    println!("{}", plan.to_json_pretty()?);
    Ok(())
}

async fn simulate(config: &Config) -> Result<()> {
    let ledger = Arc::new(fixture::default_target(true)?);
    let plan = plan_for(config, fixture::TARGET, fixture::ATTACKER)?;
    let ledger_dyn: Arc<dyn Ledger> = ledger.clone();
    let verifier = Arc::new(LedgerVerifier::new(
        ledger_dyn.clone(),
        config.min_balance_wei,
        SIMULATED_SECRET,
    ));
    let orchestrator = Orchestrator::new(ledger_dyn, Arc::new(SelfDestructForwarder), verifier)
        .with_policy(ConfirmationPolicy::new(Duration::from_secs(5)));
    let identity = SessionIdentity {
        user_address: fixture::ATTACKER,
        user_id: config
            .user_id
            .clone()
            .unwrap_or_else(|| "simulated".to_string()),
    };

    let report = orchestrator.execute(&plan, &identity).await?;
    tracing::info!(
        target = %fixture::TARGET,
        balance_wei = %ledger.balance(fixture::TARGET),
        "simulation complete"
    );
    print_report(&report)
}

async fn live(config: &Config) -> Result<()> {
    let target = config.require_target()?;
    let user_id = config.require_user_id()?.to_string();
    let ledger = RpcLedger::connect(
        config.require_rpc_url()?,
        config.require_private_key()?,
        config.chain_id,
    )
    .await?
    .with_receipt_poll(Duration::from_millis(config.receipt_poll_ms));
    let attacker = ledger.sender();
    let ledger: Arc<dyn Ledger> = Arc::new(ledger);

    let verifier: Arc<dyn VerificationClient> = match config.verifier_url.as_deref() {
        Some(url) => Arc::new(HttpVerificationClient::new(
            url,
            Duration::from_millis(config.verifier_timeout_ms),
        )),
        None => {
            tracing::warn!("VERIFIER_URL unset; verifying against ledger state only");
            Arc::new(LedgerVerifier::new(
                ledger.clone(),
                config.min_balance_wei,
                "ledger-verified",
            ))
        }
    };

    let plan = plan_for(config, target, attacker)?;
    tracing::info!(
        %target,
        %attacker,
        steps = plan.steps.len(),
        min_balance_wei = %config.min_balance_wei,
        "plan ready"
    );

    let orchestrator = Orchestrator::new(ledger, Arc::new(SelfDestructForwarder), verifier)
        .with_policy(config.confirmation);
    let identity = SessionIdentity {
        user_address: attacker,
        user_id,
    };
    let report = orchestrator.execute(&plan, &identity).await?;
    print_report(&report)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_runtime_args().inspect_err(|_| eprintln!("{USAGE}"))?;
    if args.help {
        eprintln!("{USAGE}");
        return Ok(());
    }

    load_dot_env(Path::new(".env"));
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load()?;
    args.apply_to(&mut config);
    tracing::info!(mode = args.mode.as_str(), "slot_forge starting");

    match args.mode {
        RunMode::DryRun => dry_run(&config),
        RunMode::Simulate => simulate(&config).await,
        RunMode::Live => live(&config).await,
    }
}
