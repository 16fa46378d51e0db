//! Runs plans for several targets at once.
//!
//! Plans that share a target run one after another inside the same task; distinct targets
//! run concurrently. Nothing mutable is shared between tasks beyond what each orchestrator
//! already owns.

use crate::error::{ExecutionError, Result};
use crate::executor::orchestrator::{ExecutionReport, Orchestrator, SessionIdentity};
use crate::solver::plan::ExploitPlan;
use alloy::primitives::Address;
use std::collections::BTreeMap;
use tokio::task::JoinSet;

pub struct CampaignEntry {
    pub orchestrator: Orchestrator,
    pub plan: ExploitPlan,
    pub identity: SessionIdentity,
}

#[derive(Debug)]
pub struct CampaignResult {
    pub target: Address,
    pub outcome: Result<ExecutionReport>,
}

/// Results come back grouped by target in ascending address order, and in submission order
/// within a target.
pub async fn run_campaign(entries: Vec<CampaignEntry>) -> Vec<CampaignResult> {
    let mut by_target: BTreeMap<Address, Vec<CampaignEntry>> = BTreeMap::new();
    for entry in entries {
        by_target.entry(entry.plan.target).or_default().push(entry);
    }
    let expected: BTreeMap<Address, usize> = by_target
        .iter()
        .map(|(target, group)| (*target, group.len()))
        .collect();
    tracing::info!(targets = expected.len(), "campaign started");

    let mut set = JoinSet::new();
    for (target, group) in by_target {
        set.spawn(async move {
            let mut outcomes = Vec::with_capacity(group.len());
            for entry in group {
                let outcome = entry.orchestrator.execute(&entry.plan, &entry.identity).await;
                outcomes.push(outcome);
            }
            (target, outcomes)
        });
    }

    let mut finished: BTreeMap<Address, Vec<Result<ExecutionReport>>> = BTreeMap::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((target, outcomes)) => {
                finished.insert(target, outcomes);
            }
            Err(err) => {
                tracing::error!(error = %err, "campaign task failed");
            }
        }
    }

    let mut results = Vec::new();
    for (target, count) in expected {
        match finished.remove(&target) {
            Some(outcomes) => {
                for outcome in outcomes {
                    results.push(CampaignResult { target, outcome });
                }
            }
            None => {
                // Fail closed: a task that never reported counts against every plan it owned.
                for _ in 0..count {
                    results.push(CampaignResult {
                        target,
                        outcome: Err(ExecutionError::TaskFailed {
                            target: format!("{target:#x}"),
                        }
                        .into()),
                    });
                }
            }
        }
    }
    results
}
