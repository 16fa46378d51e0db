//! Final verification of a completed plan.
//!
//! Three predicates must hold at once: the session identity owns the target, the flag is
//! captured, and the target balance is strictly above the minimum. The remote verifier is
//! authoritative; [`LedgerVerifier`] evaluates the same predicates locally for simulated runs.

use crate::error::VerifyError;
use crate::ledger::{Ledger, TargetSnapshot};
use crate::utils::error::compact_error_message;
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Predicate {
    Ownership,
    FlagCaptured,
    MinimumBalance,
}

impl Predicate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ownership => "ownership",
            Self::FlagCaptured => "flagCaptured",
            Self::MinimumBalance => "minimumBalance",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [Self::Ownership, Self::FlagCaptured, Self::MinimumBalance]
            .into_iter()
            .find(|predicate| predicate.as_str() == raw)
    }
}

/// Predicates that do not hold for `user` against `snapshot`, in a fixed order.
pub fn unmet_predicates(snapshot: &TargetSnapshot, user: Address, minimum: U256) -> Vec<Predicate> {
    let mut unmet = Vec::new();
    if snapshot.owner_address != user {
        unmet.push(Predicate::Ownership);
    }
    if !snapshot.flag_captured {
        unmet.push(Predicate::FlagCaptured);
    }
    if snapshot.balance_wei <= minimum {
        unmet.push(Predicate::MinimumBalance);
    }
    unmet
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub user_address: Address,
    pub contract_address: Address,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum VerificationOutcome {
    Passed { secret: String },
    Failed { unmet: Vec<Predicate> },
}

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    success: bool,
    #[serde(default)]
    secret: Option<String>,
    #[serde(default)]
    unmet: Vec<String>,
}

#[async_trait]
pub trait VerificationClient: Send + Sync {
    async fn verify(&self, request: &VerificationRequest)
        -> Result<VerificationOutcome, VerifyError>;
}

/// Maps a verifier HTTP response onto an outcome. A body that names unmet predicates is a
/// verdict even on a non-2xx status; anything else off a failed status is a transport error.
fn classify_verification_response(
    status: reqwest::StatusCode,
    body: &str,
) -> Result<VerificationOutcome, VerifyError> {
    let parsed = match serde_json::from_str::<VerificationResponse>(body) {
        Ok(parsed) => parsed,
        Err(err) if status.is_success() => {
            return Err(VerifyError::MalformedResponse(format!(
                "{err}: {}",
                compact_error_message(body, 160)
            )));
        }
        Err(_) => {
            return Err(VerifyError::Transport(format!(
                "HTTP {status}: {}",
                compact_error_message(body, 160)
            )));
        }
    };

    if parsed.success {
        let secret = parsed.secret.ok_or_else(|| {
            VerifyError::MalformedResponse("success response without `secret`".to_string())
        })?;
        return Ok(VerificationOutcome::Passed { secret });
    }
    let mut unmet = Vec::with_capacity(parsed.unmet.len());
    for name in &parsed.unmet {
        match Predicate::parse(name) {
            Some(predicate) => unmet.push(predicate),
            None => tracing::warn!(predicate = %name, "verifier reported unknown predicate"),
        }
    }
    Ok(VerificationOutcome::Failed { unmet })
}

pub struct HttpVerificationClient {
    url: String,
    client: reqwest::Client,
}

impl HttpVerificationClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = match reqwest::Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(err) => {
                tracing::warn!(
                    error = %compact_error_message(&err.to_string(), 120),
                    "verifier client builder failed; using defaults"
                );
                reqwest::Client::new()
            }
        };
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl VerificationClient for HttpVerificationClient {
    async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationOutcome, VerifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|err| VerifyError::Transport(compact_error_message(&err.to_string(), 200)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| VerifyError::Transport(compact_error_message(&err.to_string(), 200)))?;
        let outcome = classify_verification_response(status, &body)?;
        tracing::info!(
            %status,
            user = %request.user_address,
            contract = %request.contract_address,
            passed = matches!(outcome, VerificationOutcome::Passed { .. }),
            "verifier responded"
        );
        Ok(outcome)
    }
}

/// Evaluates the predicates against ledger state. Used by simulated and dry runs.
pub struct LedgerVerifier {
    ledger: Arc<dyn Ledger>,
    minimum_balance: U256,
    secret: String,
}

impl LedgerVerifier {
    pub fn new(ledger: Arc<dyn Ledger>, minimum_balance: U256, secret: impl Into<String>) -> Self {
        Self {
            ledger,
            minimum_balance,
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl VerificationClient for LedgerVerifier {
    async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationOutcome, VerifyError> {
        let snapshot = TargetSnapshot::fetch(self.ledger.as_ref(), request.contract_address, None)
            .await
            .map_err(|err| VerifyError::Transport(err.to_string()))?;
        let unmet = unmet_predicates(&snapshot, request.user_address, self.minimum_balance);
        if unmet.is_empty() {
            Ok(VerificationOutcome::Passed {
                secret: self.secret.clone(),
            })
        } else {
            Ok(VerificationOutcome::Failed { unmet })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(owner: Address, flag: bool, balance: u64) -> TargetSnapshot {
        TargetSnapshot {
            owner_address: owner,
            flag_captured: flag,
            balance_wei: U256::from(balance),
            array_length: None,
        }
    }

    #[test]
    fn test_balance_must_be_strictly_greater() {
        let user = Address::repeat_byte(0xaa);
        assert_eq!(
            unmet_predicates(&snapshot(user, true, 100), user, U256::from(100u64)),
            vec![Predicate::MinimumBalance]
        );
        assert!(unmet_predicates(&snapshot(user, true, 101), user, U256::from(100u64)).is_empty());
    }

    #[test]
    fn test_all_predicates_reported_together() {
        let user = Address::repeat_byte(0xaa);
        assert_eq!(
            unmet_predicates(
                &snapshot(Address::repeat_byte(0xbb), false, 0),
                user,
                U256::ZERO
            ),
            vec![
                Predicate::Ownership,
                Predicate::FlagCaptured,
                Predicate::MinimumBalance
            ]
        );
    }

    #[test]
    fn test_request_uses_camel_case_fields() {
        let request = VerificationRequest {
            user_address: Address::repeat_byte(0x01),
            contract_address: Address::repeat_byte(0x02),
            user_id: "player-7".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["userId"], "player-7");
        assert!(value.get("userAddress").is_some());
        assert!(value.get("contractAddress").is_some());
    }

    #[test]
    fn test_classify_success_and_failure_bodies() {
        let passed = classify_verification_response(
            reqwest::StatusCode::OK,
            r#"{"success":true,"secret":"s3cr3t"}"#,
        )
        .unwrap();
        assert_eq!(
            passed,
            VerificationOutcome::Passed {
                secret: "s3cr3t".to_string()
            }
        );

        let failed = classify_verification_response(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"success":false,"unmet":["minimumBalance"]}"#,
        )
        .unwrap();
        assert_eq!(
            failed,
            VerificationOutcome::Failed {
                unmet: vec![Predicate::MinimumBalance]
            }
        );
    }

    #[test]
    fn test_unknown_predicate_keeps_verdict() {
        let failed = classify_verification_response(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"success":false,"unmet":["minimumBalance","kycPending"]}"#,
        )
        .unwrap();
        assert_eq!(
            failed,
            VerificationOutcome::Failed {
                unmet: vec![Predicate::MinimumBalance]
            }
        );
        assert_eq!(Predicate::parse("flagCaptured"), Some(Predicate::FlagCaptured));
        assert_eq!(Predicate::parse("kycPending"), None);
    }

    #[test]
    fn test_classify_rejects_garbage() {
        assert!(matches!(
            classify_verification_response(reqwest::StatusCode::OK, "not json"),
            Err(VerifyError::MalformedResponse(_))
        ));
        assert!(matches!(
            classify_verification_response(reqwest::StatusCode::BAD_GATEWAY, "<html>"),
            Err(VerifyError::Transport(_))
        ));
        assert!(matches!(
            classify_verification_response(reqwest::StatusCode::OK, r#"{"success":true}"#),
            Err(VerifyError::MalformedResponse(_))
        ));
    }
}
