//! Blockchain notary: anchor a fingerprint of a finalized application to a
//! public ledger so anyone can later verify the application existed,
//! unmodified, at submission time.
//!
//! ```text
//! LedgerConfig (validated once at startup)
//!     → wallet  (signing key, address derivation)
//!     → tx      (legacy transaction, EIP-155 signing hash, raw encoding)
//!     → client  (minimal JSON-RPC: nonce, gas price, send, receipt)
//! ```
//!
//! ## The never-raise contract
//!
//! [`Notary::notarize`] can not fail. Every failure mode — no signing key
//! configured, RPC unreachable, transaction reverted, receipt never found —
//! is absorbed into [`NotaryOutcome::Skipped`] with a reason, so application
//! submission success is never coupled to ledger availability. One attempt
//! per call; no retries.
//!
//! The signing key is process-wide and read-only per call; it is only ever
//! taken from configuration, never logged.

pub mod client;
pub mod tx;
pub mod wallet;

use crate::config::{parse_address, LedgerConfig};
use crate::error::IntakeError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use client::{LedgerRpc, RpcClient};
use tx::LegacyTransaction;
use wallet::Wallet;

/// Keccak-256 digest, the ledger's native hash.
pub(crate) fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Why a notarization was skipped.
///
/// Distinguishable on purpose: "no key configured" is an expected deployment
/// mode, while "network failure" is an operational signal worth alerting on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// No signing key is configured; notarization is disabled by deployment.
    NoSigningKey,
    /// The RPC endpoint was unreachable or returned an error.
    Network(String),
    /// The transaction was mined but reverted.
    Reverted,
    /// No receipt appeared within the confirmation window.
    NoReceipt,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoSigningKey => write!(f, "no signing key configured"),
            SkipReason::Network(detail) => write!(f, "ledger network failure: {detail}"),
            SkipReason::Reverted => write!(f, "transaction reverted"),
            SkipReason::NoReceipt => write!(f, "no receipt within the confirmation window"),
        }
    }
}

/// The result of one notarization attempt. Never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotaryOutcome {
    /// Mined and confirmed; `tx_hash` is the 0x-prefixed 32-byte reference.
    Success { tx_hash: String },
    /// Nothing was anchored; submission proceeds regardless.
    Skipped { reason: SkipReason },
}

impl NotaryOutcome {
    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            NotaryOutcome::Success { tx_hash } => Some(tx_hash),
            NotaryOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NotaryOutcome::Success { .. })
    }
}

/// Records application fingerprints on a public ledger.
///
/// Built once from a validated [`LedgerConfig`] and injected where needed;
/// no component constructs providers from ambient environment per call.
pub struct Notary {
    client: Arc<dyn LedgerRpc>,
    wallet: Option<Wallet>,
    burn_address: [u8; 20],
    chain_id: u64,
    gas_limit: u64,
    poll_interval: Duration,
    confirm_timeout: Duration,
}

impl Notary {
    /// Validate the configuration once and build the notary over the
    /// production JSON-RPC transport.
    ///
    /// An absent signing key is accepted (notarization degrades to
    /// always-skipped); a malformed one is a startup error.
    pub fn new(config: &LedgerConfig) -> Result<Self, IntakeError> {
        let client = RpcClient::new(&config.rpc_url)?;
        Self::with_rpc(Arc::new(client), config)
    }

    /// Build the notary over an injected RPC transport.
    pub fn with_rpc(
        client: Arc<dyn LedgerRpc>,
        config: &LedgerConfig,
    ) -> Result<Self, IntakeError> {
        config.validate()?;
        let wallet = config
            .private_key
            .as_deref()
            .map(Wallet::from_hex)
            .transpose()?;
        Ok(Self {
            client,
            wallet,
            burn_address: parse_address(&config.burn_address)?,
            chain_id: config.chain_id,
            gas_limit: config.gas_limit,
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            confirm_timeout: Duration::from_secs(config.confirm_timeout_secs),
        })
    }

    /// The tamper-evident fingerprint for an application.
    ///
    /// Keccak-256 over the UTF-8 string `"{application_id}-{user_id}-{ts}"`,
    /// where `ts` is the finalized application's submission timestamp in
    /// ISO 8601. The timestamp comes from the caller, never from the clock,
    /// so a verifier holding the stored record can recompute the fingerprint
    /// bit-for-bit.
    pub fn fingerprint(
        application_id: &str,
        user_id: &str,
        timestamp: DateTime<Utc>,
    ) -> [u8; 32] {
        let payload = format!(
            "{application_id}-{user_id}-{}",
            timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        keccak256(payload.as_bytes())
    }

    /// Hex form of [`Self::fingerprint`], 0x-prefixed.
    pub fn fingerprint_hex(
        application_id: &str,
        user_id: &str,
        timestamp: DateTime<Utc>,
    ) -> String {
        format!(
            "0x{}",
            hex::encode(Self::fingerprint(application_id, user_id, timestamp))
        )
    }

    /// Anchor one application fingerprint to the ledger.
    ///
    /// Sends a minimal-payload transaction to the fixed burn address with
    /// the 32-byte fingerprint as calldata, then waits for one confirmation
    /// (bounded by the configured window). Single attempt; never raises.
    pub async fn notarize(
        &self,
        application_id: &str,
        user_id: &str,
        timestamp: DateTime<Utc>,
    ) -> NotaryOutcome {
        let wallet = match &self.wallet {
            Some(w) => w,
            None => {
                info!(application_id, "notarization skipped: no signing key");
                return NotaryOutcome::Skipped {
                    reason: SkipReason::NoSigningKey,
                };
            }
        };

        let fingerprint = Self::fingerprint(application_id, user_id, timestamp);
        debug!(
            application_id,
            fingerprint = %hex::encode(fingerprint),
            "anchoring fingerprint"
        );

        match self.send_and_confirm(wallet, fingerprint).await {
            Ok(outcome) => outcome,
            Err(detail) => {
                warn!(application_id, detail, "notarization skipped");
                NotaryOutcome::Skipped {
                    reason: SkipReason::Network(detail),
                }
            }
        }
    }

    /// Public-surface convenience: tx hash on success, `None` otherwise.
    pub async fn log_application_to_blockchain(
        &self,
        application_id: &str,
        user_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Option<String> {
        match self.notarize(application_id, user_id, timestamp).await {
            NotaryOutcome::Success { tx_hash } => Some(tx_hash),
            NotaryOutcome::Skipped { .. } => None,
        }
    }

    /// Check that a transaction reference points at a mined, successful
    /// transaction. Any failure — malformed hash, network error, not found —
    /// reports `false`, never raises.
    pub async fn verify_transaction(&self, tx_hash: &str) -> bool {
        if !is_well_formed_tx_hash(tx_hash) {
            debug!(tx_hash, "verify: malformed transaction hash");
            return false;
        }
        match self.client.transaction_receipt(tx_hash).await {
            Ok(Some(receipt)) => receipt.is_success(),
            Ok(None) => false,
            Err(e) => {
                debug!(tx_hash, error = %e, "verify: receipt lookup failed");
                false
            }
        }
    }

    async fn send_and_confirm(
        &self,
        wallet: &Wallet,
        fingerprint: [u8; 32],
    ) -> Result<NotaryOutcome, String> {
        let nonce = self
            .client
            .transaction_count(&wallet.address_hex())
            .await
            .map_err(|e| format!("nonce lookup: {e}"))?;
        let gas_price = self
            .client
            .gas_price()
            .await
            .map_err(|e| format!("gas price: {e}"))?;

        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit: self.gas_limit,
            to: self.burn_address,
            value: 0,
            data: fingerprint.to_vec(),
        };

        let signature = wallet
            .sign_hash(&tx.signing_hash(self.chain_id), self.chain_id)
            .map_err(|e| format!("signing: {e}"))?;
        let raw = format!("0x{}", hex::encode(tx.raw_signed(&signature)));

        let tx_hash = self
            .client
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| format!("broadcast: {e}"))?;
        info!(%tx_hash, "fingerprint transaction broadcast");

        self.wait_for_confirmation(tx_hash).await
    }

    /// Poll for the receipt until the confirmation window closes.
    async fn wait_for_confirmation(&self, tx_hash: String) -> Result<NotaryOutcome, String> {
        let deadline = tokio::time::Instant::now() + self.confirm_timeout;

        loop {
            match self.client.transaction_receipt(&tx_hash).await {
                Ok(Some(receipt)) => {
                    return if receipt.is_success() {
                        info!(%tx_hash, "fingerprint transaction confirmed");
                        Ok(NotaryOutcome::Success { tx_hash })
                    } else {
                        warn!(%tx_hash, "fingerprint transaction reverted");
                        Ok(NotaryOutcome::Skipped {
                            reason: SkipReason::Reverted,
                        })
                    };
                }
                Ok(None) => {}
                // Transient lookup failures inside the window are tolerated;
                // the deadline is the only abort condition.
                Err(e) => debug!(%tx_hash, error = %e, "receipt poll failed"),
            }

            if tokio::time::Instant::now() + self.poll_interval > deadline {
                warn!(%tx_hash, "confirmation window closed without a receipt");
                return Ok(NotaryOutcome::Skipped {
                    reason: SkipReason::NoReceipt,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// A 0x-prefixed 32-byte hex string.
fn is_well_formed_tx_hash(s: &str) -> bool {
    s.len() == 66
        && s.starts_with("0x")
        && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}
