//! Configuration for the intake pipeline.
//!
//! Everything tunable lives in [`IntakeConfig`], built via its builder so
//! callers set only what they care about and rely on documented defaults for
//! the rest. Configuration is validated once, when a component is
//! constructed from it — never lazily per call — so a malformed signing key
//! or burn address surfaces at startup instead of at the first submission.

use crate::error::IntakeError;
use serde::{Deserialize, Serialize};

/// Default public testnet RPC endpoint used when none is configured.
pub const DEFAULT_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";

/// Sepolia testnet chain id.
pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;

/// Well-known non-spendable address used purely as a data-carrying
/// destination, never for value transfer.
pub const DEFAULT_BURN_ADDRESS: &str = "0x000000000000000000000000000000000000dEaD";

/// Gas budget for a minimal transaction carrying a 32-byte fingerprint:
/// 21 000 base + 32 non-zero calldata bytes, with margin for client-side
/// estimation drift.
pub const DEFAULT_GAS_LIMIT: u64 = 40_000;

/// Configuration for a full intake pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    pub ocr: OcrConfig,
    pub ledger: LedgerConfig,

    /// Scale factor over PDF document points when rasterising pages.
    /// Default: 2.0.
    ///
    /// 2× is the balance point between OCR accuracy and render cost: at 1×
    /// small print on scanned report cards drops below recognisability,
    /// while 3× doubles peak memory for no measurable accuracy gain.
    pub render_scale: f32,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            ledger: LedgerConfig::default(),
            render_scale: 2.0,
        }
    }
}

impl IntakeConfig {
    pub fn builder() -> IntakeConfigBuilder {
        IntakeConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`IntakeConfig`].
#[derive(Debug)]
pub struct IntakeConfigBuilder {
    config: IntakeConfig,
}

impl IntakeConfigBuilder {
    pub fn ocr_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.ocr.endpoint = url.into();
        self
    }

    pub fn ocr_model(mut self, model: impl Into<String>) -> Self {
        self.config.ocr.model = model.into();
        self
    }

    pub fn ocr_language(mut self, language: impl Into<String>) -> Self {
        self.config.ocr.language = language.into();
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr.request_timeout_secs = secs.max(1);
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(0.5, 4.0);
        self
    }

    pub fn ledger(mut self, ledger: LedgerConfig) -> Self {
        self.config.ledger = ledger;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IntakeConfig, IntakeError> {
        let c = &self.config;
        if c.ocr.endpoint.is_empty() {
            return Err(IntakeError::InvalidConfig("OCR endpoint must be set".into()));
        }
        if !(0.5..=4.0).contains(&c.render_scale) {
            return Err(IntakeError::InvalidConfig(format!(
                "render scale must be 0.5–4.0, got {}",
                c.render_scale
            )));
        }
        self.config.ledger.validate()?;
        Ok(self.config)
    }
}

/// OCR engine endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Vision-OCR HTTP endpoint (Ollama-style generate API).
    pub endpoint: String,
    /// Vision model name.
    pub model: String,
    /// Fixed recognition language passed to the engine.
    pub language: String,
    /// Per-request timeout in seconds. Default: 120.
    pub request_timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: "llava".to_string(),
            language: "eng".to_string(),
            request_timeout_secs: 120,
        }
    }
}

/// Ledger (notary) settings.
///
/// The signing key is optional by design: without one, notarization degrades
/// to an always-skipped outcome rather than a startup failure, because
/// application submission must never depend on ledger availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
    /// Hex-encoded secp256k1 signing key, with or without a 0x prefix.
    #[serde(skip_serializing)]
    pub private_key: Option<String>,
    /// Fixed non-spendable recipient for fingerprint transactions.
    pub burn_address: String,
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Fixed gas budget per fingerprint transaction.
    pub gas_limit: u64,
    /// Seconds between receipt polls while waiting for one confirmation.
    pub poll_interval_secs: u64,
    /// Upper bound on the confirmation wait. A hung RPC node forfeits the
    /// notarization (skipped outcome) instead of hanging the submission.
    pub confirm_timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            private_key: None,
            burn_address: DEFAULT_BURN_ADDRESS.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            gas_limit: DEFAULT_GAS_LIMIT,
            poll_interval_secs: 3,
            confirm_timeout_secs: 180,
        }
    }
}

impl LedgerConfig {
    /// Read the ledger configuration from the process environment.
    ///
    /// | Variable | Meaning | Default |
    /// |----------|---------|---------|
    /// | `INTAKE_RPC_URL` | JSON-RPC endpoint | public Sepolia endpoint |
    /// | `INTAKE_PRIVATE_KEY` | signing key (hex) | unset → notarization skipped |
    /// | `INTAKE_BURN_ADDRESS` | recipient address | `0x…dEaD` |
    /// | `INTAKE_CHAIN_ID` | chain id | Sepolia (11155111) |
    pub fn from_env() -> Result<Self, IntakeError> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("INTAKE_RPC_URL") {
            if !url.is_empty() {
                config.rpc_url = url;
            }
        }
        if let Ok(key) = std::env::var("INTAKE_PRIVATE_KEY") {
            if !key.is_empty() {
                config.private_key = Some(key);
            }
        }
        if let Ok(addr) = std::env::var("INTAKE_BURN_ADDRESS") {
            if !addr.is_empty() {
                config.burn_address = addr;
            }
        }
        if let Ok(id) = std::env::var("INTAKE_CHAIN_ID") {
            if !id.is_empty() {
                config.chain_id = id.parse().map_err(|_| {
                    IntakeError::InvalidConfig(format!("INTAKE_CHAIN_ID is not a number: '{id}'"))
                })?;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate field shapes once, at startup.
    ///
    /// An *absent* key is fine (degraded notarization); a *malformed* key is
    /// a configuration error and must fail loudly here, not at the first
    /// submission.
    pub fn validate(&self) -> Result<(), IntakeError> {
        if !self.rpc_url.starts_with("http://") && !self.rpc_url.starts_with("https://") {
            return Err(IntakeError::InvalidConfig(format!(
                "ledger RPC URL must be http(s), got '{}'",
                self.rpc_url
            )));
        }
        parse_address(&self.burn_address)?;
        if let Some(key) = &self.private_key {
            let stripped = key.strip_prefix("0x").unwrap_or(key);
            if stripped.len() != 64 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(IntakeError::InvalidConfig(
                    "signing key must be 32 bytes of hex".into(),
                ));
            }
        }
        if self.gas_limit < 21_000 {
            return Err(IntakeError::InvalidConfig(format!(
                "gas limit {} is below the 21000 transaction floor",
                self.gas_limit
            )));
        }
        Ok(())
    }
}

/// Parse a 20-byte hex address (with or without 0x prefix).
pub fn parse_address(s: &str) -> Result<[u8; 20], IntakeError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(stripped)
        .map_err(|_| IntakeError::InvalidConfig(format!("address is not hex: '{s}'")))?;
    bytes
        .try_into()
        .map_err(|_| IntakeError::InvalidConfig(format!("address must be 20 bytes: '{s}'")))
}
