//! Signing key handling and address derivation.
//!
//! Keys are loaded once, at notary construction, from configuration — never
//! per call and never from ambient globals. The key material itself is never
//! logged; only the derived address appears in traces.

use crate::error::IntakeError;
use crate::notary::keccak256;
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

/// A recoverable ECDSA signature in ledger wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcdsaSig {
    /// EIP-155 recovery value: `recovery_id + chain_id * 2 + 35`.
    pub v: u64,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

/// A loaded signing key and its derived ledger address.
pub struct Wallet {
    key: SigningKey,
    address: [u8; 20],
}

impl Wallet {
    /// Load from a 32-byte hex key (0x prefix optional).
    pub fn from_hex(key_hex: &str) -> Result<Self, IntakeError> {
        let stripped = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        let bytes = hex::decode(stripped)
            .map_err(|_| IntakeError::InvalidConfig("signing key is not hex".into()))?;
        let key = SigningKey::from_slice(&bytes)
            .map_err(|_| IntakeError::InvalidConfig("signing key is not a valid scalar".into()))?;
        let address = derive_address(key.verifying_key());
        Ok(Self { key, address })
    }

    pub fn address(&self) -> [u8; 20] {
        self.address
    }

    /// 0x-prefixed lowercase hex address.
    pub fn address_hex(&self) -> String {
        format!("0x{}", hex::encode(self.address))
    }

    /// Sign a 32-byte transaction hash, producing the EIP-155 `v`.
    pub fn sign_hash(&self, hash: &[u8; 32], chain_id: u64) -> Result<EcdsaSig, IntakeError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(hash)
            .map_err(|e| IntakeError::Internal(format!("signing failed: {e}")))?;

        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        Ok(EcdsaSig {
            v: u64::from(recovery_id.to_byte()) + chain_id * 2 + 35,
            r,
            s,
        })
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material must never leak through Debug output.
        f.debug_struct("Wallet")
            .field("address", &self.address_hex())
            .finish_non_exhaustive()
    }
}

/// Ledger address: last 20 bytes of keccak-256 over the uncompressed public
/// key (without the 0x04 tag byte).
fn derive_address(verifying_key: &VerifyingKey) -> [u8; 20] {
    let point = verifying_key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[12..]);
    address
}

#[cfg(test)]
mod tests {
    use super::*;

    // The EIP-155 example key.
    const TEST_KEY: &str = "0x4646464646464646464646464646464646464646464646464646464646464646";

    #[test]
    fn derives_the_known_address() {
        let wallet = Wallet::from_hex(TEST_KEY).unwrap();
        assert_eq!(
            wallet.address_hex(),
            "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f"
        );
    }

    #[test]
    fn prefix_is_optional() {
        let with = Wallet::from_hex(TEST_KEY).unwrap();
        let without = Wallet::from_hex(&TEST_KEY[2..]).unwrap();
        assert_eq!(with.address(), without.address());
    }

    #[test]
    fn garbage_keys_are_rejected() {
        assert!(Wallet::from_hex("0xzz").is_err());
        assert!(Wallet::from_hex("0x00").is_err());
        // The zero scalar is not a valid key.
        assert!(Wallet::from_hex(&"00".repeat(32)).is_err());
    }

    #[test]
    fn debug_output_hides_key_material() {
        let wallet = Wallet::from_hex(TEST_KEY).unwrap();
        let debug = format!("{wallet:?}");
        assert!(debug.contains("0x9d8a62f6"));
        assert!(!debug.contains("4646464646"));
    }
}
