//! Legacy ledger transactions: RLP encoding and EIP-155 signing hashes.
//!
//! The notary only ever sends one transaction shape — a zero-value transfer
//! to the burn address carrying a 32-byte fingerprint as calldata — so a
//! legacy (pre-typed) transaction with the small RLP subset it needs is all
//! the wire code this crate carries.

use crate::notary::keccak256;
use crate::notary::wallet::EcdsaSig;

/// A legacy (EIP-155) transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: [u8; 20],
    pub value: u128,
    pub data: Vec<u8>,
}

impl LegacyTransaction {
    /// The EIP-155 signing hash: keccak-256 of the RLP list
    /// `[nonce, gas_price, gas_limit, to, value, data, chain_id, 0, 0]`.
    pub fn signing_hash(&self, chain_id: u64) -> [u8; 32] {
        let encoded = rlp_list(&[
            rlp_uint(self.nonce.into()),
            rlp_uint(self.gas_price),
            rlp_uint(self.gas_limit.into()),
            rlp_bytes(&self.to),
            rlp_uint(self.value),
            rlp_bytes(&self.data),
            rlp_uint(chain_id.into()),
            rlp_uint(0),
            rlp_uint(0),
        ]);
        keccak256(&encoded)
    }

    /// The signed raw transaction ready for `eth_sendRawTransaction`.
    pub fn raw_signed(&self, sig: &EcdsaSig) -> Vec<u8> {
        rlp_list(&[
            rlp_uint(self.nonce.into()),
            rlp_uint(self.gas_price),
            rlp_uint(self.gas_limit.into()),
            rlp_bytes(&self.to),
            rlp_uint(self.value),
            rlp_bytes(&self.data),
            rlp_uint(sig.v.into()),
            rlp_bytes(trim_leading_zeros(&sig.r)),
            rlp_bytes(trim_leading_zeros(&sig.s)),
        ])
    }
}

// ── RLP primitives ─────────────────────────────────────────────────────────
//
// RLP has two cases: byte strings (0x80 offset) and lists (0xc0 offset),
// each with a short form (payload ≤ 55 bytes) and a long form.

fn rlp_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return vec![data[0]];
    }
    let mut out = Vec::with_capacity(data.len() + 4);
    push_length(&mut out, data.len(), 0x80);
    out.extend_from_slice(data);
    out
}

/// Integers are encoded as their big-endian bytes with leading zeros
/// stripped; zero is the empty string.
fn rlp_uint(value: u128) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    rlp_bytes(trim_leading_zeros(&bytes))
}

fn rlp_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = items.concat();
    let mut out = Vec::with_capacity(payload.len() + 4);
    push_length(&mut out, payload.len(), 0xc0);
    out.extend_from_slice(&payload);
    out
}

fn push_length(out: &mut Vec<u8>, len: usize, offset: u8) {
    if len <= 55 {
        out.push(offset + len as u8);
    } else {
        let len_bytes = (len as u64).to_be_bytes();
        let len_bytes = trim_leading_zeros(&len_bytes);
        out.push(offset + 55 + len_bytes.len() as u8);
        out.extend_from_slice(len_bytes);
    }
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}
