pub mod chain;
pub mod constants;
pub mod error;

pub use chain::{validate_chain, Ledger, MiningTemplate};
pub use error::{ChainError, PowError};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

/// Hex-encoded SHA-256 digest.
pub type HexDigest = String;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: i64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: i64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Seconds since the UNIX epoch. Informational only.
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: HexDigest,
}

/// Fixed-order view of a block used as the hash preimage. Field order here
/// is the canonical order and must never follow `Block`'s layout.
#[derive(Serialize)]
struct CanonicalBlock<'a> {
    index: u64,
    previous_hash: &'a str,
    proof: u64,
    timestamp: f64,
    transactions: Vec<CanonicalTransaction<'a>>,
}

#[derive(Serialize)]
struct CanonicalTransaction<'a> {
    amount: i64,
    recipient: &'a str,
    sender: &'a str,
}

impl<'a> From<&'a Block> for CanonicalBlock<'a> {
    fn from(block: &'a Block) -> Self {
        Self {
            index: block.index,
            previous_hash: &block.previous_hash,
            proof: block.proof,
            timestamp: block.timestamp,
            transactions: block
                .transactions
                .iter()
                .map(|tx| CanonicalTransaction {
                    amount: tx.amount,
                    recipient: &tx.recipient,
                    sender: &tx.sender,
                })
                .collect(),
        }
    }
}

/// JSON with `", "` between items and `": "` after keys, otherwise compact.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

impl Block {
    /// JSON of the block in canonical field order with spaced separators.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
        // Plain structs of strings and numbers written to a Vec cannot fail.
        CanonicalBlock::from(self)
            .serialize(&mut ser)
            .expect("canonical block view is always serializable");
        out
    }

    pub fn hash(&self) -> HexDigest {
        canonical_hash(self)
    }
}

/// Deterministic digest of a block: SHA-256 over its canonical serialization.
pub fn canonical_hash(block: &Block) -> HexDigest {
    sha256_hex(block.canonical_bytes())
}

pub fn sha256_hex(data: impl AsRef<[u8]>) -> HexDigest {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hex::encode(hasher.finalize())
}

pub(crate) fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

pub mod pow {
    use super::sha256_hex;
    use crate::constants::{BASE_DIFFICULTY, ZERO_CHAR};
    use crate::error::PowError;
    use tracing::debug;

    /// Number of leading zero hex characters a proof digest must carry,
    /// together with the matching prefix.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Difficulty {
        pub leading_zeros: usize,
        pub prefix: String,
    }

    impl Difficulty {
        pub fn new(leading_zeros: usize) -> Self {
            Self {
                leading_zeros,
                prefix: ZERO_CHAR.to_string().repeat(leading_zeros),
            }
        }

        pub fn is_met_by(&self, digest: &str) -> bool {
            digest.starts_with(&self.prefix)
        }
    }

    /// `floor(len^(1/4)) + BASE_DIFFICULTY`.
    pub fn difficulty_for_length(chain_len: usize) -> Difficulty {
        Difficulty::new(fourth_root(chain_len as u64) as usize + BASE_DIFFICULTY)
    }

    /// Largest `r` with `r^4 <= n`.
    pub fn fourth_root(n: u64) -> u64 {
        let mut r = (n as f64).powf(0.25) as u64;
        while r > 0 && r.checked_pow(4).is_none_or(|p| p > n) {
            r -= 1;
        }
        while (r + 1).checked_pow(4).is_some_and(|p| p <= n) {
            r += 1;
        }
        r
    }

    /// Digest of the textual pairing of the previous proof and a candidate.
    pub fn proof_digest(last_proof: u64, proof: u64) -> String {
        sha256_hex(format!("({last_proof}, {proof})"))
    }

    pub fn valid_proof(last_proof: u64, proof: u64, difficulty: &Difficulty) -> bool {
        difficulty.is_met_by(&proof_digest(last_proof, proof))
    }

    /// Exhaustive search from 0 upwards for the first proof meeting `difficulty`.
    /// Never returns for a difficulty no digest can meet.
    pub fn find_proof(last_proof: u64, difficulty: &Difficulty) -> u64 {
        let mut proof = 0u64;
        while !valid_proof(last_proof, proof, difficulty) {
            proof += 1;
        }
        debug!(
            last_proof,
            proof,
            zeros = difficulty.leading_zeros,
            "proof found"
        );
        proof
    }

    /// Same search as [`find_proof`] but gives up after `max_attempts` candidates.
    pub fn find_proof_bounded(
        last_proof: u64,
        difficulty: &Difficulty,
        max_attempts: u64,
    ) -> Result<u64, PowError> {
        match (0..max_attempts).find(|&proof| valid_proof(last_proof, proof, difficulty)) {
            Some(proof) => {
                debug!(last_proof, proof, "proof found within bound");
                Ok(proof)
            }
            None => Err(PowError::Exhausted {
                attempts: max_attempts,
            }),
        }
    }
}
