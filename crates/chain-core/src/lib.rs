use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod constants;
pub mod crypto;
mod error;
mod ledger;
mod mine;

pub use constants::*;
pub use crypto::{verify_signature, Address, KeyPair};
pub use error::ChainError;
pub use ledger::{Ledger, SpendPolicy};
pub use mine::mine_template_parallel;

pub type Hash = [u8; 32];

pub(crate) fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs()
}

/// Originator of a transaction: a real wallet, or the ledger itself when it
/// credits a mining reward.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    /// Reward sentinel. System-issued transactions carry no signature and
    /// are always considered valid.
    System,
    Wallet(Address),
}

impl Sender {
    pub fn as_wallet(&self) -> Option<&str> {
        match self {
            Sender::System => None,
            Sender::Wallet(address) => Some(address),
        }
    }
}

/// A value transfer. Fields are set at construction; the signature is
/// attached once by [`Transaction::sign`]. Any later change to a covered
/// field makes re-verification fail, since the digest is recomputed from
/// current field values on every check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Sender,
    pub recipient: Address,
    pub amount: u64,
    pub timestamp: u64,
    pub signature: Option<String>,
}

impl Transaction {
    pub fn new(sender: Sender, recipient: Address, amount: u64) -> Self {
        Transaction {
            sender,
            recipient,
            amount,
            timestamp: unix_timestamp(),
            signature: None,
        }
    }

    pub(crate) fn reward(recipient: Address, amount: u64) -> Self {
        Self::new(Sender::System, recipient, amount)
    }

    /// Digest over the signable fields: sender, recipient, amount,
    /// timestamp. The signature itself is never part of its own message.
    pub fn digest(&self) -> Hash {
        let mut hasher = Sha256::new();
        match &self.sender {
            Sender::System => hasher.update(b"system"),
            Sender::Wallet(address) => hasher.update(address.as_bytes()),
        }
        hasher.update(self.recipient.as_bytes());
        hasher.update(self.amount.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hasher.finalize().into()
    }

    /// Signs the transaction digest with `keypair` and attaches the
    /// signature. The keypair must belong to the sender address.
    pub fn sign(&mut self, keypair: &KeyPair) -> Result<(), ChainError> {
        match &self.sender {
            Sender::Wallet(address) if *address == keypair.address() => {}
            _ => return Err(ChainError::UnauthorizedSigner),
        }
        let signature = keypair.sign_digest(&self.digest())?;
        self.signature = Some(hex::encode(signature));
        Ok(())
    }

    /// Full validity check. System-issued transactions are always valid;
    /// anything else must carry a signature matching the recomputed digest.
    pub fn verify(&self) -> Result<bool, ChainError> {
        let address = match &self.sender {
            Sender::System => return Ok(true),
            Sender::Wallet(address) => address,
        };
        let signature = self
            .signature
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ChainError::MissingSignature)?;
        Ok(crypto::verify_signature(address, &self.digest(), signature))
    }

    /// Never-raising form used during block and chain validation.
    pub fn is_valid(&self) -> bool {
        matches!(self.verify(), Ok(true))
    }
}

/// Block hash input: previous hash, timestamp, canonical JSON of the
/// transaction sequence, nonce. JSON keeps the transaction encoding
/// order-preserving and field-complete, so any change to content, order or
/// count moves the digest.
pub(crate) fn block_hash_parts(
    previous_hash: &Hash,
    timestamp: u64,
    tx_bytes: &[u8],
    nonce: u64,
) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(previous_hash);
    hasher.update(timestamp.to_le_bytes());
    hasher.update(tx_bytes);
    hasher.update(nonce.to_le_bytes());
    hasher.finalize().into()
}

pub(crate) fn serialize_transactions(txs: &[Transaction]) -> Vec<u8> {
    serde_json::to_vec(txs).expect("transactions serialize")
}

fn block_hash(previous_hash: &Hash, timestamp: u64, txs: &[Transaction], nonce: u64) -> Hash {
    block_hash_parts(previous_hash, timestamp, &serialize_transactions(txs), nonce)
}

/// A sealed, proof-of-work-stamped batch of transactions. Produced only by
/// mining a [`BlockTemplate`] (or by deserializing a chain dump for
/// re-validation); there is no public mutation path after sealing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub(crate) timestamp: u64,
    pub(crate) transactions: Vec<Transaction>,
    pub(crate) previous_hash: Hash,
    pub(crate) nonce: u64,
    pub(crate) hash: Hash,
}

impl Block {
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn previous_hash(&self) -> Hash {
        self.previous_hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// Recomputes the digest from current field values. Diverges from
    /// [`Block::hash`] whenever a covered field was altered after sealing.
    pub fn calculate_hash(&self) -> Hash {
        block_hash(
            &self.previous_hash,
            self.timestamp,
            &self.transactions,
            self.nonce,
        )
    }

    pub fn has_valid_transactions(&self) -> bool {
        self.transactions.iter().all(Transaction::is_valid)
    }
}

/// Pre-seal block: the nonce is still being searched and the hash generally
/// fails the difficulty predicate. Mining consumes the template and yields a
/// sealed [`Block`].
#[derive(Clone, Debug)]
pub struct BlockTemplate {
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub previous_hash: Hash,
    pub nonce: u64,
    pub hash: Hash,
}

impl BlockTemplate {
    /// The hash is computed immediately; until mined it will usually fail
    /// the difficulty predicate.
    pub fn new(timestamp: u64, transactions: Vec<Transaction>, previous_hash: Hash) -> Self {
        let hash = block_hash(&previous_hash, timestamp, &transactions, 0);
        BlockTemplate {
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            hash,
        }
    }

    pub fn calculate_hash(&self) -> Hash {
        block_hash(
            &self.previous_hash,
            self.timestamp,
            &self.transactions,
            self.nonce,
        )
    }

    /// Sequential proof-of-work search: increment the nonce and recompute
    /// until the hash starts with `difficulty` zero hex characters.
    /// Unbounded; expected cost grows as 16^difficulty.
    pub fn mine(mut self, difficulty: u32) -> Block {
        while !pow::meets_difficulty(&self.hash, difficulty) {
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = self.calculate_hash();
        }
        self.seal()
    }

    pub(crate) fn seal(self) -> Block {
        Block {
            timestamp: self.timestamp,
            transactions: self.transactions,
            previous_hash: self.previous_hash,
            nonce: self.nonce,
            hash: self.hash,
        }
    }
}

pub mod pow {
    use super::Hash;

    /// Counts leading zero hex characters of a hash.
    pub fn count_leading_zero_nibbles(hash: &Hash) -> u32 {
        let mut total = 0u32;
        for b in hash {
            if *b == 0 {
                total += 2;
            } else if *b >> 4 == 0 {
                total += 1;
                break;
            } else {
                break;
            }
        }
        total
    }

    /// The difficulty predicate: the first `difficulty` hex characters of
    /// the hash must all be zero.
    pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
        count_leading_zero_nibbles(hash) >= difficulty
    }
}
