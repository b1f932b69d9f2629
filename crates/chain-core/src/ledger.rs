use crate::constants::{DEFAULT_DIFFICULTY, GENESIS_TIMESTAMP, MINING_REWARD};
use crate::error::ChainError;
use crate::mine::mine_template_parallel;
#[cfg(test)]
use crate::Sender;
use crate::{unix_timestamp, Block, BlockTemplate, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Admission policy for the pending pool. Correctness never depends on it:
/// the default admits any validly signed transaction regardless of balance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpendPolicy {
    #[default]
    AllowOverdraft,
    /// Reject transactions spending more than the sender's confirmed
    /// balance minus what the pool already has in flight from them.
    RejectOverdraft,
}

/// An append-only chain of sealed blocks plus the pool of pending
/// transactions awaiting the next seal. An owned value: independent ledgers
/// share nothing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ledger {
    chain: Vec<Block>,
    difficulty: u32,
    pending: Vec<Transaction>,
    mining_reward: u64,
    #[serde(default)]
    spend_policy: SpendPolicy,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_difficulty(DEFAULT_DIFFICULTY)
    }

    pub fn with_difficulty(difficulty: u32) -> Self {
        Ledger {
            chain: vec![Self::genesis_block()],
            difficulty,
            pending: Vec::new(),
            mining_reward: MINING_REWARD,
            spend_policy: SpendPolicy::default(),
        }
    }

    pub fn with_reward(mut self, reward: u64) -> Self {
        self.mining_reward = reward;
        self
    }

    pub fn set_spend_policy(&mut self, policy: SpendPolicy) {
        self.spend_policy = policy;
    }

    /// The fixed genesis block: empty transactions, zeroed previous-hash
    /// sentinel, nonce 0. Deterministic, so validation can pin it.
    fn genesis_block() -> Block {
        BlockTemplate::new(GENESIS_TIMESTAMP, Vec::new(), [0u8; 32]).seal()
    }

    pub fn latest_block(&self) -> &Block {
        self.chain.last().expect("chain always holds the genesis block")
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn mining_reward(&self) -> u64 {
        self.mining_reward
    }

    /// Admits a transaction to the pending pool, or admits nothing.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<(), ChainError> {
        let sender = match tx.sender.as_wallet() {
            Some(address) if !address.is_empty() => address.to_string(),
            _ => return Err(ChainError::IncompleteTransaction),
        };
        if tx.recipient.is_empty() {
            return Err(ChainError::IncompleteTransaction);
        }
        if !tx.is_valid() {
            return Err(ChainError::InvalidTransaction);
        }
        if tx.amount == 0 {
            return Err(ChainError::NonPositiveAmount);
        }
        if self.spend_policy == SpendPolicy::RejectOverdraft {
            let available = self.get_balance_of_address(&sender) - self.pending_outgoing(&sender);
            if tx.amount as i64 > available {
                return Err(ChainError::InsufficientBalance {
                    available,
                    required: tx.amount,
                });
            }
        }
        debug!(sender = %sender, recipient = %tx.recipient, amount = tx.amount, "transaction admitted to pool");
        self.pending.push(tx);
        Ok(())
    }

    fn pending_outgoing(&self, address: &str) -> i64 {
        self.pending
            .iter()
            .filter(|tx| tx.sender.as_wallet() == Some(address))
            .map(|tx| tx.amount as i64)
            .sum()
    }

    /// Seals the pending pool into a block on top of the current tip, then
    /// resets the pool to a single system reward for `reward_address`. The
    /// only mutation path that grows the chain.
    pub fn mine_pending_transactions(&mut self, reward_address: &str) -> &Block {
        let block = self.next_template().mine(self.difficulty);
        self.append_sealed(block, reward_address)
    }

    /// Same contract as [`Ledger::mine_pending_transactions`], searching
    /// nonces across threads; the first satisfying nonce wins.
    pub fn mine_pending_transactions_parallel(&mut self, reward_address: &str) -> &Block {
        let template = self.next_template();
        let block = mine_template_parallel(template, self.difficulty);
        self.append_sealed(block, reward_address)
    }

    fn next_template(&mut self) -> BlockTemplate {
        let previous_hash = self.latest_block().hash();
        let transactions = std::mem::take(&mut self.pending);
        BlockTemplate::new(unix_timestamp(), transactions, previous_hash)
    }

    fn append_sealed(&mut self, block: Block, reward_address: &str) -> &Block {
        info!(
            height = self.chain.len(),
            hash = %hex::encode(block.hash()),
            "block sealed"
        );
        self.chain.push(block);
        self.pending = vec![Transaction::reward(
            reward_address.to_string(),
            self.mining_reward,
        )];
        self.latest_block()
    }

    /// Net balance of an address across all sealed blocks. Pending
    /// transactions do not count until mined.
    pub fn get_balance_of_address(&self, address: &str) -> i64 {
        let mut balance = 0i64;
        for block in &self.chain {
            for tx in &block.transactions {
                if tx.sender.as_wallet() == Some(address) {
                    balance -= tx.amount as i64;
                }
                if tx.recipient == address {
                    balance += tx.amount as i64;
                }
            }
        }
        balance
    }

    /// Whole-chain integrity check. For every non-genesis block: transaction
    /// validity, hash recomputation, and linkage to the predecessor; the
    /// genesis block must match the fixed genesis definition. Every check
    /// runs for every index; any single failure invalidates the chain.
    /// Reports, never raises.
    pub fn is_chain_valid(&self) -> bool {
        let pinned = Self::genesis_block().hash();
        match self.chain.first() {
            Some(genesis)
                if genesis.hash() == pinned && genesis.calculate_hash() == pinned => {}
            _ => return false,
        }

        let mut valid = true;
        for i in 1..self.chain.len() {
            let current = &self.chain[i];
            let previous = &self.chain[i - 1];
            if !current.has_valid_transactions() {
                valid = false;
            }
            if current.hash != current.calculate_hash() {
                valid = false;
            }
            if current.previous_hash != previous.hash {
                valid = false;
            }
        }
        valid
    }
}
