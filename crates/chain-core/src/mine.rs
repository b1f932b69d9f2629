use crate::pow::meets_difficulty;
use crate::{block_hash_parts, serialize_transactions, Block, BlockTemplate};
use rayon::prelude::*;
use tracing::info;

/// Mines a template by searching nonces in parallel until its hash carries
/// at least `difficulty` leading zero hex characters. Rayon splits the nonce
/// range across threads; the first satisfying nonce wins and the remaining
/// workers stop. Same result contract as [`BlockTemplate::mine`].
pub fn mine_template_parallel(template: BlockTemplate, difficulty: u32) -> Block {
    // Serialize the transaction batch once; only the nonce varies per attempt.
    let tx_bytes = serialize_transactions(&template.transactions);
    let previous_hash = template.previous_hash;
    let timestamp = template.timestamp;

    let found = (0u64..u64::MAX)
        .into_par_iter()
        .find_any(|nonce| {
            let hash = block_hash_parts(&previous_hash, timestamp, &tx_bytes, *nonce);
            meets_difficulty(&hash, difficulty)
        })
        .expect("nonce space exhausted (practically impossible)");

    let mut mined = template;
    mined.nonce = found;
    mined.hash = mined.calculate_hash();

    info!(
        nonce = found,
        hash = %hex::encode(mined.hash),
        "mined block"
    );

    mined.seal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pow, KeyPair, Sender, Transaction};

    #[test]
    fn parallel_mining_meets_the_difficulty_predicate() {
        let keypair = KeyPair::generate();
        let mut tx = Transaction::new(Sender::Wallet(keypair.address()), "recipient".into(), 5);
        tx.sign(&keypair).unwrap();

        let template = BlockTemplate::new(1_600_000_000, vec![tx], [0u8; 32]);
        let block = mine_template_parallel(template, 2);

        assert!(pow::meets_difficulty(&block.hash(), 2));
        assert_eq!(block.hash(), block.calculate_hash());
        assert!(block.has_valid_transactions());
    }

    #[test]
    fn parallel_and_sequential_agree_on_the_predicate() {
        let template = BlockTemplate::new(1_600_000_000, vec![], [7u8; 32]);
        let sequential = template.clone().mine(1);
        let parallel = mine_template_parallel(template, 1);
        assert!(pow::meets_difficulty(&sequential.hash(), 1));
        assert!(pow::meets_difficulty(&parallel.hash(), 1));
        // both searched the same template, so non-nonce fields agree
        assert_eq!(sequential.previous_hash(), parallel.previous_hash());
        assert_eq!(sequential.timestamp(), parallel.timestamp());
    }
}
