use crate::constants::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF, MINING_REWARD, REWARD_SENDER};
use crate::error::{ChainError, PowError};
use crate::pow::{self, Difficulty};
use crate::{canonical_hash, unix_timestamp, Block, HexDigest, Transaction};
use tracing::{debug, info};

/// Append-only chain of blocks plus the queue of transactions waiting for
/// the next one.
///
/// Mutators take `&mut self`; callers sharing a ledger across threads wrap it
/// in a lock so that `pending` is drained at a single instant.
#[derive(Clone, Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
}

/// Everything a proof search needs, captured from the chain tip.
#[derive(Clone, Debug, PartialEq)]
pub struct MiningTemplate {
    pub next_index: u64,
    pub last_proof: u64,
    pub previous_hash: HexDigest,
    pub difficulty: Difficulty,
}

impl MiningTemplate {
    pub fn find_proof(&self) -> u64 {
        pow::find_proof(self.last_proof, &self.difficulty)
    }

    pub fn find_proof_bounded(&self, max_attempts: u64) -> Result<u64, PowError> {
        pow::find_proof_bounded(self.last_proof, &self.difficulty, max_attempts)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// A ledger holding only the genesis block.
    pub fn new() -> Self {
        let mut ledger = Self {
            chain: Vec::new(),
            pending: Vec::new(),
        };
        ledger.create_block(GENESIS_PROOF, Some(GENESIS_PREVIOUS_HASH.to_string()));
        ledger
    }

    /// Seals every pending transaction into a new block and appends it.
    /// Without `previous_hash` the canonical hash of the current tip is used.
    pub fn create_block(&mut self, proof: u64, previous_hash: Option<HexDigest>) -> Block {
        let previous_hash = previous_hash.unwrap_or_else(|| canonical_hash(self.last_block()));
        let block = Block {
            index: self.chain.len() as u64 + 1,
            timestamp: unix_timestamp(),
            transactions: std::mem::take(&mut self.pending),
            proof,
            previous_hash,
        };
        info!(
            index = block.index,
            proof = block.proof,
            txs = block.transactions.len(),
            "block appended"
        );
        self.chain.push(block.clone());
        block
    }

    /// Queues a transaction and returns the index of the block it is expected
    /// to land in. The prediction goes stale if another block is created first.
    pub fn enqueue_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: i64,
    ) -> u64 {
        let tx = Transaction::new(sender, recipient, amount);
        debug!(sender = %tx.sender, recipient = %tx.recipient, amount, "transaction queued");
        self.pending.push(tx);
        self.last_block().index + 1
    }

    pub fn current_difficulty(&self) -> Difficulty {
        pow::difficulty_for_length(self.chain.len())
    }

    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("ledger always holds the genesis block")
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Number of blocks, genesis included.
    pub fn height(&self) -> usize {
        self.chain.len()
    }

    pub fn template(&self) -> MiningTemplate {
        let last = self.last_block();
        MiningTemplate {
            next_index: last.index + 1,
            last_proof: last.proof,
            previous_hash: canonical_hash(last),
            difficulty: self.current_difficulty(),
        }
    }

    /// Pays the miner and creates the block a search over `template` was
    /// run for. Fails if the chain has moved on since the template was taken.
    pub fn commit_mined(
        &mut self,
        template: MiningTemplate,
        proof: u64,
        miner: &str,
    ) -> Result<Block, ChainError> {
        let actual = self.last_block().index + 1;
        if template.next_index != actual {
            return Err(ChainError::StaleTemplate {
                expected: template.next_index,
                actual,
            });
        }
        Ok(self.seal(template.previous_hash, proof, miner))
    }

    /// Runs the whole mining flow on the calling thread.
    pub fn mine(&mut self, miner: &str) -> Block {
        let template = self.template();
        let proof = template.find_proof();
        self.seal(template.previous_hash, proof, miner)
    }

    fn seal(&mut self, previous_hash: HexDigest, proof: u64, miner: &str) -> Block {
        self.enqueue_transaction(REWARD_SENDER, miner, MINING_REWARD);
        self.create_block(proof, Some(previous_hash))
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        validate_chain(&self.chain)
    }
}

/// Checks indices, the genesis sentinel, hash links and proofs. Reports the
/// first offending block.
pub fn validate_chain(chain: &[Block]) -> Result<(), ChainError> {
    let genesis = chain.first().ok_or(ChainError::Empty)?;
    if genesis.previous_hash != GENESIS_PREVIOUS_HASH || genesis.proof != GENESIS_PROOF {
        return Err(ChainError::BadGenesis);
    }

    for (position, block) in chain.iter().enumerate() {
        if block.index != position as u64 + 1 {
            return Err(ChainError::IndexMismatch {
                position,
                index: block.index,
            });
        }
        if position == 0 {
            continue;
        }
        let previous = &chain[position - 1];
        if block.previous_hash != canonical_hash(previous) {
            return Err(ChainError::BrokenLink { index: block.index });
        }
        // Block at `position` was mined while the chain held `position` blocks.
        let difficulty = pow::difficulty_for_length(position);
        if !pow::valid_proof(previous.proof, block.proof, &difficulty) {
            return Err(ChainError::InvalidProof { index: block.index });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BASE_DIFFICULTY;

    #[test]
    fn genesis_example() {
        let ledger = Ledger::new();
        assert_eq!(ledger.height(), 1);
        let genesis = ledger.last_block();
        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis.proof, GENESIS_PROOF);
        assert!(genesis.transactions.is_empty());
        assert!(ledger.pending().is_empty());
        assert!(ledger.validate().is_ok());
    }

    #[test]
    fn enqueue_predicts_next_index() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.enqueue_transaction("A", "B", 10), 2);
        assert_eq!(ledger.enqueue_transaction("B", "C", -5), 2);
        assert_eq!(ledger.pending().len(), 2);
        assert_eq!(ledger.pending()[1], Transaction::new("B", "C", -5));
    }

    #[test]
    fn create_block_drains_pending_scenario() {
        let mut ledger = Ledger::new();
        let previous_index = ledger.last_block().index;
        ledger.enqueue_transaction("A", "B", 10);
        ledger.enqueue_transaction("B", "C", 5);
        let expected = ledger.pending().to_vec();

        let block = ledger.create_block(12345, Some("H".to_string()));

        assert_eq!(
            block.transactions,
            vec![Transaction::new("A", "B", 10), Transaction::new("B", "C", 5)]
        );
        assert_eq!(block.transactions, expected);
        assert_eq!(block.index, previous_index + 1);
        assert_eq!(block.previous_hash, "H");
        assert!(ledger.pending().is_empty());
        assert_eq!(ledger.last_block(), &block);
    }

    #[test]
    fn create_block_hashes_tip_when_no_previous_hash() {
        let mut ledger = Ledger::new();
        let tip_hash = canonical_hash(ledger.last_block());
        let block = ledger.create_block(7, None);
        assert_eq!(block.previous_hash, tip_hash);
    }

    #[test]
    fn transactions_land_in_exactly_one_block() {
        let mut ledger = Ledger::new();
        ledger.enqueue_transaction("A", "B", 1);
        ledger.create_block(1, None);
        ledger.enqueue_transaction("C", "D", 2);
        ledger.create_block(2, None);
        ledger.create_block(3, None);

        let chain = ledger.chain();
        assert_eq!(chain[1].transactions, vec![Transaction::new("A", "B", 1)]);
        assert_eq!(chain[2].transactions, vec![Transaction::new("C", "D", 2)]);
        assert!(chain[3].transactions.is_empty());
        for (position, block) in chain.iter().enumerate() {
            assert_eq!(block.index, position as u64 + 1);
        }
    }

    #[test]
    fn prediction_goes_stale_after_another_block() {
        let mut ledger = Ledger::new();
        let predicted = ledger.enqueue_transaction("A", "B", 1);
        ledger.create_block(1, None);
        let second = ledger.enqueue_transaction("C", "D", 2);
        assert_eq!(predicted, 2);
        assert_eq!(second, 3);
    }

    #[test]
    fn current_difficulty_follows_height() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.current_difficulty().leading_zeros, 1 + BASE_DIFFICULTY);
        while ledger.height() < 16 {
            ledger.create_block(0, None);
        }
        assert_eq!(ledger.current_difficulty().leading_zeros, 2 + BASE_DIFFICULTY);
    }

    #[test]
    fn mine_example() {
        let mut ledger = Ledger::new();
        ledger.enqueue_transaction("A", "B", 10);
        let genesis_hash = canonical_hash(ledger.last_block());

        let block = ledger.mine("miner-1");

        assert_eq!(block.index, 2);
        assert_eq!(block.previous_hash, genesis_hash);
        assert_eq!(block.proof, 28377);
        assert_eq!(
            block.transactions,
            vec![
                Transaction::new("A", "B", 10),
                Transaction::new(REWARD_SENDER, "miner-1", MINING_REWARD),
            ]
        );
        assert!(pow::proof_digest(GENESIS_PROOF, block.proof).starts_with("0000"));
        assert!(ledger.validate().is_ok());
    }

    #[test]
    fn chaining_invariant_holds_after_mining() {
        let mut ledger = Ledger::new();
        for i in 0..3 {
            ledger.enqueue_transaction("A", "B", i);
            ledger.mine("miner");
        }
        let chain = ledger.chain();
        assert_eq!(chain.len(), 4);
        for i in 1..chain.len() {
            assert_eq!(chain[i].previous_hash, canonical_hash(&chain[i - 1]));
        }
        assert!(validate_chain(chain).is_ok());
    }

    #[test]
    fn commit_mined_rejects_stale_template() {
        let mut ledger = Ledger::new();
        let template = ledger.template();
        let proof = template.find_proof();
        ledger.create_block(0, None);
        ledger.enqueue_transaction("A", "B", 1);

        let err = ledger.commit_mined(template, proof, "miner").unwrap_err();

        assert_eq!(
            err,
            ChainError::StaleTemplate {
                expected: 2,
                actual: 3
            }
        );
        assert_eq!(ledger.height(), 2);
        assert_eq!(ledger.pending().len(), 1);
    }

    #[test]
    fn commit_mined_includes_late_transactions() {
        let mut ledger = Ledger::new();
        let template = ledger.template();
        let proof = template.find_proof();
        ledger.enqueue_transaction("late", "B", 3);

        let block = ledger.commit_mined(template, proof, "miner").unwrap();

        assert_eq!(block.transactions[0], Transaction::new("late", "B", 3));
        assert_eq!(block.transactions.len(), 2);
        assert!(ledger.validate().is_ok());
    }

    #[test]
    fn read_is_idempotent() {
        let mut ledger = Ledger::new();
        ledger.create_block(1, None);
        let first = ledger.chain().to_vec();
        let second = ledger.chain().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn validate_reports_broken_link() {
        let mut ledger = Ledger::new();
        ledger.mine("miner");
        ledger.mine("miner");
        let mut chain = ledger.chain().to_vec();
        chain[1].transactions.push(Transaction::new("Eve", "Eve", 1_000));

        assert_eq!(
            validate_chain(&chain),
            Err(ChainError::BrokenLink { index: 3 })
        );
        assert_eq!(
            ChainError::BrokenLink { index: 3 }.to_string(),
            "chain broken at index 3"
        );
    }

    #[test]
    fn validate_reports_invalid_proof() {
        let mut ledger = Ledger::new();
        ledger.mine("miner");
        let template = ledger.template();
        let bad_proof = (0..)
            .find(|p| !pow::valid_proof(template.last_proof, *p, &template.difficulty))
            .unwrap();
        ledger.create_block(bad_proof, None);

        assert_eq!(ledger.validate(), Err(ChainError::InvalidProof { index: 3 }));
    }

    #[test]
    fn validate_reports_index_and_genesis_problems() {
        assert_eq!(validate_chain(&[]), Err(ChainError::Empty));

        let mut ledger = Ledger::new();
        ledger.mine("miner");

        let mut chain = ledger.chain().to_vec();
        chain[0].previous_hash = "0".to_string();
        assert_eq!(validate_chain(&chain), Err(ChainError::BadGenesis));

        let mut chain = ledger.chain().to_vec();
        chain[1].index = 7;
        assert_eq!(
            validate_chain(&chain),
            Err(ChainError::IndexMismatch {
                position: 1,
                index: 7
            })
        );
    }
}
