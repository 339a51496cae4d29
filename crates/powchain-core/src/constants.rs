pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const BASE_DIFFICULTY: usize = 3;
pub const ZERO_CHAR: char = '0';
pub const GENESIS_PROOF: u64 = 100;
pub const GENESIS_PREVIOUS_HASH: &str = "1";
pub const REWARD_SENDER: &str = "0";
pub const MINING_REWARD: i64 = 1;
