pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Leading zero hex characters required of a sealed block's hash.
pub const DEFAULT_DIFFICULTY: u32 = 2;
/// Amount credited to the miner each time a block is sealed.
pub const MINING_REWARD: u64 = 100;
/// Fixed genesis timestamp: 2023-05-20T00:00:00Z, in Unix seconds.
pub const GENESIS_TIMESTAMP: u64 = 1_684_540_800;
