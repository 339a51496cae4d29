pub const DEFAULT_LISTEN: &str = "127.0.0.1:5000";
pub const BLOCK_FORGED_MESSAGE: &str = "New Block Forged";
