pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const DEFAULT_DIFFICULTY: usize = 4;
pub const GENESIS_PROOF: u64 = 100;
pub const GENESIS_PREVIOUS_HASH: &str =
    "The Times 03/Jan/2009 Chancellor on brink of second bailout for banks.";
pub const HASH_LIST_HEAD: &str = "head";
/// How many witnesses the sequential search tries between deadline checks.
pub const SEARCH_CHECK_INTERVAL: u64 = 1024;
