pub const BYTES_PER_KB: usize = 1024;
pub const BYTES_PER_MB: usize = 1_048_576;

pub const DEFAULT_INPUT_PATH: &str = "ips.txt";
pub const RESULT_LABEL: &str = "Number of unique IP addresses";
