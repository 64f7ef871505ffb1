pub const DEFAULT_CHUNK_LINE_LIMIT: usize = 100_000;
pub const DEFAULT_IO_BUFFER_SIZE_KB: usize = 64;
pub const DEFAULT_MERGE_BUFFER_SIZE_KB: usize = 64;
pub const DEFAULT_MERGE_PROGRESS_INTERVAL_SECONDS: u64 = 10;
pub const DEFAULT_CANCEL_CHECK_INTERVAL_LINES: usize = 1000;

pub const MIN_CHUNK_LINE_LIMIT: usize = 1;
pub const MAX_CHUNK_LINE_LIMIT: usize = 100_000_000;
pub const MIN_BUFFER_SIZE_KB: usize = 1;
pub const MAX_BUFFER_SIZE_KB: usize = 65_536;

pub const TEMP_DIR_NAME: &str = "tempChunks";
pub const WORKSPACE_DIR_PREFIX: &str = "ip-sift-";
pub const WORKSPACE_CREATE_ATTEMPTS: usize = 3;
pub const RUN_FILE_PREFIX: &str = "run_";
pub const RUN_FILE_EXTENSION: &str = ".txt";

pub const MERGE_HEAP_INITIAL_CAPACITY: usize = 64;
pub const PROGRESS_CHECK_INTERVAL_VALUES: u64 = 4096;
pub const OPEN_RUNS_WARNING_THRESHOLD: usize = 512;
