// Single source of truth for all default values.

// --- Storage ---
pub const DEFAULT_DB_FILENAME: &str = "sift.db";
pub const DEFAULT_READ_POOL_SIZE: usize = 4;

// --- Embeddings ---
pub const DEFAULT_ACTIVE_BACKEND: &str = "openai";

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OPENAI_DIMENSIONS: usize = 1536;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_HTTP_MAX_RETRIES: u32 = 2;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-embedding-001";
pub const DEFAULT_GEMINI_DIMENSIONS: usize = 768;
pub const DEFAULT_GEMINI_MAX_RPM: u32 = 100;
pub const DEFAULT_GEMINI_MAX_TPM: u32 = 30_000;
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 60;
pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

pub const DEFAULT_LOCAL_MODEL: &str = "multilingual-e5-small";
pub const DEFAULT_LOCAL_PRECISION: &str = "f32";
pub const DEFAULT_LOCAL_DIMENSIONS: usize = 384;
pub const DEFAULT_LOCAL_MAX_LENGTH: usize = 512;
pub const DEFAULT_LOCAL_INTRA_THREADS: usize = 2;

// --- Pipeline ---
pub const DEFAULT_CONCURRENCY: usize = 128;
pub const DEFAULT_BATCH_SIZE: usize = 16;
pub const DEFAULT_FAILURE_COOLDOWN_MS: u64 = 2_000;
pub const DEFAULT_MAX_RESTARTS: u32 = 3;
/// Local inference gets one loop per this many configured loops.
pub const LOCAL_CONCURRENCY_DIVISOR: usize = 64;
pub const LOCAL_MAX_WORKERS: usize = 4;

// --- Retrieval ---
pub const DEFAULT_RRF_K: u32 = 60;
pub const DEFAULT_HYBRID_ALPHA: f64 = 2.0;
pub const DEFAULT_CANDIDATE_POOL: usize = 200;
pub const DEFAULT_RERANK_TOP_K: usize = 20;
pub const DEFAULT_RERANK_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_KEYWORD_TOP_K: usize = 5;
pub const DEFAULT_NEAR_DISTANCE: u32 = 10;
pub const DEFAULT_ANN_M: usize = 16;
pub const DEFAULT_ANN_EF_CONSTRUCTION: usize = 200;
pub const DEFAULT_ANN_EF_SEARCH: usize = 64;
pub const DEFAULT_QUERY_CACHE_SIZE: u64 = 1_024;

// --- Observability ---
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_JSON_LOGS: bool = true;
