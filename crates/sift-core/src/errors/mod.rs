mod config_error;
mod embedding_error;
mod pipeline_error;
mod retrieval_error;
mod sift_error;
mod storage_error;

pub use config_error::ConfigError;
pub use embedding_error::{EmbeddingError, ErrorKind};
pub use pipeline_error::PipelineError;
pub use retrieval_error::RetrievalError;
pub use sift_error::{SiftError, SiftResult};
pub use storage_error::StorageError;
