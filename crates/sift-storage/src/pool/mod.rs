//! Connection pool managing read/write connections.

pub mod pragmas;
pub mod read_pool;
pub mod write_connection;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sift_core::errors::SiftResult;

pub use read_pool::ReadPool;
pub use write_connection::WriteConnection;

/// Manages the single write connection and the read connection pool.
pub struct ConnectionPool {
    pub writer: Arc<WriteConnection>,
    pub readers: Arc<ReadPool>,
    pub db_path: Option<PathBuf>,
}

impl ConnectionPool {
    /// Open a connection pool for the given database file.
    ///
    /// The writer opens (and creates) the file first so readers can attach
    /// read-only.
    pub fn open(path: &Path, read_pool_size: usize) -> SiftResult<Self> {
        let writer = Arc::new(WriteConnection::open(path)?);
        let readers = Arc::new(ReadPool::open(path, read_pool_size)?);
        Ok(Self {
            writer,
            readers,
            db_path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory connection pool (for testing).
    /// In-memory readers are isolated databases, so callers route reads
    /// through the writer.
    pub fn open_in_memory() -> SiftResult<Self> {
        let writer = Arc::new(WriteConnection::open_in_memory()?);
        let readers = Arc::new(ReadPool::open_in_memory(1)?);
        Ok(Self {
            writer,
            readers,
            db_path: None,
        })
    }
}
