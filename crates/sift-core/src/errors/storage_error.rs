/// Storage-layer errors for SQLite operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("corrupt vector for document {document_id}: {reason}")]
    CorruptVector { document_id: i64, reason: String },

    #[error("unknown job status: {status}")]
    UnknownJobStatus { status: String },
}
