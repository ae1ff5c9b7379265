pub mod embedding_ops;
pub mod job_ops;
pub mod maintenance;
pub mod settings_ops;
