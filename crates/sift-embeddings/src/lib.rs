//! # sift-embeddings
//!
//! Backends that turn batches of text into vectors. Three interchangeable
//! variants sit behind `IEmbeddingBackend`; the factory builds the configured
//! one and refuses to fall back silently.
//!
//! ## Architecture
//!
//! ```text
//! create_backend(EmbeddingConfig, BackendKind)
//! ├── OpenAiBackend   (one POST per batch, index-ordered response)
//! ├── GeminiBackend   (one POST per item, shared RateGate)
//! │   └── RateGate    (requests + tokens per rolling window, injectable Clock)
//! └── LocalBackend    (ONNX via ort + tokenizers)
//!     └── LocalModelContext (lazy load, memoized per adapter)
//! matryoshka (truncate, renormalize, overlap cosine)
//! ```

pub mod clock;
pub mod local;
pub mod matryoshka;
pub mod providers;
pub mod rate_gate;

pub use clock::{Clock, ManualClock, SystemClock};
pub use local::{LocalModel, LocalModelContext, OnnxModel};
pub use providers::{create_active_backend, create_backend, GeminiBackend, LocalBackend, OpenAiBackend};
pub use rate_gate::{estimate_tokens, Admission, RateGate};
