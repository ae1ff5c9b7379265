//! Local inference: a lazily loaded model behind an explicit context.

pub mod context;
pub mod onnx_model;

pub use context::{LocalModel, LocalModelContext, ModelLoader};
pub use onnx_model::OnnxModel;
