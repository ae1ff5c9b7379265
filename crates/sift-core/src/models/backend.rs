use std::fmt;

use serde::{Deserialize, Serialize};

/// The three adapter families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Batched OpenAI-compatible endpoint.
    OpenAi,
    /// Per-item endpoint behind a shared request/token budget.
    Gemini,
    /// In-process ONNX inference.
    Local,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Local => "local",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "cloud" => Some(Self::OpenAi),
            "gemini" | "google" => Some(Self::Gemini),
            "local" | "onnx" => Some(Self::Local),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        !matches!(self, Self::Local)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local model weight precision. Selects which model file is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    F32,
    F16,
    Int8,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F16 => "f16",
            Self::Int8 => "int8",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "f32" | "fp32" | "float32" => Some(Self::F32),
            "f16" | "fp16" | "float16" => Some(Self::F16),
            "int8" | "q8" | "quantized" => Some(Self::Int8),
            _ => None,
        }
    }

    /// Model file name for this precision inside the model directory.
    pub fn model_file(&self) -> &'static str {
        match self {
            Self::F32 => "model.onnx",
            Self::F16 => "model_fp16.onnx",
            Self::Int8 => "model_int8.onnx",
        }
    }
}

/// Identity of the vectors a backend produces.
///
/// `variant` carries whatever changes the vectors without changing the model
/// name: output dimensions for cloud backends, precision and output
/// dimensions for local inference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelIdentity {
    pub backend: BackendKind,
    pub model: String,
    pub variant: String,
}

impl ModelIdentity {
    pub fn new(backend: BackendKind, model: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            variant: variant.into(),
        }
    }

    pub fn with_dimensions(backend: BackendKind, model: impl Into<String>, dims: usize) -> Self {
        Self::new(backend, model, format!("d{dims}"))
    }

    /// Local inference identity. The model output is truncated to `dims`, so
    /// the dimension is part of the variant alongside the precision.
    pub fn local(model: impl Into<String>, precision: Precision, dims: usize) -> Self {
        Self::new(
            BackendKind::Local,
            model,
            format!("{}-d{dims}", precision.as_str()),
        )
    }

    /// Salt mixed into every content hash produced for this identity.
    pub fn salt(&self) -> String {
        format!("{}:{}:{}", self.backend.as_str(), self.model, self.variant)
    }

    /// Settings key under which run progress is published.
    pub fn progress_key(&self) -> String {
        format!("progress:{}:{}", self.backend.as_str(), self.model)
    }
}

impl fmt::Display for ModelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.backend, self.model, self.variant)
    }
}
