//! ONNX Runtime model with a HuggingFace tokenizer.
//!
//! Batches are padded to the longest sequence, pooled with the attention
//! mask, and L2-normalized.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use sift_core::errors::EmbeddingError;
use sift_core::models::Precision;
use tokenizers::tokenizer::{Tokenizer, TruncationDirection, TruncationParams, TruncationStrategy};
use tracing::debug;

use super::context::LocalModel;

const TOKENIZER_JSON: &str = "tokenizer.json";

/// Which input set the graph accepts. Learned on first run.
const LAYOUT_UNKNOWN: u8 = 0;
const LAYOUT_WITH_TYPES: u8 = 1;
const LAYOUT_WITHOUT_TYPES: u8 = 2;

pub struct OnnxModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimensions: usize,
    layout: AtomicU8,
}

/// Padded batch ready for the session.
struct Encoded {
    batch: usize,
    seq_len: usize,
    ids: Vec<i64>,
    mask: Vec<i64>,
    type_ids: Vec<i64>,
}

/// Model file for a precision inside a model directory.
///
/// Both `<dir>/<file>` and `<dir>/onnx/<file>` layouts are accepted.
pub fn model_file(dir: &Path, precision: Precision) -> Option<PathBuf> {
    let name = precision.model_file();
    [dir.join(name), dir.join("onnx").join(name)]
        .into_iter()
        .find(|p| p.is_file())
}

fn load_failed(path: &Path, reason: impl std::fmt::Display) -> EmbeddingError {
    EmbeddingError::ModelLoadFailed {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn inference_failed(reason: impl std::fmt::Display) -> EmbeddingError {
    EmbeddingError::InferenceFailed {
        reason: reason.to_string(),
    }
}

impl OnnxModel {
    /// Load the model variant for `precision` and the tokenizer from `dir`.
    pub fn load(
        dir: &Path,
        precision: Precision,
        max_length: usize,
        intra_threads: usize,
        dimensions: usize,
    ) -> Result<Self, EmbeddingError> {
        let model_path = model_file(dir, precision)
            .ok_or_else(|| load_failed(&dir.join(precision.model_file()), "model file not found"))?;
        let tokenizer_path = dir.join(TOKENIZER_JSON);
        if !tokenizer_path.is_file() {
            return Err(load_failed(&tokenizer_path, "tokenizer file not found"));
        }

        let session = Session::builder()
            .map_err(|e| load_failed(&model_path, e))?
            .with_intra_threads(intra_threads.max(1))
            .map_err(|e| load_failed(&model_path, e))?
            .commit_from_file(&model_path)
            .map_err(|e| load_failed(&model_path, e))?;

        let mut tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|e| load_failed(&tokenizer_path, e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_length.max(1),
                stride: 0,
                strategy: TruncationStrategy::OnlyFirst,
                direction: TruncationDirection::Right,
            }))
            .map_err(|e| load_failed(&tokenizer_path, e))?;

        debug!(model = %model_path.display(), dims = dimensions, "ONNX model loaded");
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimensions,
            layout: AtomicU8::new(LAYOUT_UNKNOWN),
        })
    }

    fn encode(&self, texts: &[String]) -> Result<Encoded, EmbeddingError> {
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let encodings = self
            .tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| inference_failed(format!("tokenization failed: {e}")))?;

        let batch = encodings.len();
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .max(1);
        let mut ids = vec![0i64; batch * seq_len];
        let mut mask = vec![0i64; batch * seq_len];
        let mut type_ids = vec![0i64; batch * seq_len];
        for (row, enc) in encodings.iter().enumerate() {
            let offset = row * seq_len;
            for (col, &id) in enc.get_ids().iter().enumerate() {
                ids[offset + col] = i64::from(id);
            }
            for (col, &m) in enc.get_attention_mask().iter().enumerate() {
                mask[offset + col] = i64::from(m);
            }
            for (col, &t) in enc.get_type_ids().iter().enumerate() {
                type_ids[offset + col] = i64::from(t);
            }
        }
        Ok(Encoded {
            batch,
            seq_len,
            ids,
            mask,
            type_ids,
        })
    }

    /// Run the session and return `(shape, data)` of the first output.
    fn run(&self, enc: &Encoded, with_types: bool) -> Result<(Vec<i64>, Vec<f32>), EmbeddingError> {
        let shape = vec![enc.batch as i64, enc.seq_len as i64];
        let ids = Tensor::from_array((shape.clone(), enc.ids.clone()))
            .map_err(|e| inference_failed(format!("tensor creation error: {e}")))?;
        let mask = Tensor::from_array((shape.clone(), enc.mask.clone()))
            .map_err(|e| inference_failed(format!("tensor creation error: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| inference_failed(format!("session lock poisoned: {e}")))?;

        let result = if with_types {
            let types = Tensor::from_array((shape, enc.type_ids.clone()))
                .map_err(|e| inference_failed(format!("tensor creation error: {e}")))?;
            session.run(ort::inputs![
                "input_ids" => ids,
                "attention_mask" => mask,
                "token_type_ids" => types
            ])
        } else {
            session.run(ort::inputs!["input_ids" => ids, "attention_mask" => mask])
        };
        let outputs = result.map_err(inference_failed)?;

        let (_name, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| inference_failed("no output tensor"))?;
        let (out_shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| inference_failed(format!("tensor extraction failed: {e}")))?;
        Ok((out_shape.iter().copied().collect(), data.to_vec()))
    }

    /// Run with the learned input layout, probing on the first batch.
    fn run_any_layout(&self, enc: &Encoded) -> Result<(Vec<i64>, Vec<f32>), EmbeddingError> {
        match self.layout.load(Ordering::Acquire) {
            LAYOUT_WITH_TYPES => self.run(enc, true),
            LAYOUT_WITHOUT_TYPES => self.run(enc, false),
            _ => match self.run(enc, true) {
                Ok(out) => {
                    self.layout.store(LAYOUT_WITH_TYPES, Ordering::Release);
                    Ok(out)
                }
                Err(first) => {
                    let out = self.run(enc, false).map_err(|_| first)?;
                    self.layout.store(LAYOUT_WITHOUT_TYPES, Ordering::Release);
                    Ok(out)
                }
            },
        }
    }
}

/// Masked mean pooling over `[batch, seq, dims]`, or passthrough for an
/// already pooled `[batch, dims]` output. Rows are L2-normalized.
pub fn pool_and_normalize(
    shape: &[i64],
    data: &[f32],
    mask: &[i64],
    seq_len: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut rows = match shape {
        [batch, seq, dims] => {
            let (batch, seq, dims) = (*batch as usize, *seq as usize, *dims as usize);
            if data.len() < batch * seq * dims {
                return Err(inference_failed("output tensor shorter than its shape"));
            }
            (0..batch)
                .map(|b| {
                    let mut pooled = vec![0.0f32; dims];
                    let mut count = 0.0f32;
                    for s in 0..seq.min(seq_len) {
                        if mask.get(b * seq_len + s).copied().unwrap_or(0) == 0 {
                            continue;
                        }
                        count += 1.0;
                        let offset = (b * seq + s) * dims;
                        for (d, v) in pooled.iter_mut().enumerate() {
                            *v += data[offset + d];
                        }
                    }
                    let count = count.max(1.0);
                    for v in &mut pooled {
                        *v /= count;
                    }
                    pooled
                })
                .collect::<Vec<_>>()
        }
        [batch, dims] => {
            let (batch, dims) = (*batch as usize, *dims as usize);
            if data.len() < batch * dims {
                return Err(inference_failed("output tensor shorter than its shape"));
            }
            data.chunks(dims.max(1)).take(batch).map(<[f32]>::to_vec).collect()
        }
        other => {
            return Err(inference_failed(format!("unexpected output shape: {other:?}")));
        }
    };
    for row in &mut rows {
        sift_core::vector::normalize(row);
    }
    Ok(rows)
}

impl LocalModel for OnnxModel {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let enc = self.encode(texts)?;
        let (shape, data) = self.run_any_layout(&enc)?;
        pool_and_normalize(&shape, &data, &enc.mask, enc.seq_len)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_pool_ignores_padding() {
        // batch 2, seq 2, dims 2; second row has one padded position.
        let shape = [2, 2, 2];
        let data = [1.0, 0.0, 3.0, 0.0, 0.0, 2.0, 100.0, 100.0];
        let mask = [1, 1, 1, 0];
        let rows = pool_and_normalize(&shape, &data, &mask, 2).unwrap();
        assert_eq!(rows[0], vec![1.0, 0.0]);
        assert_eq!(rows[1], vec![0.0, 1.0]);
    }

    #[test]
    fn pooled_output_passes_through_normalized() {
        let rows = pool_and_normalize(&[1, 2], &[3.0, 4.0], &[1], 1).unwrap();
        assert_eq!(rows, vec![vec![0.6, 0.8]]);
    }

    #[test]
    fn rejects_unknown_shape() {
        assert!(pool_and_normalize(&[4], &[0.0; 4], &[], 0).is_err());
    }

    #[test]
    fn precision_selects_variant_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("onnx")).unwrap();
        std::fs::write(dir.path().join("onnx").join("model_int8.onnx"), b"x").unwrap();
        assert!(model_file(dir.path(), Precision::Int8).is_some());
        assert!(model_file(dir.path(), Precision::F32).is_none());
    }
}
