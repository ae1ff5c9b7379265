//! `LocalModelContext` owns the loaded model for one adapter.
//!
//! The loader runs on first use and its result is kept for the adapter's
//! lifetime. A failed load is not cached, so the next batch tries again.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use sift_core::errors::EmbeddingError;
use tracing::info;

/// A model that embeds a batch synchronously.
pub trait LocalModel: Send + Sync {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn dimensions(&self) -> usize;
}

pub type ModelLoader =
    Box<dyn Fn() -> Result<Arc<dyn LocalModel>, EmbeddingError> + Send + Sync>;

pub struct LocalModelContext {
    loader: ModelLoader,
    model: OnceLock<Arc<dyn LocalModel>>,
    init: Mutex<()>,
    loads: AtomicUsize,
}

impl LocalModelContext {
    pub fn new(loader: ModelLoader) -> Self {
        Self {
            loader,
            model: OnceLock::new(),
            init: Mutex::new(()),
            loads: AtomicUsize::new(0),
        }
    }

    /// Return the model, loading it on first call.
    pub fn get(&self) -> Result<Arc<dyn LocalModel>, EmbeddingError> {
        if let Some(model) = self.model.get() {
            return Ok(Arc::clone(model));
        }
        let _guard = self.init.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(model) = self.model.get() {
            return Ok(Arc::clone(model));
        }
        self.loads.fetch_add(1, Ordering::Relaxed);
        let model = (self.loader)()?;
        info!(dimensions = model.dimensions(), "local model loaded");
        Ok(Arc::clone(self.model.get_or_init(|| model)))
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// How many times the loader has run.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    struct Fixed(usize);

    impl LocalModel for Fixed {
        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![1.0; self.0]).collect())
        }

        fn dimensions(&self) -> usize {
            self.0
        }
    }

    #[test]
    fn loads_once_across_threads() {
        let ctx = Arc::new(LocalModelContext::new(Box::new(|| {
            Ok(Arc::new(Fixed(3)) as Arc<dyn LocalModel>)
        })));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                std::thread::spawn(move || ctx.get().map(|m| m.dimensions()))
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap().unwrap(), 3);
        }
        assert_eq!(ctx.load_count(), 1);
    }

    #[test]
    fn failed_load_is_retried() {
        let fail = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&fail);
        let ctx = LocalModelContext::new(Box::new(move || {
            if flag.swap(false, Ordering::SeqCst) {
                Err(EmbeddingError::ModelLoadFailed {
                    path: "m".into(),
                    reason: "missing".into(),
                })
            } else {
                Ok(Arc::new(Fixed(2)) as Arc<dyn LocalModel>)
            }
        }));
        assert!(ctx.get().is_err());
        assert!(!ctx.is_loaded());
        assert_eq!(ctx.get().unwrap().dimensions(), 2);
        assert_eq!(ctx.load_count(), 2);
    }
}
