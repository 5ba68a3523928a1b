//! Sentence-embedding models run through ONNX Runtime.
//!
//! Expects a model directory holding `model.onnx` and `tokenizer.json`
//! (the layout sentence-transformers exports, e.g. all-MiniLM-L6-v2).

use async_trait::async_trait;
use ndarray::{Array2, ArrayD, ArrayView2, Axis, Ix2, Ix3};
use ort::session::{builder::GraphOptimizationLevel, Session, SessionInputs};
use ort::value::{DynTensor, Tensor};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::embeddings::{normalize, Embedder};
use crate::error::{Result, VectorStoreError};

pub const ONNX_MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Model served by [`OnnxEmbedder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnnxModelConfig {
    /// Directory with `model.onnx` and `tokenizer.json`
    pub model_dir: PathBuf,
    /// Recorded in persisted indexes as `onnx:<name>`
    pub name: String,
    /// Output width of the model (384 for all-MiniLM-L6-v2)
    pub dimension: usize,
    /// Tokens kept per text
    pub max_length: usize,
    /// Texts per forward pass
    pub max_batch: usize,
}

impl OnnxModelConfig {
    #[must_use]
    pub fn minilm(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            name: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            max_length: 256,
            max_batch: 32,
        }
    }
}

struct OnnxRuntime {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimension: usize,
    max_batch: usize,
}

/// [`Embedder`] over an ONNX sentence model with mean pooling.
///
/// Inference runs on the blocking pool; the session is shared behind a mutex.
pub struct OnnxEmbedder {
    model_id: String,
    dimension: usize,
    runtime: Arc<OnnxRuntime>,
}

impl OnnxEmbedder {
    /// Load the tokenizer and model. Missing files are reported as an
    /// unavailable embedder so callers can fall back or retry.
    pub fn load(config: &OnnxModelConfig) -> Result<Self> {
        let model_path = config.model_dir.join(ONNX_MODEL_FILE);
        let tokenizer_path = config.model_dir.join(TOKENIZER_FILE);
        if !model_path.exists() || !tokenizer_path.exists() {
            return Err(VectorStoreError::embedding_unavailable(format!(
                "model '{}' not found: expected {} and {}",
                config.name,
                model_path.display(),
                tokenizer_path.display()
            )));
        }

        let tokenizer = load_tokenizer(&tokenizer_path, config.max_length)?;
        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.with_intra_threads(default_intra_threads()))
            .and_then(|builder| builder.commit_from_file(&model_path))
            .map_err(|e| {
                VectorStoreError::embedding_unavailable(format!(
                    "failed to load ONNX model {}: {e}",
                    model_path.display()
                ))
            })?;

        log::info!(
            "Loaded ONNX model '{}' (dim {}, max_length {})",
            config.name,
            config.dimension,
            config.max_length
        );
        Ok(Self {
            model_id: format!("onnx:{}", config.name),
            dimension: config.dimension,
            runtime: Arc::new(OnnxRuntime {
                session: Mutex::new(session),
                tokenizer,
                dimension: config.dimension,
                max_batch: config.max_batch.max(1),
            }),
        })
    }
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let owned: Vec<String> = texts.iter().map(ToString::to_string).collect();
        let runtime = self.runtime.clone();
        tokio::task::spawn_blocking(move || runtime.embed_blocking(&owned))
            .await
            .map_err(|e| VectorStoreError::embedding_unavailable(format!("embedding task failed: {e}")))?
    }
}

impl OnnxRuntime {
    fn embed_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.max_batch) {
            let encodings = self
                .tokenizer
                .encode_batch(batch.to_vec(), true)
                .map_err(|e| VectorStoreError::embedding_unavailable(format!("tokenization failed: {e}")))?;
            let Some(seq_len) = encodings.first().map(Encoding::len) else {
                continue;
            };

            let (ids, mask, type_ids) = token_matrices(&encodings, seq_len)?;
            let mut available: HashMap<&str, DynTensor> = HashMap::new();
            available.insert("input_ids", to_tensor(ids)?);
            available.insert("attention_mask", to_tensor(mask.clone())?);
            available.insert("token_type_ids", to_tensor(type_ids)?);

            let hidden = {
                let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
                let mut feed: HashMap<String, DynTensor> = HashMap::new();
                for input in &session.inputs {
                    let Some(value) = available.remove(input.name.as_str()) else {
                        return Err(VectorStoreError::embedding_unavailable(format!(
                            "unsupported model input '{}'",
                            input.name
                        )));
                    };
                    feed.insert(input.name.clone(), value);
                }
                let outputs = session
                    .run(SessionInputs::from(feed))
                    .map_err(|e| VectorStoreError::embedding_unavailable(format!("ONNX forward failed: {e}")))?;
                if outputs.len() == 0 {
                    return Err(VectorStoreError::embedding_unavailable("ONNX returned no outputs"));
                }
                outputs[0]
                    .try_extract_array::<f32>()
                    .map_err(|e| VectorStoreError::embedding_unavailable(format!("bad ONNX output: {e}")))?
                    .to_owned()
            };
            out.extend(pool_output(hidden, &mask, self.dimension)?);
        }
        Ok(out)
    }
}

fn load_tokenizer(path: &Path, max_length: usize) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path).map_err(|e| {
        VectorStoreError::embedding_unavailable(format!("failed to load {}: {e}", path.display()))
    })?;
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        ..PaddingParams::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..TruncationParams::default()
        }))
        .map_err(|e| VectorStoreError::embedding_unavailable(format!("tokenizer truncation: {e}")))?;
    Ok(tokenizer)
}

fn default_intra_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, 4)
}

type TokenMatrices = (Array2<i64>, Array2<i64>, Array2<i64>);

fn token_matrices(encodings: &[Encoding], seq_len: usize) -> Result<TokenMatrices> {
    let rows = encodings.len();
    let mut ids = Vec::with_capacity(rows * seq_len);
    let mut mask = Vec::with_capacity(rows * seq_len);
    let mut type_ids = Vec::with_capacity(rows * seq_len);
    for encoding in encodings {
        if encoding.len() != seq_len {
            return Err(VectorStoreError::embedding_unavailable(
                "inconsistent sequence lengths after padding",
            ));
        }
        ids.extend(encoding.get_ids().iter().map(|v| i64::from(*v)));
        mask.extend(encoding.get_attention_mask().iter().map(|v| i64::from(*v)));
        type_ids.extend(encoding.get_type_ids().iter().map(|v| i64::from(*v)));
    }
    let shape = |data: Vec<i64>| {
        Array2::from_shape_vec((rows, seq_len), data)
            .map_err(|e| VectorStoreError::embedding_unavailable(format!("token shape: {e}")))
    };
    Ok((shape(ids)?, shape(mask)?, shape(type_ids)?))
}

fn to_tensor(array: Array2<i64>) -> Result<DynTensor> {
    Tensor::from_array(array.into_dyn())
        .map(Tensor::upcast)
        .map_err(|e| VectorStoreError::embedding_unavailable(format!("tensor: {e}")))
}

/// Sentence vectors from model output: rank 2 is already pooled, rank 3 is
/// token states averaged under the attention mask.
fn pool_output(output: ArrayD<f32>, mask: &Array2<i64>, dimension: usize) -> Result<Vec<Vec<f32>>> {
    let shape = output.shape().to_vec();
    let bad_shape = || VectorStoreError::embedding_unavailable(format!("unexpected ONNX output shape {shape:?}"));
    let vectors: Vec<Vec<f32>> = match output.ndim() {
        2 => output
            .into_dimensionality::<Ix2>()
            .map_err(|_| bad_shape())?
            .outer_iter()
            .map(|row| row.to_vec())
            .collect(),
        3 => {
            let hidden = output.into_dimensionality::<Ix3>().map_err(|_| bad_shape())?;
            hidden
                .outer_iter()
                .zip(mask.outer_iter())
                .map(|(tokens, row_mask)| mean_pool(tokens, row_mask.as_slice().unwrap_or(&[])))
                .collect()
        }
        _ => return Err(bad_shape()),
    };

    vectors
        .into_iter()
        .map(|mut vector| {
            if vector.len() != dimension {
                return Err(VectorStoreError::InvalidDimension {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            normalize(&mut vector);
            Ok(vector)
        })
        .collect()
}

fn mean_pool(tokens: ArrayView2<'_, f32>, mask: &[i64]) -> Vec<f32> {
    let mut sum = vec![0.0f32; tokens.len_of(Axis(1))];
    let mut count = 0.0f32;
    for (i, token) in tokens.outer_iter().enumerate() {
        if mask.get(i).copied().unwrap_or(0) == 0 {
            continue;
        }
        count += 1.0;
        for (acc, value) in sum.iter_mut().zip(token.iter()) {
            *acc += value;
        }
    }
    if count > 0.0 {
        for value in &mut sum {
            *value /= count;
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    #[test]
    fn missing_model_files_are_unavailable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = OnnxEmbedder::load(&OnnxModelConfig::minilm(tmp.path())).err().unwrap();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("model.onnx"));
    }

    #[test]
    fn mean_pool_skips_padding() {
        let tokens = array![[1.0f32, 3.0], [3.0, 5.0], [100.0, 100.0]];
        assert_eq!(mean_pool(tokens.view(), &[1, 1, 0]), vec![2.0, 4.0]);
    }

    #[test]
    fn token_states_are_pooled_and_normalized() {
        let mut hidden = Array3::<f32>::zeros((1, 2, 2));
        hidden[[0, 0, 0]] = 3.0;
        hidden[[0, 1, 1]] = 4.0;
        let mask = array![[1i64, 1]];
        let vectors = pool_output(hidden.into_dyn(), &mask, 2).unwrap();
        assert!((vectors[0][0] - 0.6).abs() < 1e-6);
        assert!((vectors[0][1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn pooled_output_of_wrong_width_is_rejected() {
        let pooled = array![[1.0f32, 0.0, 0.0]];
        let mask = array![[1i64]];
        assert!(matches!(
            pool_output(pooled.into_dyn(), &mask, 2),
            Err(VectorStoreError::InvalidDimension { expected: 2, actual: 3 })
        ));
    }
}
