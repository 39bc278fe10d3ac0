//! Hybrid text + numeric-feature classifier.
//!
//! Concatenates the encoder's summary-token embedding with a caller-supplied
//! feature vector and scores the result with a small feed-forward head that
//! emits one logit per example.
//!
//! # Architecture
//!
//! ```text
//! [CLS embedding | features] → Dropout(0.3) → Linear(hidden) → ReLU
//!                            → Dropout(0.2) → Linear(1) → logit
//! ```
//!
//! No activation is applied to the logit; use [`HybridClassifier::predict_proba`]
//! for sigmoid probabilities.

use std::collections::HashMap;
use std::path::Path;

use authorship_core::{
    AuthorshipError, ClassifierConfig, Result, HIDDEN_DROPOUT, INPUT_DROPOUT,
};
use candle_core::{DType, Device, Tensor};
use candle_nn::{Dropout, Linear, Module, VarBuilder, VarMap};

use crate::encoder::{summary_token_embedding, TextEncoder};

/// Whether dropout is active for a forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Dropout layers zero activations at random.
    Train,
    /// Dropout layers are the identity.
    Inference,
}

impl Mode {
    fn is_train(self) -> bool {
        matches!(self, Mode::Train)
    }
}

// ---------------------------------------------------------------------------
// ClassifierHead
// ---------------------------------------------------------------------------

/// The feed-forward head of the hybrid classifier.
///
/// Works on precomputed sentence embeddings, so it can be trained and
/// evaluated without running the transformer.
pub struct ClassifierHead {
    fc1: Linear,
    fc2: Linear,
    input_dropout: Dropout,
    hidden_dropout: Dropout,
    embedding_dim: usize,
    num_features: usize,
    hidden_size: usize,
    device: Device,
}

impl ClassifierHead {
    /// Create a head with freshly initialised weights.
    pub fn new_random(
        embedding_dim: usize,
        config: &ClassifierConfig,
        device: &Device,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        Self::new_trainable(&varmap, embedding_dim, config, device)
    }

    /// Create a head whose weights are registered in `varmap`, so an external
    /// optimizer can update them through `varmap.all_vars()`.
    pub fn new_trainable(
        varmap: &VarMap,
        embedding_dim: usize,
        config: &ClassifierConfig,
        device: &Device,
    ) -> Result<Self> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
        Self::from_var_builder(vb, embedding_dim, config, device)
    }

    /// Load head weights from a safetensors file (`fc1.*`, `fc2.*`).
    ///
    /// Returns an error if the file cannot be read or the weights do not
    /// match the configured architecture.
    pub fn load(
        path: impl AsRef<Path>,
        embedding_dim: usize,
        config: &ClassifierConfig,
        device: &Device,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        // SAFETY: memory-mapping safetensors is the standard candle pattern.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device).map_err(|e| {
                AuthorshipError::Model(format!("Failed to load classifier weights: {e}"))
            })?
        };
        Self::from_var_builder(vb, embedding_dim, config, device)
    }

    fn from_var_builder(
        vb: VarBuilder,
        embedding_dim: usize,
        config: &ClassifierConfig,
        device: &Device,
    ) -> Result<Self> {
        config.validate()?;
        if embedding_dim == 0 {
            return Err(AuthorshipError::Config(
                "embedding dimension must be positive".to_string(),
            ));
        }

        let input_dim = embedding_dim + config.num_features;
        let fc1 = candle_nn::linear(input_dim, config.hidden_size, vb.pp("fc1"))
            .map_err(|e| AuthorshipError::Model(format!("Failed to create head fc1: {e}")))?;
        let fc2 = candle_nn::linear(config.hidden_size, 1, vb.pp("fc2"))
            .map_err(|e| AuthorshipError::Model(format!("Failed to create head fc2: {e}")))?;

        Ok(Self {
            fc1,
            fc2,
            input_dropout: Dropout::new(INPUT_DROPOUT),
            hidden_dropout: Dropout::new(HIDDEN_DROPOUT),
            embedding_dim,
            num_features: config.num_features,
            hidden_size: config.hidden_size,
            device: device.clone(),
        })
    }

    /// Write the head weights to a safetensors file readable by [`Self::load`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut tensors: HashMap<String, Tensor> = HashMap::new();
        tensors.insert("fc1.weight".to_string(), self.fc1.weight().clone());
        tensors.insert("fc2.weight".to_string(), self.fc2.weight().clone());
        if let Some(bias) = self.fc1.bias() {
            tensors.insert("fc1.bias".to_string(), bias.clone());
        }
        if let Some(bias) = self.fc2.bias() {
            tensors.insert("fc2.bias".to_string(), bias.clone());
        }
        candle_core::safetensors::save(&tensors, path.as_ref()).map_err(|e| {
            AuthorshipError::Model(format!(
                "Failed to save classifier weights to {}: {e}",
                path.as_ref().display()
            ))
        })
    }

    /// Score a batch of sentence embeddings with their feature vectors.
    ///
    /// * `embedding` — `[batch, embedding_dim]`
    /// * `features` — `[batch, num_features]`
    ///
    /// Returns `[batch]` logits.
    pub fn forward(&self, embedding: &Tensor, features: &Tensor, mode: Mode) -> Result<Tensor> {
        let (batch, embedding_dim) = embedding.dims2().map_err(|e| {
            AuthorshipError::ShapeMismatch(format!("embedding must be [batch, dim]: {e}"))
        })?;
        let (feature_batch, num_features) = features.dims2().map_err(|e| {
            AuthorshipError::ShapeMismatch(format!("features must be [batch, num_features]: {e}"))
        })?;

        if embedding_dim != self.embedding_dim {
            return Err(AuthorshipError::ShapeMismatch(format!(
                "embedding has {embedding_dim} dims, head expects {}",
                self.embedding_dim
            )));
        }
        if num_features != self.num_features {
            return Err(AuthorshipError::ShapeMismatch(format!(
                "feature vector has {num_features} values, classifier expects {}",
                self.num_features
            )));
        }
        if feature_batch != batch {
            return Err(AuthorshipError::ShapeMismatch(format!(
                "feature batch has {feature_batch} rows, embedding batch has {batch}"
            )));
        }

        let features = features
            .to_dtype(DType::F32)
            .map_err(|e| AuthorshipError::Model(format!("Feature cast failed: {e}")))?;
        let embedding = embedding
            .to_dtype(DType::F32)
            .map_err(|e| AuthorshipError::Model(format!("Embedding cast failed: {e}")))?;

        // [batch, embedding_dim + num_features]
        let input = Tensor::cat(&[&embedding, &features], 1)
            .map_err(|e| AuthorshipError::Model(format!("Failed to concatenate input: {e}")))?;

        let train = mode.is_train();
        let x = self
            .input_dropout
            .forward(&input, train)
            .map_err(|e| AuthorshipError::Model(format!("Input dropout failed: {e}")))?;
        let h = self
            .fc1
            .forward(&x)
            .and_then(|t| t.relu())
            .map_err(|e| AuthorshipError::Model(format!("Head fc1 forward failed: {e}")))?;
        let h = self
            .hidden_dropout
            .forward(&h, train)
            .map_err(|e| AuthorshipError::Model(format!("Hidden dropout failed: {e}")))?;
        let logits = self
            .fc2
            .forward(&h)
            .map_err(|e| AuthorshipError::Model(format!("Head fc2 forward failed: {e}")))?;

        logits
            .squeeze(1)
            .map_err(|e| AuthorshipError::Model(format!("Failed to flatten logits: {e}")))
    }

    /// Width of the sentence embedding this head consumes.
    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Width of the feature vector this head consumes.
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Width of the hidden layer.
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Returns a reference to the device this head runs on.
    pub fn device(&self) -> &Device {
        &self.device
    }
}

// ---------------------------------------------------------------------------
// HybridClassifier
// ---------------------------------------------------------------------------

/// Text encoder plus [`ClassifierHead`].
pub struct HybridClassifier<E: TextEncoder> {
    encoder: E,
    head: ClassifierHead,
}

impl<E: TextEncoder> HybridClassifier<E> {
    /// Pair an encoder with an existing head.
    ///
    /// Fails with `ShapeMismatch` if the head was built for a different
    /// embedding width than the encoder produces.
    pub fn new(encoder: E, head: ClassifierHead) -> Result<Self> {
        if head.embedding_dim() != encoder.hidden_size() {
            return Err(AuthorshipError::ShapeMismatch(format!(
                "head expects {}-dim embeddings, encoder produces {}",
                head.embedding_dim(),
                encoder.hidden_size()
            )));
        }
        Ok(Self { encoder, head })
    }

    /// Build a classifier with a freshly initialised head sized to `encoder`.
    pub fn with_random_head(
        encoder: E,
        config: &ClassifierConfig,
        device: &Device,
    ) -> Result<Self> {
        let head = ClassifierHead::new_random(encoder.hidden_size(), config, device)?;
        Self::new(encoder, head)
    }

    /// Produce one logit per example.
    ///
    /// * `input_ids`, `attention_mask` — `[batch, seq_len]`
    /// * `features` — `[batch, num_features]`
    ///
    /// Returns `[batch]` logits with no activation applied.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        attention_mask: &Tensor,
        features: &Tensor,
        mode: Mode,
    ) -> Result<Tensor> {
        if input_ids.dims() != attention_mask.dims() {
            return Err(AuthorshipError::ShapeMismatch(format!(
                "token ids {:?} and attention mask {:?} differ",
                input_ids.dims(),
                attention_mask.dims()
            )));
        }
        let (batch, _) = input_ids.dims2().map_err(|e| {
            AuthorshipError::ShapeMismatch(format!("token ids must be [batch, seq_len]: {e}"))
        })?;
        // Check the features before paying for the encoder pass.
        let (feature_batch, num_features) = features.dims2().map_err(|e| {
            AuthorshipError::ShapeMismatch(format!("features must be [batch, num_features]: {e}"))
        })?;
        if num_features != self.head.num_features() {
            return Err(AuthorshipError::ShapeMismatch(format!(
                "feature vector has {num_features} values, classifier expects {}",
                self.head.num_features()
            )));
        }
        if feature_batch != batch {
            return Err(AuthorshipError::ShapeMismatch(format!(
                "feature batch has {feature_batch} rows, token batch has {batch}"
            )));
        }

        let hidden = self.encoder.encode(input_ids, attention_mask)?;
        let embedding = summary_token_embedding(&hidden)?;
        self.head.forward(&embedding, features, mode)
    }

    /// Sigmoid probabilities of the positive class, inference mode.
    pub fn predict_proba(
        &self,
        input_ids: &Tensor,
        attention_mask: &Tensor,
        features: &Tensor,
    ) -> Result<Vec<f32>> {
        let logits = self.forward(input_ids, attention_mask, features, Mode::Inference)?;
        probabilities(&logits)
    }

    /// Class predictions (`1` when the probability is at least `threshold`).
    pub fn predict(
        &self,
        input_ids: &Tensor,
        attention_mask: &Tensor,
        features: &Tensor,
        threshold: f32,
    ) -> Result<Vec<i64>> {
        check_threshold(threshold)?;
        let probs = self.predict_proba(input_ids, attention_mask, features)?;
        classify(&probs, threshold)
    }

    /// The wrapped text encoder.
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// The feed-forward head.
    pub fn head(&self) -> &ClassifierHead {
        &self.head
    }
}

/// Sigmoid of `[batch]` logits.
pub fn probabilities(logits: &Tensor) -> Result<Vec<f32>> {
    candle_nn::ops::sigmoid(logits)
        .and_then(|p| p.to_vec1::<f32>())
        .map_err(|e| AuthorshipError::Model(format!("Failed to extract probabilities: {e}")))
}

/// Threshold probabilities into class labels: `1` when `p >= threshold`.
pub fn classify(probabilities: &[f32], threshold: f32) -> Result<Vec<i64>> {
    check_threshold(threshold)?;
    Ok(probabilities
        .iter()
        .map(|&p| i64::from(p >= threshold))
        .collect())
}

fn check_threshold(threshold: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(AuthorshipError::InvalidInput(format!(
            "threshold {threshold} is outside [0, 1]"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
