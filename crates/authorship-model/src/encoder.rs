//! Pretrained text encoders for the hybrid classifier.
//!
//! The classifier only needs per-token representations and the width of
//! those representations, so the backbone is modelled as the [`TextEncoder`]
//! capability. [`HfTextEncoder`] is the production implementation: a BERT or
//! RoBERTa-family model downloaded from the HuggingFace Hub and run with
//! `candle-transformers`.

use std::path::PathBuf;

use authorship_core::{AuthorshipError, ClassifierConfig, EncoderConfig, Result};
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{Activation, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{Config as RobertaConfig, XLMRobertaModel};
use serde::Deserialize;
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

use crate::device::select_device;

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// A text encoder producing contextual per-token representations.
///
/// Any backbone with a compatible output shape can drive the classifier.
pub trait TextEncoder {
    /// Width of each per-token representation.
    fn hidden_size(&self) -> usize;

    /// Encode a tokenized batch.
    ///
    /// `input_ids` and `attention_mask` have shape `[batch, seq_len]`
    /// (`1` = attend, `0` = padding). Returns `[batch, seq_len, hidden_size]`.
    fn encode(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor>;
}

/// Take the representation at position 0 (the summary token) of every
/// sequence in the batch.
///
/// `hidden_states` has shape `[batch, seq_len, hidden_size]`; the result has
/// shape `[batch, hidden_size]`.
pub fn summary_token_embedding(hidden_states: &Tensor) -> Result<Tensor> {
    let (_, seq_len, _) = hidden_states.dims3().map_err(|e| {
        AuthorshipError::ShapeMismatch(format!(
            "encoder output must be [batch, seq_len, hidden]: {e}"
        ))
    })?;
    if seq_len == 0 {
        return Err(AuthorshipError::ShapeMismatch(
            "encoder output has an empty sequence dimension".to_string(),
        ));
    }
    hidden_states
        .i((.., 0))
        .and_then(|t| t.contiguous())
        .map_err(|e| AuthorshipError::Model(format!("Failed to extract summary token: {e}")))
}

// ---------------------------------------------------------------------------
// Tokenized input
// ---------------------------------------------------------------------------

/// A padded batch of token ids with its attention mask, both `[batch, seq_len]`.
#[derive(Debug, Clone)]
pub struct TokenBatch {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
}

impl TokenBatch {
    /// Number of sequences in the batch.
    pub fn batch_size(&self) -> usize {
        self.input_ids.dims().first().copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Backbones
// ---------------------------------------------------------------------------

/// Backbone architectures, selected by `model_type` in `config.json`.
enum Backbone {
    Bert(Box<BertModel>),
    /// RoBERTa and XLM-RoBERTa. Position ids start after `pad_token_id`.
    Roberta(Box<XLMRobertaModel>),
}

impl Backbone {
    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        let token_type_ids = input_ids.zeros_like()?;
        match self {
            Self::Bert(model) => model.forward(input_ids, &token_type_ids, Some(attention_mask)),
            Self::Roberta(model) => {
                model.forward(input_ids, attention_mask, &token_type_ids, None, None, None)
            }
        }
    }
}

/// RoBERTa `config.json` fields, with the defaults HuggingFace applies when
/// a checkpoint omits them.
#[derive(Debug, Deserialize)]
struct RobertaSettings {
    hidden_size: usize,
    num_hidden_layers: usize,
    num_attention_heads: usize,
    intermediate_size: usize,
    vocab_size: usize,
    max_position_embeddings: usize,
    #[serde(default = "default_hidden_act")]
    hidden_act: Activation,
    #[serde(default = "default_layer_norm_eps")]
    layer_norm_eps: f64,
    #[serde(default = "default_dropout")]
    hidden_dropout_prob: f32,
    #[serde(default = "default_dropout")]
    attention_probs_dropout_prob: f32,
    #[serde(default = "default_type_vocab_size")]
    type_vocab_size: usize,
    #[serde(default = "default_roberta_pad_id")]
    pad_token_id: u32,
    #[serde(default = "default_position_embedding_type")]
    position_embedding_type: String,
}

fn default_hidden_act() -> Activation {
    Activation::Gelu
}

fn default_layer_norm_eps() -> f64 {
    1e-5
}

fn default_dropout() -> f32 {
    0.1
}

fn default_type_vocab_size() -> usize {
    1
}

fn default_roberta_pad_id() -> u32 {
    1
}

fn default_position_embedding_type() -> String {
    "absolute".to_string()
}

impl From<RobertaSettings> for RobertaConfig {
    fn from(s: RobertaSettings) -> Self {
        Self {
            hidden_size: s.hidden_size,
            layer_norm_eps: s.layer_norm_eps,
            attention_probs_dropout_prob: s.attention_probs_dropout_prob,
            hidden_dropout_prob: s.hidden_dropout_prob,
            num_attention_heads: s.num_attention_heads,
            position_embedding_type: s.position_embedding_type,
            intermediate_size: s.intermediate_size,
            hidden_act: s.hidden_act,
            num_hidden_layers: s.num_hidden_layers,
            vocab_size: s.vocab_size,
            max_position_embeddings: s.max_position_embeddings,
            type_vocab_size: s.type_vocab_size,
            pad_token_id: s.pad_token_id,
        }
    }
}

// ---------------------------------------------------------------------------
// HfTextEncoder
// ---------------------------------------------------------------------------

/// BERT or RoBERTa-family encoder loaded from the HuggingFace Hub.
///
/// Downloads `config.json`, `tokenizer.json`, and `model.safetensors` on first
/// use and keeps the tokenizer alongside the model so callers can go from raw
/// text to a [`TokenBatch`].
pub struct HfTextEncoder {
    model: Backbone,
    tokenizer: Tokenizer,
    device: Device,
    hidden_size: usize,
    model_id: String,
}

impl HfTextEncoder {
    /// Download (or reuse from cache) and load the encoder named by
    /// `classifier.text_model_identifier`.
    ///
    /// This is an async operation because model downloads use the tokio-based
    /// HuggingFace Hub client.
    pub async fn load(classifier: &ClassifierConfig, encoder: &EncoderConfig) -> Result<Self> {
        use hf_hub::api::tokio::{Api, ApiBuilder};

        classifier.validate()?;
        if encoder.max_seq_len == 0 {
            return Err(AuthorshipError::Config(
                "max_seq_len must be positive".to_string(),
            ));
        }

        let model_id = classifier.text_model_identifier.clone();
        tracing::info!(model_id = %model_id, "Loading text encoder");

        let api = match &encoder.cache_dir {
            Some(dir) => ApiBuilder::new().with_cache_dir(dir.clone()).build(),
            None => Api::new(),
        }
        .map_err(|e| AuthorshipError::Model(format!("Failed to create HF API client: {e}")))?;

        let repo = api.model(model_id.clone());

        let config_path = repo
            .get("config.json")
            .await
            .map_err(|e| AuthorshipError::Model(format!("Failed to download config.json: {e}")))?;
        let tokenizer_path = repo.get("tokenizer.json").await.map_err(|e| {
            AuthorshipError::Model(format!("Failed to download tokenizer.json: {e}"))
        })?;
        let weights_path = repo.get("model.safetensors").await.map_err(|e| {
            AuthorshipError::Model(format!("Failed to download model.safetensors: {e}"))
        })?;

        Self::from_files(
            model_id,
            &config_path,
            &tokenizer_path,
            weights_path,
            encoder.max_seq_len,
            &select_device(),
        )
    }

    /// Load from files already present on disk.
    pub fn from_files(
        model_id: impl Into<String>,
        config_path: &std::path::Path,
        tokenizer_path: &std::path::Path,
        weights_path: PathBuf,
        max_seq_len: usize,
        device: &Device,
    ) -> Result<Self> {
        let model_id = model_id.into();

        let config_str = std::fs::read_to_string(config_path)?;
        let config_json: serde_json::Value = serde_json::from_str(&config_str)
            .map_err(|e| AuthorshipError::Model(format!("Failed to parse config.json: {e}")))?;
        let model_type = config_json
            .get("model_type")
            .and_then(|v| v.as_str())
            .unwrap_or("bert")
            .to_string();

        // SAFETY: memory-mapping safetensors is the standard candle pattern.
        // The file is read-only and remains valid for the lifetime of VarBuilder.
        let load_weights = || unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path.clone()], DType::F32, device)
                .map_err(|e| AuthorshipError::Model(format!("Failed to load weights: {e}")))
        };

        let (model, hidden_size, config_pad_id) = match model_type.as_str() {
            "bert" => {
                let config: BertConfig = serde_json::from_value(config_json)
                    .map_err(|e| AuthorshipError::Model(format!("Invalid BERT config: {e}")))?;
                let model = BertModel::load(load_weights()?, &config).map_err(|e| {
                    AuthorshipError::Model(format!("Failed to load BERT encoder: {e}"))
                })?;
                let pad_id = u32::try_from(config.pad_token_id).map_err(|_| {
                    AuthorshipError::Config(format!(
                        "pad_token_id {} is out of range",
                        config.pad_token_id
                    ))
                })?;
                (Backbone::Bert(Box::new(model)), config.hidden_size, pad_id)
            }
            "roberta" | "xlm-roberta" => {
                let settings: RobertaSettings = serde_json::from_value(config_json)
                    .map_err(|e| AuthorshipError::Model(format!("Invalid RoBERTa config: {e}")))?;
                let config = RobertaConfig::from(settings);
                let vb = load_weights()?;
                // Checkpoints saved from a task model nest the encoder under `roberta.`.
                let vb = if vb.contains_tensor("embeddings.word_embeddings.weight") {
                    vb
                } else {
                    vb.pp("roberta")
                };
                let model = XLMRobertaModel::new(&config, vb).map_err(|e| {
                    AuthorshipError::Model(format!("Failed to load RoBERTa encoder: {e}"))
                })?;
                let hidden_size = config.hidden_size;
                (Backbone::Roberta(Box::new(model)), hidden_size, config.pad_token_id)
            }
            other => {
                return Err(AuthorshipError::Config(format!(
                    "unsupported encoder model_type '{other}' \
                     (supported: bert, roberta, xlm-roberta)"
                )));
            }
        };

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| AuthorshipError::Model(format!("Failed to load tokenizer: {e}")))?;
        let (pad_id, pad_token) = padding_token(&tokenizer, &model_type, config_pad_id);
        tokenizer.with_padding(Some(PaddingParams {
            pad_id,
            pad_token,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_seq_len,
                ..Default::default()
            }))
            .map_err(|e| AuthorshipError::Model(format!("Invalid truncation settings: {e}")))?;

        tracing::info!(
            model_id = %model_id,
            model_type = %model_type,
            hidden_size,
            pad_id,
            "Text encoder loaded"
        );

        Ok(Self {
            model,
            tokenizer,
            device: device.clone(),
            hidden_size,
            model_id,
        })
    }

    /// Tokenize a batch of texts, padding to the longest sequence.
    pub fn tokenize(&self, texts: &[&str]) -> Result<TokenBatch> {
        if texts.is_empty() {
            return Err(AuthorshipError::InvalidInput(
                "cannot tokenize an empty batch".to_string(),
            ));
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| AuthorshipError::Model(format!("Tokenization failed: {e}")))?;

        let seq_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
        let mut ids = Vec::with_capacity(texts.len() * seq_len);
        let mut mask = Vec::with_capacity(texts.len() * seq_len);
        for encoding in &encodings {
            if encoding.get_ids().len() != seq_len {
                return Err(AuthorshipError::ShapeMismatch(format!(
                    "tokenizer returned ragged batch: {} vs {seq_len} tokens",
                    encoding.get_ids().len()
                )));
            }
            ids.extend_from_slice(encoding.get_ids());
            mask.extend_from_slice(encoding.get_attention_mask());
        }

        let input_ids = Tensor::from_vec(ids, (texts.len(), seq_len), &self.device)
            .map_err(|e| AuthorshipError::Model(format!("Tensor creation failed: {e}")))?;
        let attention_mask = Tensor::from_vec(mask, (texts.len(), seq_len), &self.device)
            .map_err(|e| AuthorshipError::Model(format!("Tensor creation failed: {e}")))?;

        Ok(TokenBatch {
            input_ids,
            attention_mask,
        })
    }

    /// The HuggingFace model ID this encoder was loaded from.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Returns a reference to the device this encoder runs on.
    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl TextEncoder for HfTextEncoder {
    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn encode(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        self.model
            .forward(input_ids, attention_mask)
            .map_err(|e| AuthorshipError::Model(format!("Encoder inference failed: {e}")))
    }
}

/// Padding id and token for a backbone.
///
/// BERT vocabularies name the token `[PAD]`; RoBERTa vocabularies use `<pad>`.
/// Falls back to the id in `config.json` when the tokenizer lacks either.
fn padding_token(tokenizer: &Tokenizer, model_type: &str, config_pad_id: u32) -> (u32, String) {
    let name = if model_type == "bert" { "[PAD]" } else { "<pad>" };
    match tokenizer.token_to_id(name) {
        Some(id) => (id, name.to_string()),
        None => {
            let token = tokenizer
                .id_to_token(config_pad_id)
                .unwrap_or_else(|| name.to_string());
            (config_pad_id, token)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
