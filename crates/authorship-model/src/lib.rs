//! Hybrid transformer + numeric-feature classifier for authorship detection
//!
//! This crate scores texts as human-written or AI-generated by fusing a
//! pretrained encoder's summary-token embedding with caller-defined numeric
//! features.
//!
//! - [`encoder`] — the [`TextEncoder`] capability and the HuggingFace-backed
//!   [`HfTextEncoder`]
//! - [`classifier`] — [`ClassifierHead`] and [`HybridClassifier`]
//! - [`device`] — compute device selection

pub mod classifier;
pub mod device;
pub mod encoder;

pub use classifier::{classify, probabilities, ClassifierHead, HybridClassifier, Mode};
pub use device::select_device;
pub use encoder::{summary_token_embedding, HfTextEncoder, TextEncoder, TokenBatch};
