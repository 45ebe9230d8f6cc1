//! Text encoders behind the `Embedder` seam.

use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::info;

use travelkb_core::config::{EncoderKind, Settings};
use travelkb_core::traits::Embedder;

pub mod device;
pub mod hashing;
pub mod pool;
pub mod tokenize;
pub mod transformer;

pub use hashing::HashingEncoder;
pub use pool::masked_mean_l2;
pub use transformer::TransformerEncoder;

/// Build the encoder selected by `settings`. Relative model paths resolve
/// against `base`.
pub fn load_encoder(settings: &Settings, base: &Path) -> Result<Box<dyn Embedder>> {
    match settings.encoder_kind() {
        EncoderKind::Hashing => {
            info!(dim = settings.hashing_dim, "using hashing encoder");
            Ok(Box::new(HashingEncoder::new(settings.hashing_dim)))
        }
        EncoderKind::Transformer => {
            let dir = settings
                .model_path(base)
                .ok_or_else(|| anyhow!("encoder = \"transformer\" requires model_dir"))?;
            if !dir.is_dir() { return Err(anyhow!("model directory {} does not exist", dir.display())); }
            Ok(Box::new(TransformerEncoder::load(&dir, settings.max_seq_len)?))
        }
    }
}
