// ============================================================
// Layer 5 — Autoencoder
// ============================================================
// Encoder and decoder parameters in one Burn module, so a
// single optimiser and a single record cover all 16 tensors:
//
//   encoder.conv1 / conv2 / dense3 / dense4   (weight, bias)
//   decoder.dense5 / dense6 / upconv7 / upconv8 (weight, bias)
//
// The decoder is held as bare DecoderParams. Anything that
// needs a Decoder (sampling) wraps those same parameters with
// shared_decoder instead of owning a second copy.
//
// Loss: sum over every pixel of |input − reconstruction| (L1).

use burn::prelude::*;

use crate::domain::image_spec::ConfigError;
use crate::ml::{
    decoder::{new_decoder, DecoderConfig, DecoderParams},
    encoder::{Encoder, EncoderConfig},
    shapes::{prefixed, ParameterShapes},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct AutoencoderConfig {
    pub encoder: EncoderConfig,
    pub decoder: DecoderConfig,
}

impl AutoencoderConfig {
    /// The classic topology for `depth`-channel images of `height × width`,
    /// reconstructed at the same size and depth.
    pub fn for_images(height: usize, width: usize, depth: usize, representation_size: usize) -> Self {
        Self::new(
            EncoderConfig::new(depth, height, width, representation_size),
            DecoderConfig::new(representation_size, height, width, depth),
        )
    }

    /// Same init std for every tensor in the model
    pub fn with_init_std(mut self, std: f64) -> Self {
        self.encoder.init_std = std;
        self.decoder.init_std = std;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.encoder.validate()?;
        self.decoder.validate()?;
        if self.encoder.representation_size != self.decoder.representation_size {
            return Err(ConfigError::RepresentationMismatch {
                encoder: self.encoder.representation_size,
                decoder: self.decoder.representation_size,
            });
        }
        Ok(())
    }

    /// Shapes `init` allocates, named "encoder.conv1.weight" etc.
    pub fn expected_shapes(&self) -> ParameterShapes {
        [
            prefixed("encoder", self.encoder.expected_shapes()),
            prefixed("decoder", self.decoder.expected_shapes()),
        ]
        .concat()
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Autoencoder<B>, ConfigError> {
        self.validate()?;
        let encoder      = self.encoder.init(device);
        let (_, decoder) = new_decoder(&self.decoder, device)?;
        Ok(Autoencoder { encoder, decoder })
    }
}

#[derive(Module, Debug)]
pub struct Autoencoder<B: Backend> {
    pub encoder: Encoder<B>,
    pub decoder: DecoderParams<B>,
}

impl<B: Backend> Autoencoder<B> {
    /// images: [batch, depth, H, W] → latent: [batch, representation_size]
    pub fn encode(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.encoder.forward(images)
    }

    pub fn reconstruct(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        self.decoder.forward(self.encode(images))
    }

    /// Scalar L1 loss, summed (not averaged) over batch and pixels
    pub fn forward_loss(&self, images: Tensor<B, 4>) -> Tensor<B, 1> {
        let reconstruction = self.reconstruct(images.clone());
        (images - reconstruction).abs().sum()
    }

    pub fn parameter_shapes(&self) -> ParameterShapes {
        [
            prefixed("encoder", self.encoder.parameter_shapes()),
            prefixed("decoder", self.decoder.parameter_shapes()),
        ]
        .concat()
    }
}

/// A 16×16 model small enough for CPU tests
#[cfg(test)]
pub(crate) fn tiny_config(depth: usize) -> AutoencoderConfig {
    AutoencoderConfig::new(
        EncoderConfig::new(depth, 16, 16, 8)
            .with_conv1_channels(4)
            .with_conv2_channels(4)
            .with_hidden_size(16),
        DecoderConfig::new(8, 16, 16, depth)
            .with_hidden_size(16)
            .with_dense_width(64)
            .with_seed_size(4)
            .with_upconv_channels(8)
            .with_upconv_size(8),
    )
    .with_init_std(0.1)
}
