// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<ImageSample>
// into one tensor.
//
//   Input:  N samples, each [C, H, W] flattened
//   Output: ImageBatch with images of shape [N, C, H, W]
//
// Every sample in a batch shares the canvas geometry, so the
// flat buffers are concatenated and reshaped in one go.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::ImageSample;

/// A batch of images ready for the forward pass.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Pixel intensities in [0, 1], shape [batch_size, channels, height, width]
    pub images: Tensor<B, 4>,
}

#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ImageSample, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageSample>) -> ImageBatch<B> {
        let batch_size = items.len();
        let (channels, height, width) = items
            .first()
            .map(|s| (s.channels(), s.height(), s.width()))
            .unwrap_or((0, 0, 0));

        let flat: Vec<f32> = items
            .into_iter()
            .flat_map(|s| s.pixels)
            .collect();

        let data   = TensorData::new(flat, [batch_size, channels, height, width]);
        let images = Tensor::<B, 4>::from_data(data, &self.device);

        ImageBatch { images }
    }
}
