// ============================================================
// Layer 5 — Convolutional Encoder
// ============================================================
// Image batch → latent vector.
//
//   [N, depth, H, W]
//     conv1  11×11, depth → 128, stride 1, same padding, ReLU
//     pool1  max 11×11, stride 5, same padding   → ceil(H/5)
//     conv2  5×5, 128 → 64, stride 1, same padding, ReLU
//     pool2  max 5×5, stride 5, same padding     → ceil(H/25)
//     flatten
//     dense3 → 512, ReLU
//     dense4 → representation_size, ReLU
//   [N, representation_size]
//
// "Same" pooling follows the TensorFlow definition: the output
// is ceil(size / stride) and the padding is whatever makes that
// true, split as evenly as possible.
//
// Kernel sizes and strides are fixed; channel widths live in
// EncoderConfig with the classic values as defaults.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Initializer, Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::image_spec::{ConfigError, Depth};
use crate::ml::shapes::{conv_shapes, linear_shapes, pair, ParameterShapes};

pub const CONV1_KERNEL: usize = 11;
pub const POOL1_KERNEL: usize = 11;
pub const POOL1_STRIDE: usize = 5;
pub const CONV2_KERNEL: usize = 5;
pub const POOL2_KERNEL: usize = 5;
pub const POOL2_STRIDE: usize = 5;

/// Output length of a TF "same" pool along one axis
pub fn same_pool_output(size: usize, stride: usize) -> usize {
    size.div_ceil(stride)
}

/// Symmetric padding that makes a pool produce `same_pool_output` values.
/// Odd totals round up; the floor in the pool output formula absorbs the
/// extra pixel when stride > 1.
pub fn same_pool_padding(size: usize, kernel: usize, stride: usize) -> usize {
    let out   = same_pool_output(size, stride);
    let total = ((out - 1) * stride + kernel).saturating_sub(size);
    total.div_ceil(2)
}

#[derive(Config, Debug)]
pub struct EncoderConfig {
    pub input_depth:         usize,
    pub input_height:        usize,
    pub input_width:         usize,
    pub representation_size: usize,
    #[config(default = 128)]
    pub conv1_channels:      usize,
    #[config(default = 64)]
    pub conv2_channels:      usize,
    #[config(default = 512)]
    pub hidden_size:         usize,
    /// Standard deviation of the zero-mean normal used for every tensor
    #[config(default = 1.0)]
    pub init_std:            f64,
}

impl EncoderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Depth::try_from(self.input_depth)?;
        for (value, what) in [
            (self.input_height,        "encoder input height"),
            (self.input_width,         "encoder input width"),
            (self.representation_size, "representation size"),
            (self.conv1_channels,      "conv1 channels"),
            (self.conv2_channels,      "conv2 channels"),
            (self.hidden_size,         "encoder hidden size"),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroSized(what));
            }
        }
        Ok(())
    }

    /// Spatial size after both pools: (height, width)
    pub fn pooled_dims(&self) -> (usize, usize) {
        let pool = |n| same_pool_output(same_pool_output(n, POOL1_STRIDE), POOL2_STRIDE);
        (pool(self.input_height), pool(self.input_width))
    }

    /// Length of the vector fed to dense3
    pub fn flattened_size(&self) -> usize {
        let (h, w) = self.pooled_dims();
        h * w * self.conv2_channels
    }

    pub fn expected_shapes(&self) -> ParameterShapes {
        let (c1, c2) = (self.conv1_channels, self.conv2_channels);
        [
            pair("conv1", vec![c1, self.input_depth, CONV1_KERNEL, CONV1_KERNEL], vec![c1]),
            pair("conv2", vec![c2, c1, CONV2_KERNEL, CONV2_KERNEL], vec![c2]),
            pair("dense3", vec![self.flattened_size(), self.hidden_size], vec![self.hidden_size]),
            pair("dense4", vec![self.hidden_size, self.representation_size], vec![self.representation_size]),
        ]
        .concat()
    }

    fn initializer(&self) -> Initializer {
        Initializer::Normal { mean: 0.0, std: self.init_std }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        let (h, w)    = (self.input_height, self.input_width);
        let pooled_h  = same_pool_output(h, POOL1_STRIDE);
        let pooled_w  = same_pool_output(w, POOL1_STRIDE);

        let conv1 = Conv2dConfig::new([self.input_depth, self.conv1_channels], [CONV1_KERNEL, CONV1_KERNEL])
            .with_padding(PaddingConfig2d::Explicit(CONV1_KERNEL / 2, CONV1_KERNEL / 2))
            .with_initializer(self.initializer())
            .init(device);
        let pool1 = MaxPool2dConfig::new([POOL1_KERNEL, POOL1_KERNEL])
            .with_strides([POOL1_STRIDE, POOL1_STRIDE])
            .with_padding(PaddingConfig2d::Explicit(
                same_pool_padding(h, POOL1_KERNEL, POOL1_STRIDE),
                same_pool_padding(w, POOL1_KERNEL, POOL1_STRIDE),
            ))
            .init();

        let conv2 = Conv2dConfig::new([self.conv1_channels, self.conv2_channels], [CONV2_KERNEL, CONV2_KERNEL])
            .with_padding(PaddingConfig2d::Explicit(CONV2_KERNEL / 2, CONV2_KERNEL / 2))
            .with_initializer(self.initializer())
            .init(device);
        let pool2 = MaxPool2dConfig::new([POOL2_KERNEL, POOL2_KERNEL])
            .with_strides([POOL2_STRIDE, POOL2_STRIDE])
            .with_padding(PaddingConfig2d::Explicit(
                same_pool_padding(pooled_h, POOL2_KERNEL, POOL2_STRIDE),
                same_pool_padding(pooled_w, POOL2_KERNEL, POOL2_STRIDE),
            ))
            .init();

        let dense3 = LinearConfig::new(self.flattened_size(), self.hidden_size)
            .with_initializer(self.initializer())
            .init(device);
        let dense4 = LinearConfig::new(self.hidden_size, self.representation_size)
            .with_initializer(self.initializer())
            .init(device);

        Encoder { conv1, pool1, conv2, pool2, dense3, dense4 }
    }
}

/// The encoder's layers are public so callers can inspect
/// its four (weight, bias) pairs directly.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub conv1:  Conv2d<B>,
    pub pool1:  MaxPool2d,
    pub conv2:  Conv2d<B>,
    pub pool2:  MaxPool2d,
    pub dense3: Linear<B>,
    pub dense4: Linear<B>,
}

impl<B: Backend> Encoder<B> {
    /// images: [batch, depth, height, width] → latent: [batch, representation_size]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool1.forward(relu(self.conv1.forward(images)));
        let x = self.pool2.forward(relu(self.conv2.forward(x)));
        let x: Tensor<B, 2> = x.flatten(1, 3);
        let x = relu(self.dense3.forward(x));
        relu(self.dense4.forward(x))
    }

    pub fn parameter_shapes(&self) -> ParameterShapes {
        [
            conv_shapes("conv1", &self.conv1),
            conv_shapes("conv2", &self.conv2),
            linear_shapes("dense3", &self.dense3),
            linear_shapes("dense4", &self.dense4),
        ]
        .concat()
    }
}
