// ============================================================
// Layer 5 — Up-convolutional Decoder
// ============================================================
// Latent vector → image batch.
//
//   [N, representation_size]
//     dense5   → 1024, ReLU
//     dense6   → 4096, ReLU
//     unflatten → [N, 4, 32, 32]          (4096 = 4·32·32)
//     upconv7  5×5 transposed conv → [N, 16, 128, 128], ReLU
//     upconv8  11×11 transposed conv → [N, depth, H, W]
//   linear output (no final activation)
//
// Both up-convolutions carry an UNTIED bias: one value per
// output element ([C, H, W]) rather than one per channel.
//
// The transposed-conv stride is the exact ratio between input
// and output size (32 → 128 is 4, 128 → 256 is 2). Padding and
// output padding are solved so that
//     (in − 1)·stride − 2·padding + (kernel − 1) + padding_out + 1 = in·stride
// holds exactly. Configurations where that is impossible are
// rejected up front instead of failing inside a reshape.
//
// Two ways to obtain a decoder:
//   new_decoder(config)          → fresh parameters
//   shared_decoder(config, params) → reuse someone else's parameters
// Both implement the Decoder trait.

use burn::{
    module::Param,
    nn::{
        conv::{ConvTranspose2d, ConvTranspose2dConfig},
        Initializer, Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::image_spec::{ConfigError, Depth};
use crate::ml::shapes::{first_mismatch, linear_shapes, pair, param_shape, ParameterShapes};

pub const UPCONV7_KERNEL: usize = 5;
pub const UPCONV8_KERNEL: usize = 11;

/// Stride and paddings of a transposed convolution along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsampleAxis {
    pub stride:      usize,
    pub padding:     usize,
    pub padding_out: usize,
}

/// Solve stride/padding for an up-convolution from `from` to `to` pixels.
pub fn upsample_axis(from: usize, to: usize, kernel: usize) -> Result<UpsampleAxis, ConfigError> {
    if from == 0 || to == 0 || to % from != 0 {
        return Err(ConfigError::UpsampleRatio { from, to });
    }
    let stride = to / from;

    // Need 2·padding − padding_out = kernel − stride
    let (padding, padding_out) = if kernel >= stride {
        let diff = kernel - stride;
        (diff.div_ceil(2), diff % 2)
    } else {
        (0, stride - kernel)
    };

    if padding_out > 0 && padding_out >= stride {
        return Err(ConfigError::UpsamplePadding { kernel, stride });
    }
    Ok(UpsampleAxis { stride, padding, padding_out })
}

#[derive(Config, Debug)]
pub struct DecoderConfig {
    pub representation_size: usize,
    pub output_height:       usize,
    pub output_width:        usize,
    pub output_depth:        usize,
    #[config(default = 1024)]
    pub hidden_size:         usize,
    /// Width of dense6; must equal seed_channels · seed_size²
    #[config(default = 4096)]
    pub dense_width:         usize,
    #[config(default = 4)]
    pub seed_channels:       usize,
    #[config(default = 32)]
    pub seed_size:           usize,
    #[config(default = 16)]
    pub upconv_channels:     usize,
    #[config(default = 128)]
    pub upconv_size:         usize,
    #[config(default = 1.0)]
    pub init_std:            f64,
}

/// Solved strides/paddings of both up-convolutions, per [height, width]
#[derive(Debug, Clone, Copy)]
struct DecoderGeometry {
    upconv7: [UpsampleAxis; 2],
    upconv8: [UpsampleAxis; 2],
}

impl DecoderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geometry().map(|_| ())
    }

    fn geometry(&self) -> Result<DecoderGeometry, ConfigError> {
        Depth::try_from(self.output_depth)?;
        for (value, what) in [
            (self.representation_size, "representation size"),
            (self.hidden_size,         "decoder hidden size"),
            (self.seed_channels,       "decoder seed channels"),
            (self.seed_size,           "decoder seed size"),
            (self.upconv_channels,     "up-convolution channels"),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroSized(what));
            }
        }

        let seed_volume = self.seed_channels * self.seed_size * self.seed_size;
        if self.dense_width != seed_volume {
            return Err(ConfigError::DecoderWidthMismatch {
                width:    self.dense_width,
                channels: self.seed_channels,
                size:     self.seed_size,
            });
        }

        let up7 = upsample_axis(self.seed_size, self.upconv_size, UPCONV7_KERNEL)?;
        Ok(DecoderGeometry {
            upconv7: [up7, up7],
            upconv8: [
                upsample_axis(self.upconv_size, self.output_height, UPCONV8_KERNEL)?,
                upsample_axis(self.upconv_size, self.output_width,  UPCONV8_KERNEL)?,
            ],
        })
    }

    pub fn expected_shapes(&self) -> ParameterShapes {
        let (up_c, up_s) = (self.upconv_channels, self.upconv_size);
        [
            pair("dense5", vec![self.representation_size, self.hidden_size], vec![self.hidden_size]),
            pair("dense6", vec![self.hidden_size, self.dense_width], vec![self.dense_width]),
            pair(
                "upconv7",
                vec![self.seed_channels, up_c, UPCONV7_KERNEL, UPCONV7_KERNEL],
                vec![up_c, up_s, up_s],
            ),
            pair(
                "upconv8",
                vec![up_c, self.output_depth, UPCONV8_KERNEL, UPCONV8_KERNEL],
                vec![self.output_depth, self.output_height, self.output_width],
            ),
        ]
        .concat()
    }

    fn initializer(&self) -> Initializer {
        Initializer::Normal { mean: 0.0, std: self.init_std }
    }

    fn upconv<B: Backend>(
        &self,
        channels: [usize; 2],
        kernel:   usize,
        axes:     [UpsampleAxis; 2],
        out_size: [usize; 2],
        device:   &B::Device,
    ) -> UpConv<B> {
        let deconv = ConvTranspose2dConfig::new(channels, [kernel, kernel])
            .with_stride([axes[0].stride, axes[1].stride])
            .with_padding([axes[0].padding, axes[1].padding])
            .with_padding_out([axes[0].padding_out, axes[1].padding_out])
            .with_bias(false)
            .with_initializer(self.initializer())
            .init(device);
        let bias = self.initializer().init([channels[1], out_size[0], out_size[1]], device);

        UpConv { deconv, bias }
    }

    fn init_params<B: Backend>(&self, device: &B::Device) -> Result<DecoderParams<B>, ConfigError> {
        let geometry = self.geometry()?;

        let dense5 = LinearConfig::new(self.representation_size, self.hidden_size)
            .with_initializer(self.initializer())
            .init(device);
        let dense6 = LinearConfig::new(self.hidden_size, self.dense_width)
            .with_initializer(self.initializer())
            .init(device);
        let upconv7 = self.upconv(
            [self.seed_channels, self.upconv_channels],
            UPCONV7_KERNEL,
            geometry.upconv7,
            [self.upconv_size, self.upconv_size],
            device,
        );
        let upconv8 = self.upconv(
            [self.upconv_channels, self.output_depth],
            UPCONV8_KERNEL,
            geometry.upconv8,
            [self.output_height, self.output_width],
            device,
        );

        Ok(DecoderParams {
            dense5,
            dense6,
            upconv7,
            upconv8,
            seed_channels: self.seed_channels,
            seed_size:     self.seed_size,
        })
    }
}

/// Transposed convolution followed by an untied [C, H, W] bias.
#[derive(Module, Debug)]
pub struct UpConv<B: Backend> {
    pub deconv: ConvTranspose2d<B>,
    pub bias:   Param<Tensor<B, 3>>,
}

impl<B: Backend> UpConv<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.deconv.forward(x) + self.bias.val().unsqueeze::<4>()
    }

    fn parameter_shapes(&self, prefix: &str) -> ParameterShapes {
        vec![
            param_shape(format!("{prefix}.weight"), &self.deconv.weight),
            param_shape(format!("{prefix}.bias"), &self.bias),
        ]
    }
}

/// The decoder's four (weight, bias) pairs plus the unflatten geometry.
#[derive(Module, Debug)]
pub struct DecoderParams<B: Backend> {
    pub dense5:    Linear<B>,
    pub dense6:    Linear<B>,
    pub upconv7:   UpConv<B>,
    pub upconv8:   UpConv<B>,
    seed_channels: usize,
    seed_size:     usize,
}

impl<B: Backend> DecoderParams<B> {
    /// latent: [batch, representation_size] → images: [batch, depth, height, width]
    pub fn forward(&self, latent: Tensor<B, 2>) -> Tensor<B, 4> {
        let x = relu(self.dense5.forward(latent));
        let x = relu(self.dense6.forward(x));

        let [batch, _] = x.dims();
        let x = x.reshape([batch, self.seed_channels, self.seed_size, self.seed_size]);

        let x = relu(self.upconv7.forward(x));
        self.upconv8.forward(x)
    }

    pub fn parameter_shapes(&self) -> ParameterShapes {
        [
            linear_shapes("dense5", &self.dense5),
            linear_shapes("dense6", &self.dense6),
            self.upconv7.parameter_shapes("upconv7"),
            self.upconv8.parameter_shapes("upconv8"),
        ]
        .concat()
    }
}

// ─── Decoder capability ───────────────────────────────────────────────────────
/// Anything that turns latent vectors into images.
pub trait Decoder<B: Backend> {
    /// latent: [batch, representation_size] → raw (unnormalised) images
    fn decode(&self, latent: Tensor<B, 2>) -> Tensor<B, 4>;
}

/// A decoder that allocated its own parameters.
#[derive(Debug, Clone)]
pub struct StandaloneDecoder<B: Backend> {
    params: DecoderParams<B>,
}

/// A decoder running on parameters owned elsewhere.
#[derive(Debug, Clone)]
pub struct SharedDecoder<B: Backend> {
    params: DecoderParams<B>,
}

impl<B: Backend> Decoder<B> for StandaloneDecoder<B> {
    fn decode(&self, latent: Tensor<B, 2>) -> Tensor<B, 4> {
        self.params.forward(latent)
    }
}

impl<B: Backend> Decoder<B> for SharedDecoder<B> {
    fn decode(&self, latent: Tensor<B, 2>) -> Tensor<B, 4> {
        self.params.forward(latent)
    }
}

/// Allocate fresh decoder parameters. The returned handle and the
/// decoder refer to the same tensors.
pub fn new_decoder<B: Backend>(
    config: &DecoderConfig,
    device: &B::Device,
) -> Result<(StandaloneDecoder<B>, DecoderParams<B>), ConfigError> {
    let params = config.init_params(device)?;
    Ok((StandaloneDecoder { params: params.clone() }, params))
}

/// Build a decoder on top of existing parameters, verbatim.
/// The parameters must have exactly the shapes `config` describes.
pub fn shared_decoder<B: Backend>(
    config: &DecoderConfig,
    params: DecoderParams<B>,
) -> Result<SharedDecoder<B>, ConfigError> {
    config.validate()?;
    if let Some(m) = first_mismatch(&config.expected_shapes(), &params.parameter_shapes()) {
        return Err(ConfigError::SharedShapeMismatch { name: m.name, expected: m.expected, found: m.found });
    }
    Ok(SharedDecoder { params })
}
