//! Binarized VGG-style classifier for 32x32 RGB images.

use burn::{
    config::Config,
    module::Module,
    nn::{
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
    },
    prelude::Backend,
    tensor::Tensor,
};
use cifar_config::ModelHparams;

use crate::binary::{BinaryConv2d, BinaryConv2dConfig, BinaryLinear, BinaryLinearConfig, hard_tanh};

/// Side length of the input images.
pub const IMAGE_SIZE: usize = 32;
/// Number of CIFAR-10 classes.
pub const NUM_CLASSES: usize = 10;

#[derive(Config, Debug)]
pub struct BnnClassifierConfig {
    #[config(default = 10)]
    pub num_classes: usize,
    /// Channels of the first block; the three stages use 1x, 2x and 4x
    #[config(default = 64)]
    pub width: usize,
    #[config(default = 512)]
    pub hidden: usize,
    #[config(default = 0.2)]
    pub dropout: f64,
    #[config(default = true)]
    pub binarize: bool,
}

impl BnnClassifierConfig {
    #[must_use]
    pub fn from_hparams(hparams: &ModelHparams) -> Self {
        Self::new()
            .with_num_classes(NUM_CLASSES)
            .with_width(hparams.width)
            .with_hidden(hparams.hidden)
            .with_dropout(hparams.dropout)
            .with_binarize(hparams.binarize)
    }

    /// (channels_in, channels_out, pool) for each conv block.
    fn block_layout(&self) -> [(usize, usize, bool); 6] {
        let w = self.width;
        [
            (3, w, false),
            (w, w, true),
            (w, 2 * w, false),
            (2 * w, 2 * w, true),
            (2 * w, 4 * w, false),
            (4 * w, 4 * w, true),
        ]
    }

    /// Flattened feature size after the last block.
    fn features(&self) -> usize {
        let pools = self.block_layout().iter().filter(|(_, _, pool)| *pool).count();
        let side = IMAGE_SIZE >> pools;
        4 * self.width * side * side
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> BnnClassifier<B> {
        let blocks = self
            .block_layout()
            .into_iter()
            .enumerate()
            .map(|(i, (channels_in, channels_out, pool))| ConvBlock {
                // The stem sees raw pixels and keeps full precision
                conv: BinaryConv2dConfig::new(channels_in, channels_out)
                    .with_binarize(self.binarize && i > 0)
                    .init(device),
                pool: pool.then(|| MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init()),
                norm: BatchNormConfig::new(channels_out).init(device),
            })
            .collect();

        BnnClassifier {
            blocks,
            fc: BinaryLinearConfig::new(self.features(), self.hidden)
                .with_binarize(self.binarize)
                .init(device),
            fc_norm: BatchNormConfig::new(self.hidden).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            classifier: LinearConfig::new(self.hidden, self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: BinaryConv2d<B>,
    pub pool: Option<MaxPool2d>,
    pub norm: BatchNorm<B, 2>,
}

impl<B: Backend> ConvBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = match &self.pool {
            Some(pool) => pool.forward(x),
            None => x,
        };
        hard_tanh(self.norm.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct BnnClassifier<B: Backend> {
    pub blocks: Vec<ConvBlock<B>>,
    pub fc: BinaryLinear<B>,
    pub fc_norm: BatchNorm<B, 0>,
    pub dropout: Dropout,
    pub classifier: Linear<B>,
}

impl<B: Backend> BnnClassifier<B> {
    /// [batch, 3, 32, 32] -> logits [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images;
        for block in &self.blocks {
            x = block.forward(x);
        }

        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = hard_tanh(self.fc_norm.forward(self.fc.forward(x)));
        let x = self.dropout.forward(x);
        self.classifier.forward(x)
    }
}

#[cfg(all(test, feature = "cpu"))]
mod tests {
    use burn::backend::NdArray;

    use super::*;

    type B = NdArray;

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model = BnnClassifierConfig::new()
            .with_width(4)
            .with_hidden(16)
            .init::<B>(&device);
        let images = Tensor::<B, 4>::zeros([2, 3, IMAGE_SIZE, IMAGE_SIZE], &device);
        assert_eq!(model.forward(images).dims(), [2, NUM_CLASSES]);
    }

    #[test]
    fn test_feature_size() {
        let config = BnnClassifierConfig::new().with_width(8);
        assert_eq!(config.features(), 4 * 8 * 4 * 4);
    }

    #[test]
    fn test_stem_stays_full_precision() {
        let device = Default::default();
        let model = BnnClassifierConfig::new()
            .with_width(4)
            .with_hidden(8)
            .init::<B>(&device);
        assert!(!model.blocks[0].conv.binarize);
        assert!(model.blocks[1..].iter().all(|b| b.conv.binarize));
        assert!(model.fc.binarize);
    }

    #[test]
    fn test_from_hparams() {
        let hparams = ModelHparams {
            width: 16,
            hidden: 128,
            binarize: false,
            ..ModelHparams::default()
        };
        let config = BnnClassifierConfig::from_hparams(&hparams);
        assert_eq!(config.num_classes, NUM_CLASSES);
        assert_eq!(config.width, 16);
        assert_eq!(config.hidden, 128);
        assert!(!config.binarize);
    }
}
