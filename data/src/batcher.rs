use burn::{
    data::{
        dataloader::batcher::Batcher,
        dataset::vision::{Annotation, ImageDatasetItem, PixelDepth},
    },
    prelude::*,
};

/// Per-channel mean of the CIFAR-10 training set.
pub const CIFAR10_MEAN: [f32; 3] = [0.4914, 0.4822, 0.4465];
/// Per-channel standard deviation of the CIFAR-10 training set.
pub const CIFAR10_STD: [f32; 3] = [0.2470, 0.2435, 0.2616];

const SIDE: usize = 32;
const CHANNELS: usize = 3;

#[derive(Clone, Debug)]
pub struct CifarBatch<B: Backend> {
    /// [batch_size, 3, 32, 32], normalized
    pub images: Tensor<B, 4>,
    /// [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batches 32x32 RGB classification items.
#[derive(Clone, Debug, Default)]
pub struct CifarBatcher;

impl CifarBatcher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn pixel(p: &PixelDepth) -> f32 {
    match p {
        PixelDepth::U8(v) => f32::from(*v) / 255.0,
        PixelDepth::U16(v) => f32::from(*v) / 65535.0,
        PixelDepth::F32(v) => *v,
    }
}

impl<B: Backend> Batcher<B, ImageDatasetItem, CifarBatch<B>> for CifarBatcher {
    fn batch(&self, items: Vec<ImageDatasetItem>, device: &B::Device) -> CifarBatch<B> {
        let mut pixels = Vec::with_capacity(items.len() * SIDE * SIDE * CHANNELS);
        let mut labels = Vec::with_capacity(items.len());

        for item in &items {
            let Annotation::Label(label) = item.annotation else {
                tracing::warn!("skipping {}: not a classification item", item.image_path);
                continue;
            };
            if item.image.len() != SIDE * SIDE * CHANNELS {
                tracing::warn!(
                    "skipping {}: expected {SIDE}x{SIDE} RGB, got {} values",
                    item.image_path,
                    item.image.len()
                );
                continue;
            }
            pixels.extend(item.image.iter().map(pixel));
            labels.push(label as i64);
        }

        let batch_size = labels.len();
        // ImageFolderDataset stores pixels row-major with interleaved channels
        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, SIDE, SIDE, CHANNELS]).convert::<B::FloatElem>(),
            device,
        )
        .permute([0, 3, 1, 2]);

        let mean = Tensor::<B, 1>::from_floats(CIFAR10_MEAN, device).reshape([1, CHANNELS, 1, 1]);
        let std = Tensor::<B, 1>::from_floats(CIFAR10_STD, device).reshape([1, CHANNELS, 1, 1]);
        let images = (images - mean) / std;

        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [batch_size]).convert::<B::IntElem>(),
            device,
        );

        CifarBatch { images, targets }
    }
}
