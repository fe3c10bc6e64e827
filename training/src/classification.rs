use burn::{
    nn::loss::CrossEntropyLossConfig,
    prelude::*,
    tensor::backend::AutodiffBackend,
    train::{ClassificationOutput, TrainOutput, TrainStep, ValidStep},
};
use cifar_config::ModelHparams;
use cifar_core::{BnnClassifier, BnnClassifierConfig};
use cifar_data::CifarBatch;

/// The classifier as the learner sees it.
#[derive(Module, Debug)]
pub struct CifarClassifier<B: Backend> {
    pub bnn: BnnClassifier<B>,
}

impl<B: Backend> CifarClassifier<B> {
    pub fn new(hparams: &ModelHparams, device: &B::Device) -> Self {
        Self {
            bnn: BnnClassifierConfig::from_hparams(hparams).init(device),
        }
    }

    pub fn forward_classification(&self, batch: CifarBatch<B>) -> ClassificationOutput<B> {
        let device = self.bnn.classifier.weight.val().device();
        let images = batch.images.to_device(&device);
        let targets = batch.targets.to_device(&device);

        let output = self.bnn.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput {
            loss,
            output,
            targets,
        }
    }
}

impl<B: AutodiffBackend> TrainStep<CifarBatch<B>, ClassificationOutput<B>> for CifarClassifier<B> {
    fn step(&self, batch: CifarBatch<B>) -> TrainOutput<ClassificationOutput<B>> {
        let item = self.forward_classification(batch);
        let grads = item.loss.backward();

        TrainOutput::new(self, grads, item)
    }
}

impl<B: Backend> ValidStep<CifarBatch<B>, ClassificationOutput<B>> for CifarClassifier<B> {
    fn step(&self, batch: CifarBatch<B>) -> ClassificationOutput<B> {
        self.forward_classification(batch)
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::{Autodiff, NdArray};

    use super::*;

    fn small_hparams() -> ModelHparams {
        ModelHparams {
            width: 4,
            hidden: 16,
            ..ModelHparams::default()
        }
    }

    fn batch<B: Backend>(device: &B::Device) -> CifarBatch<B> {
        CifarBatch {
            images: Tensor::random(
                [2, 3, 32, 32],
                burn::tensor::Distribution::Normal(0.0, 1.0),
                device,
            ),
            targets: Tensor::from_ints([1, 9], device),
        }
    }

    #[test]
    fn test_forward_classification() {
        let device = Default::default();
        let model = CifarClassifier::<NdArray>::new(&small_hparams(), &device);
        let out = model.forward_classification(batch(&device));
        assert_eq!(out.output.dims(), [2, 10]);
        let loss: f32 = out.loss.into_scalar();
        assert!(loss.is_finite() && loss > 0.0);
    }

    #[test]
    fn test_train_step_produces_gradients() {
        let device = Default::default();
        let model = CifarClassifier::<Autodiff<NdArray>>::new(&small_hparams(), &device);
        let output = TrainStep::step(&model, batch(&device));
        assert_eq!(output.item.output.dims(), [2, 10]);
    }
}
