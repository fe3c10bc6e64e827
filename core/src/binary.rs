//! Sign-binarized layers trained with a straight-through estimator.

use burn::{
    config::Config,
    module::Module,
    nn::{
        Linear, LinearConfig, PaddingConfig2d,
        conv::{Conv2d, Conv2dConfig},
    },
    prelude::Backend,
    tensor::{Tensor, module::conv2d, ops::ConvOptions},
};

/// Replace values by their sign in the forward pass.
///
/// The backward pass sees the identity, so gradients reach the latent
/// full-precision values unchanged.
pub fn binarize<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    let hard = x.clone().sign();
    x.clone() + (hard - x).detach()
}

/// Hard tanh. Clipping zeroes the gradient of saturated units, which turns
/// `binarize(hard_tanh(x))` into the clipped straight-through estimator.
pub fn hard_tanh<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    x.clamp(-1.0, 1.0)
}

/// 3x3 same-padding convolution whose weights and inputs can be binarized.
#[derive(Module, Debug)]
pub struct BinaryConv2d<B: Backend> {
    pub conv: Conv2d<B>,
    pub binarize: bool,
}

#[derive(Config, Debug)]
pub struct BinaryConv2dConfig {
    pub channels_in: usize,
    pub channels_out: usize,
    #[config(default = true)]
    pub binarize: bool,
}

impl BinaryConv2dConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BinaryConv2d<B> {
        let conv = Conv2dConfig::new([self.channels_in, self.channels_out], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);
        BinaryConv2d {
            conv,
            binarize: self.binarize,
        }
    }
}

impl<B: Backend> BinaryConv2d<B> {
    /// [batch, channels_in, h, w] -> [batch, channels_out, h, w]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        if !self.binarize {
            return self.conv.forward(x);
        }
        let weight = binarize(self.conv.weight.val());
        conv2d(
            binarize(x),
            weight,
            None,
            ConvOptions::new([1, 1], [1, 1], [1, 1], 1),
        )
    }
}

/// Dense layer whose weights and inputs can be binarized.
#[derive(Module, Debug)]
pub struct BinaryLinear<B: Backend> {
    pub linear: Linear<B>,
    pub binarize: bool,
}

#[derive(Config, Debug)]
pub struct BinaryLinearConfig {
    pub d_input: usize,
    pub d_output: usize,
    #[config(default = true)]
    pub binarize: bool,
}

impl BinaryLinearConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BinaryLinear<B> {
        let linear = LinearConfig::new(self.d_input, self.d_output)
            .with_bias(false)
            .init(device);
        BinaryLinear {
            linear,
            binarize: self.binarize,
        }
    }
}

impl<B: Backend> BinaryLinear<B> {
    /// [batch, d_input] -> [batch, d_output]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        if !self.binarize {
            return self.linear.forward(x);
        }
        // Linear stores its weight as [d_input, d_output]
        let weight = binarize(self.linear.weight.val());
        binarize(x).matmul(weight)
    }
}
