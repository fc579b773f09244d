//! Dense output layer
//!
//! Maps the LSTM hidden state to a single tanh-bounded unit:
//! `output = tanh(input * weights + bias)`.

use ndarray::{Array1, Array2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fully connected layer with tanh activation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Weight matrix (input_size x output_size)
    pub(crate) weights: Array2<f64>,
    /// Bias vector (output_size)
    pub(crate) biases: Array1<f64>,
    pub input_size: usize,
    pub output_size: usize,
}

/// Gradients of a dense layer and of its input
#[derive(Debug, Clone)]
pub struct DenseGradients {
    pub weights: Array2<f64>,
    pub biases: Array1<f64>,
    pub input: Array2<f64>,
}

impl DenseLayer {
    /// Xavier/Glorot initialization
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let limit = (6.0 / (input_size + output_size) as f64).sqrt();
        Self {
            weights: Array2::random_using((input_size, output_size), Uniform::new(-limit, limit), rng),
            biases: Array1::zeros(output_size),
            input_size,
            output_size,
        }
    }

    /// Activations `[batch, output_size]`
    pub fn forward(&self, input: &Array2<f64>) -> Array2<f64> {
        (input.dot(&self.weights) + &self.biases).mapv(f64::tanh)
    }

    /// Back-propagates `output_gradient` given the input and the activations
    /// produced by `forward`
    pub fn backward(
        &self,
        input: &Array2<f64>,
        output: &Array2<f64>,
        output_gradient: &Array2<f64>,
    ) -> DenseGradients {
        let delta = output_gradient * &output.mapv(|a| 1.0 - a * a);

        DenseGradients {
            weights: input.t().dot(&delta),
            biases: delta.sum_axis(Axis(0)),
            input: delta.dot(&self.weights.t()),
        }
    }

    pub fn num_parameters(&self) -> usize {
        self.weights.len() + self.biases.len()
    }
}

/// Inverted dropout mask: kept units are scaled by `1 / (1 - rate)`
pub fn dropout_mask<R: Rng + ?Sized>(dim: (usize, usize), rate: f64, rng: &mut R) -> Array2<f64> {
    if rate <= 0.0 {
        return Array2::ones(dim);
    }
    let keep = 1.0 / (1.0 - rate);
    Array2::from_shape_fn(dim, |_| if rng.gen::<f64>() >= rate { keep } else { 0.0 })
}
