//! LSTM (Long Short-Term Memory) layer
//!
//! Batched over samples, with back-propagation through time. Gate weights
//! are stored side by side in gate order input, forget, cell candidate,
//! output: `kernel` is `[input, 4 * hidden]` and `recurrent` is
//! `[hidden, 4 * hidden]`.

use ndarray::{s, Array1, Array2, ArrayView2, ArrayView3, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Single LSTM layer returning the last hidden state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmLayer {
    pub input_size: usize,
    pub hidden_size: usize,
    pub(crate) kernel: Array2<f64>,
    pub(crate) recurrent: Array2<f64>,
    pub(crate) bias: Array1<f64>,
}

/// Activations of one time step, kept for the backward pass
#[derive(Debug, Clone)]
struct StepCache {
    x: Array2<f64>,
    h_prev: Array2<f64>,
    c_prev: Array2<f64>,
    i: Array2<f64>,
    f: Array2<f64>,
    g: Array2<f64>,
    o: Array2<f64>,
    c: Array2<f64>,
    tanh_c: Array2<f64>,
}

/// Forward trace of a whole sequence
#[derive(Debug, Clone)]
pub struct LstmCache {
    steps: Vec<StepCache>,
}

/// Gradients with the same shapes as the layer parameters
#[derive(Debug, Clone)]
pub struct LstmGradients {
    pub kernel: Array2<f64>,
    pub recurrent: Array2<f64>,
    pub bias: Array1<f64>,
}

impl LstmLayer {
    /// Glorot-uniform weights, zero bias with the forget gate bias set to 1
    pub fn new<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let gates = 4 * hidden_size;
        let kernel_limit = (6.0 / (input_size + gates) as f64).sqrt();
        let recurrent_limit = (6.0 / (hidden_size + gates) as f64).sqrt();

        let mut bias = Array1::zeros(gates);
        bias.slice_mut(s![hidden_size..2 * hidden_size]).fill(1.0);

        Self {
            input_size,
            hidden_size,
            kernel: Array2::random_using(
                (input_size, gates),
                Uniform::new(-kernel_limit, kernel_limit),
                rng,
            ),
            recurrent: Array2::random_using(
                (hidden_size, gates),
                Uniform::new(-recurrent_limit, recurrent_limit),
                rng,
            ),
            bias,
        }
    }

    fn step(&self, x: ArrayView2<'_, f64>, h_prev: &Array2<f64>, c_prev: &Array2<f64>) -> StepCache {
        let hs = self.hidden_size;
        let z = x.dot(&self.kernel) + h_prev.dot(&self.recurrent) + &self.bias;

        let i = sigmoid(z.slice(s![.., 0..hs]));
        let f = sigmoid(z.slice(s![.., hs..2 * hs]));
        let g = z.slice(s![.., 2 * hs..3 * hs]).mapv(f64::tanh);
        let o = sigmoid(z.slice(s![.., 3 * hs..]));

        let c = &f * c_prev + &i * &g;
        let tanh_c = c.mapv(f64::tanh);

        StepCache {
            x: x.to_owned(),
            h_prev: h_prev.clone(),
            c_prev: c_prev.clone(),
            i,
            f,
            g,
            o,
            c,
            tanh_c,
        }
    }

    /// Last hidden state for a batch `[batch, seq_len, input]` -> `[batch, hidden]`
    pub fn forward(&self, x: ArrayView3<'_, f64>) -> Array2<f64> {
        let batch = x.shape()[0];
        let mut h = Array2::zeros((batch, self.hidden_size));
        let mut c = Array2::zeros((batch, self.hidden_size));

        for t in 0..x.shape()[1] {
            let step = self.step(x.slice(s![.., t, ..]), &h, &c);
            h = &step.o * &step.tanh_c;
            c = step.c;
        }

        h
    }

    /// Like `forward`, also returning the trace needed by `backward`
    pub fn forward_train(&self, x: ArrayView3<'_, f64>) -> (Array2<f64>, LstmCache) {
        let batch = x.shape()[0];
        let mut h = Array2::zeros((batch, self.hidden_size));
        let mut c = Array2::zeros((batch, self.hidden_size));
        let mut steps = Vec::with_capacity(x.shape()[1]);

        for t in 0..x.shape()[1] {
            let step = self.step(x.slice(s![.., t, ..]), &h, &c);
            h = &step.o * &step.tanh_c;
            c = step.c.clone();
            steps.push(step);
        }

        (h, LstmCache { steps })
    }

    /// Back-propagation through time from the gradient of the last hidden state
    pub fn backward(&self, cache: &LstmCache, d_hidden: &Array2<f64>) -> LstmGradients {
        let hs = self.hidden_size;
        let batch = d_hidden.nrows();

        let mut grads = LstmGradients {
            kernel: Array2::zeros(self.kernel.raw_dim()),
            recurrent: Array2::zeros(self.recurrent.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
        };

        let mut dh = d_hidden.clone();
        let mut dc = Array2::<f64>::zeros((batch, hs));
        let mut dz = Array2::<f64>::zeros((batch, 4 * hs));

        for step in cache.steps.iter().rev() {
            let d_o = &dh * &step.tanh_c;
            dc = dc + &dh * &step.o * &step.tanh_c.mapv(|t| 1.0 - t * t);

            let d_i = &dc * &step.g;
            let d_f = &dc * &step.c_prev;
            let d_g = &dc * &step.i;

            dz.slice_mut(s![.., 0..hs])
                .assign(&(d_i * &step.i.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![.., hs..2 * hs])
                .assign(&(d_f * &step.f.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![.., 2 * hs..3 * hs])
                .assign(&(d_g * &step.g.mapv(|v| 1.0 - v * v)));
            dz.slice_mut(s![.., 3 * hs..])
                .assign(&(d_o * &step.o.mapv(|v| v * (1.0 - v))));

            grads.kernel += &step.x.t().dot(&dz);
            grads.recurrent += &step.h_prev.t().dot(&dz);
            grads.bias += &dz.sum_axis(Axis(0));

            dh = dz.dot(&self.recurrent.t());
            dc = &dc * &step.f;
        }

        grads
    }

    /// `coef * (|kernel|² + |recurrent|²)`
    pub fn l2_penalty(&self, coef: f64) -> f64 {
        coef * (self.kernel.mapv(|w| w * w).sum() + self.recurrent.mapv(|w| w * w).sum())
    }

    pub fn num_parameters(&self) -> usize {
        self.kernel.len() + self.recurrent.len() + self.bias.len()
    }
}

fn sigmoid(z: ArrayView2<'_, f64>) -> Array2<f64> {
    z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
}
