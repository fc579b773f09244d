//! Optimization Algorithms
//!
//! Parameters are passed as `(parameter, gradient)` pairs of dynamic-rank
//! views, so one optimizer instance can drive every tensor of a model.
//! Per-tensor state is keyed by position in the slice, which must stay
//! stable across steps.

use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Zip};
use serde::{Deserialize, Serialize};

/// A parameter tensor and its gradient
pub type ParamGrad<'a> = (ArrayViewMutD<'a, f64>, ArrayViewD<'a, f64>);

/// Optimizer trait for parameter updates
pub trait Optimizer {
    /// Applies one update to every parameter
    fn step(&mut self, params: &mut [ParamGrad<'_>]);

    /// Reset optimizer state (for a new training run)
    fn reset(&mut self);
}

/// Adam optimizer (Adaptive Moment Estimation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    #[serde(skip)]
    t: i32,
    #[serde(skip)]
    m: Vec<ArrayD<f64>>,
    #[serde(skip)]
    v: Vec<ArrayD<f64>>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Number of steps taken so far
    pub fn steps(&self) -> i32 {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [ParamGrad<'_>]) {
        if self.m.len() != params.len() {
            self.m = params.iter().map(|(p, _)| ArrayD::zeros(p.raw_dim())).collect();
            self.v = params.iter().map(|(p, _)| ArrayD::zeros(p.raw_dim())).collect();
        }

        self.t += 1;
        let (b1, b2, eps, lr) = (self.beta1, self.beta2, self.epsilon, self.learning_rate);
        let bias1 = 1.0 - b1.powi(self.t);
        let bias2 = 1.0 - b2.powi(self.t);

        for ((param, grad), (m, v)) in params
            .iter_mut()
            .zip(self.m.iter_mut().zip(self.v.iter_mut()))
        {
            Zip::from(param)
                .and(&*grad)
                .and(m)
                .and(v)
                .for_each(|p, &g, m, v| {
                    *m = b1 * *m + (1.0 - b1) * g;
                    *v = b2 * *v + (1.0 - b2) * g * g;
                    let m_hat = *m / bias1;
                    let v_hat = *v / bias2;
                    *p -= lr * m_hat / (v_hat.sqrt() + eps);
                });
        }
    }

    fn reset(&mut self) {
        self.t = 0;
        self.m.clear();
        self.v.clear();
    }
}
