//! Classifier boundary for the metamorph-nn driver.
//!
//! The agent only needs two things from a classifier: something that can
//! be trained on `(features, response)` pairs, and something that maps a
//! feature vector to a distribution over the [`NUM_RESPONSES`] responses.
//! Features are a descriptor's flattened densities, in the order produced
//! by [`Morphognostic::flatten`]; training and inference must agree on it.
//!
//! [`MlpTrainer`] is the reference implementation: one sigmoid hidden layer,
//! a softmax output, trained by per-sample gradient descent with momentum.
//!
//! [`Morphognostic::flatten`]: pufferfish_morphognostic::Morphognostic::flatten

use std::fmt;

use pufferfish_types::{NUM_RESPONSES, Response};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::ClassifierConfig;

/// Half-width of the uniform range initial weights are drawn from.
const INIT_WEIGHT_RANGE: f32 = 0.5;

/// Errors raised by classifier training or prediction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    /// Training was asked to learn from nothing.
    #[error("no training samples")]
    NoSamples,

    /// A feature vector has the wrong length.
    #[error("expected {expected} features, got {actual}")]
    FeatureLength {
        /// Length the classifier was trained on.
        expected: usize,
        /// Length supplied.
        actual: usize,
    },

    /// Training diverged.
    #[error("training diverged at epoch {epoch}")]
    Diverged {
        /// Epoch at which a non-finite weight appeared.
        epoch: usize,
    },
}

/// One labeled example.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    /// Flattened descriptor densities.
    pub features: Vec<f32>,
    /// Response taken in that context.
    pub response: Response,
}

/// A trained model mapping features to a response distribution.
pub trait Classifier: fmt::Debug + Send {
    /// Probability of each response, indexed by response code.
    fn predict(&self, features: &[f32]) -> Result<Vec<f32>, ClassifierError>;
}

/// Something that can fit a [`Classifier`] to samples.
pub trait ClassifierTrainer {
    /// Train on `samples`.
    fn train(&self, samples: &[TrainingSample]) -> Result<Box<dyn Classifier>, ClassifierError>;
}

/// The response with the highest probability; lowest code wins ties.
pub fn most_likely(distribution: &[f32]) -> Response {
    let mut best = (0_usize, f32::NEG_INFINITY);
    for (index, &p) in distribution.iter().enumerate() {
        if p > best.1 {
            best = (index, p);
        }
    }
    u8::try_from(best.0)
        .ok()
        .and_then(Response::from_code)
        .unwrap_or_default()
}

/// A one-hidden-layer perceptron.
///
/// Each weight row ends with its bias.
#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    inputs: usize,
    hidden: usize,
    hidden_weights: Vec<f32>,
    output_weights: Vec<f32>,
}

impl Mlp {
    fn random<R: Rng + ?Sized>(inputs: usize, hidden: usize, rng: &mut R) -> Self {
        let hidden_len = hidden.saturating_mul(inputs.saturating_add(1));
        let output_len = NUM_RESPONSES.saturating_mul(hidden.saturating_add(1));
        let mut init = |len: usize| -> Vec<f32> {
            (0..len)
                .map(|_| rng.random_range(-INIT_WEIGHT_RANGE..INIT_WEIGHT_RANGE))
                .collect()
        };
        let hidden_weights = init(hidden_len);
        let output_weights = init(output_len);
        Self {
            inputs,
            hidden,
            hidden_weights,
            output_weights,
        }
    }

    /// Number of input features.
    pub const fn inputs(&self) -> usize {
        self.inputs
    }

    /// Run the network, filling `activations` with hidden outputs and
    /// returning the softmax distribution.
    // Weight rows are `inputs + 1` and `hidden + 1` wide by construction.
    #[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
    fn forward(&self, features: &[f32], activations: &mut [f32]) -> [f32; NUM_RESPONSES] {
        let stride = self.inputs + 1;
        for (j, activation) in activations.iter_mut().enumerate() {
            let row = &self.hidden_weights[j * stride..(j + 1) * stride];
            let sum = row[self.inputs]
                + row
                    .iter()
                    .zip(features)
                    .map(|(w, x)| w * x)
                    .sum::<f32>();
            *activation = sigmoid(sum);
        }

        let stride = self.hidden + 1;
        let mut logits = [0.0_f32; NUM_RESPONSES];
        for (c, logit) in logits.iter_mut().enumerate() {
            let row = &self.output_weights[c * stride..(c + 1) * stride];
            *logit = row[self.hidden]
                + row
                    .iter()
                    .zip(activations.iter())
                    .map(|(w, h)| w * h)
                    .sum::<f32>();
        }
        softmax(&logits)
    }

    fn is_finite(&self) -> bool {
        self.hidden_weights
            .iter()
            .chain(&self.output_weights)
            .all(|w| w.is_finite())
    }
}

impl Classifier for Mlp {
    fn predict(&self, features: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        if features.len() != self.inputs {
            return Err(ClassifierError::FeatureLength {
                expected: self.inputs,
                actual: features.len(),
            });
        }
        let mut activations = vec![0.0; self.hidden];
        Ok(self.forward(features, &mut activations).to_vec())
    }
}

/// Trains an [`Mlp`] by per-sample gradient descent on cross-entropy.
#[derive(Debug, Clone, Default)]
pub struct MlpTrainer {
    config: ClassifierConfig,
}

impl MlpTrainer {
    /// Create a trainer with the given parameters.
    pub const fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Train and return the concrete network.
    #[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
    pub fn fit(&self, samples: &[TrainingSample]) -> Result<Mlp, ClassifierError> {
        let first = samples.first().ok_or(ClassifierError::NoSamples)?;
        let inputs = first.features.len();
        if let Some(bad) = samples.iter().find(|s| s.features.len() != inputs) {
            return Err(ClassifierError::FeatureLength {
                expected: inputs,
                actual: bad.features.len(),
            });
        }

        let ClassifierConfig {
            hidden_units: hidden,
            learning_rate,
            momentum,
            epochs,
            seed,
        } = self.config;
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut net = Mlp::random(inputs, hidden, &mut rng);
        let mut hidden_velocity = vec![0.0_f32; net.hidden_weights.len()];
        let mut output_velocity = vec![0.0_f32; net.output_weights.len()];
        let mut activations = vec![0.0_f32; hidden];
        let mut hidden_error = vec![0.0_f32; hidden];
        let mut order: Vec<usize> = (0..samples.len()).collect();

        info!(samples = samples.len(), inputs, hidden, epochs, "training classifier");

        for epoch in 0..epochs {
            order.shuffle(&mut rng);
            for &i in &order {
                let sample = &samples[i];
                let output = net.forward(&sample.features, &mut activations);

                // Softmax with cross-entropy: the output error is p - target.
                let mut output_error = output;
                output_error[sample.response.index()] -= 1.0;

                let stride = hidden + 1;
                for (j, error) in hidden_error.iter_mut().enumerate() {
                    let back: f32 = output_error
                        .iter()
                        .enumerate()
                        .map(|(c, e)| e * net.output_weights[c * stride + j])
                        .sum();
                    let h = activations[j];
                    *error = back * h * (1.0 - h);
                }

                for (c, e) in output_error.iter().enumerate() {
                    for j in 0..=hidden {
                        let input = if j == hidden { 1.0 } else { activations[j] };
                        let k = c * stride + j;
                        let step = -learning_rate * e * input + momentum * output_velocity[k];
                        output_velocity[k] = step;
                        net.output_weights[k] += step;
                    }
                }

                let stride = inputs + 1;
                for (j, e) in hidden_error.iter().enumerate() {
                    for x in 0..=inputs {
                        let input = if x == inputs { 1.0 } else { sample.features[x] };
                        let k = j * stride + x;
                        let step = -learning_rate * e * input + momentum * hidden_velocity[k];
                        hidden_velocity[k] = step;
                        net.hidden_weights[k] += step;
                    }
                }
            }
            if !net.is_finite() {
                return Err(ClassifierError::Diverged { epoch });
            }
            if epoch % 500 == 0 {
                debug!(epoch, "classifier epoch");
            }
        }

        let correct = samples
            .iter()
            .filter(|s| {
                net.predict(&s.features)
                    .is_ok_and(|p| most_likely(&p) == s.response)
            })
            .count();
        info!(correct, total = samples.len(), "classifier trained");
        Ok(net)
    }
}

impl ClassifierTrainer for MlpTrainer {
    fn train(&self, samples: &[TrainingSample]) -> Result<Box<dyn Classifier>, ClassifierError> {
        Ok(Box::new(self.fit(samples)?))
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(logits: &[f32; NUM_RESPONSES]) -> [f32; NUM_RESPONSES] {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut out = logits.map(|l| (l - max).exp());
    let total: f32 = out.iter().sum();
    if total > 0.0 {
        for p in &mut out {
            *p /= total;
        }
    }
    out
}
