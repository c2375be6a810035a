//! Node function types.
//!
//! Every node gene carries an [`Activation`]. Substrate networks usually use a
//! single squashing function, while CPPNs mix periodic and symmetric functions
//! so that geometric queries produce regular connectivity patterns.

use serde::{Deserialize, Serialize};

/// Function applied to the summed input of a neuron.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Activation {
    /// f(x) = x
    Identity,
    /// f(x) = 1 / (1 + e^(-x))
    Sigmoid,
    /// f(x) = tanh(x)
    #[default]
    Tanh,
    /// f(x) = max(0, x)
    ReLU,
    /// f(x) = sin(x)
    Sine,
    /// f(x) = cos(x)
    Cosine,
    /// f(x) = e^(-x^2)
    Gaussian,
    /// f(x) = |x|
    Abs,
    /// f(x) = 1 if x > 0 else 0
    Step,
}

impl Activation {
    /// Every supported function type.
    pub const ALL: [Self; 9] = [
        Self::Identity,
        Self::Sigmoid,
        Self::Tanh,
        Self::ReLU,
        Self::Sine,
        Self::Cosine,
        Self::Gaussian,
        Self::Abs,
        Self::Step,
    ];

    /// Function types useful for pattern-producing networks.
    pub const CPPN: [Self; 6] = [
        Self::Sigmoid,
        Self::Tanh,
        Self::Sine,
        Self::Cosine,
        Self::Gaussian,
        Self::Abs,
    ];

    /// Apply the function.
    ///
    /// NaN propagates unchanged. Infinite inputs map to the function's limit
    /// where one exists and to 0.0 for the periodic functions.
    #[inline]
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }

        match self {
            Self::Identity => x,
            Self::Sigmoid => 1.0 / (1.0 + (-x.clamp(-700.0, 700.0)).exp()),
            Self::Tanh => x.tanh(),
            Self::ReLU => x.max(0.0),
            Self::Sine | Self::Cosine if x.is_infinite() => 0.0,
            Self::Sine => x.sin(),
            Self::Cosine => x.cos(),
            Self::Gaussian => {
                if x.abs() > 38.0 {
                    0.0
                } else {
                    (-x * x).exp()
                }
            }
            Self::Abs => x.abs(),
            Self::Step => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Closed range of values the function can produce.
    #[must_use]
    pub const fn output_range(self) -> (f64, f64) {
        match self {
            Self::Identity => (f64::NEG_INFINITY, f64::INFINITY),
            Self::Sigmoid | Self::Gaussian | Self::Step => (0.0, 1.0),
            Self::Tanh | Self::Sine | Self::Cosine => (-1.0, 1.0),
            Self::ReLU | Self::Abs => (0.0, f64::INFINITY),
        }
    }
}
