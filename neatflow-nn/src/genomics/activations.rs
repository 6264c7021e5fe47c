use neatflow::NeatError;

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// An ActivationType represents the type
/// of activation function a node applies to
/// its aggregated, biased input.
///
/// Only the name is persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationType {
    // x
    Identity,
    // 1 / (1 + exp(-5x))
    Sigmoid,
    // tanh(2.5x)
    Tanh,
    // sin(5x)
    Sin,
    // exp(-5x²)
    Gauss,
    // max(x, 0)
    Relu,
    // x if x > 0, else exp(x) - 1
    Elu,
    // x if x > 0, else 0.005x
    Lelu,
    // scaled elu
    Selu,
    // 0.2 ln(1 + exp(5x))
    Softplus,
    // x clamped to [-1, 1]
    Clamped,
    // 1 / x
    Inv,
    // ln(x)
    Log,
    // exp(x)
    Exp,
    // |x|
    Abs,
    // max(0, 1 - |x|)
    Hat,
    // x²
    Square,
    // x³
    Cube,
}

impl ActivationType {
    /// Every activation function in the catalog.
    pub const ALL: [ActivationType; 18] = [
        ActivationType::Identity,
        ActivationType::Sigmoid,
        ActivationType::Tanh,
        ActivationType::Sin,
        ActivationType::Gauss,
        ActivationType::Relu,
        ActivationType::Elu,
        ActivationType::Lelu,
        ActivationType::Selu,
        ActivationType::Softplus,
        ActivationType::Clamped,
        ActivationType::Inv,
        ActivationType::Log,
        ActivationType::Exp,
        ActivationType::Abs,
        ActivationType::Hat,
        ActivationType::Square,
        ActivationType::Cube,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActivationType::Identity => "identity",
            ActivationType::Sigmoid => "sigmoid",
            ActivationType::Tanh => "tanh",
            ActivationType::Sin => "sin",
            ActivationType::Gauss => "gauss",
            ActivationType::Relu => "relu",
            ActivationType::Elu => "elu",
            ActivationType::Lelu => "lelu",
            ActivationType::Selu => "selu",
            ActivationType::Softplus => "softplus",
            ActivationType::Clamped => "clamped",
            ActivationType::Inv => "inv",
            ActivationType::Log => "log",
            ActivationType::Exp => "exp",
            ActivationType::Abs => "abs",
            ActivationType::Hat => "hat",
            ActivationType::Square => "square",
            ActivationType::Cube => "cube",
        }
    }

    /// Applies the function to `x`.
    ///
    /// Exponential functions clamp their argument so that
    /// the result stays finite for any finite input.
    ///
    /// # Examples
    /// ```
    /// use neatflow_nn::genomics::ActivationType;
    ///
    /// assert_eq!(ActivationType::Sigmoid.apply(0.0), 0.5);
    /// assert_eq!(ActivationType::Relu.apply(-3.0), 0.0);
    /// assert_eq!(ActivationType::Inv.apply(0.0), 0.0);
    /// assert!(ActivationType::Exp.apply(1e6).is_finite());
    /// ```
    pub fn apply(self, x: f64) -> f64 {
        match self {
            ActivationType::Identity => x,
            ActivationType::Sigmoid => 1.0 / (1.0 + (-(5.0 * x).clamp(-60.0, 60.0)).exp()),
            ActivationType::Tanh => (2.5 * x).clamp(-60.0, 60.0).tanh(),
            ActivationType::Sin => (5.0 * x).clamp(-60.0, 60.0).sin(),
            ActivationType::Gauss => {
                let x = x.clamp(-3.4, 3.4);
                (-5.0 * x * x).exp()
            }
            ActivationType::Relu => x.max(0.0),
            ActivationType::Elu => {
                if x > 0.0 {
                    x
                } else {
                    x.max(-60.0).exp() - 1.0
                }
            }
            ActivationType::Lelu => {
                if x > 0.0 {
                    x
                } else {
                    0.005 * x
                }
            }
            ActivationType::Selu => {
                const LAMBDA: f64 = 1.050_700_987_355_480_5;
                const ALPHA: f64 = 1.673_263_242_354_377_3;
                if x > 0.0 {
                    LAMBDA * x
                } else {
                    LAMBDA * ALPHA * (x.max(-60.0).exp() - 1.0)
                }
            }
            ActivationType::Softplus => 0.2 * (5.0 * x).clamp(-60.0, 60.0).exp().ln_1p(),
            ActivationType::Clamped => x.clamp(-1.0, 1.0),
            ActivationType::Inv => {
                if x == 0.0 {
                    0.0
                } else {
                    1.0 / x
                }
            }
            ActivationType::Log => x.max(1e-7).ln(),
            ActivationType::Exp => x.clamp(-60.0, 60.0).exp(),
            ActivationType::Abs => x.abs(),
            ActivationType::Hat => (1.0 - x.abs()).max(0.0),
            ActivationType::Square => x * x,
            ActivationType::Cube => x * x * x,
        }
    }
}

impl fmt::Display for ActivationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActivationType {
    type Err = NeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivationType::ALL
            .iter()
            .copied()
            .find(|a| a.name() == s)
            .ok_or_else(|| NeatError::configuration(format!("unknown activation function {:?}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for activation in ActivationType::ALL {
            assert_eq!(activation.to_string().parse::<ActivationType>(), Ok(activation));
            assert_eq!(
                serde_json::to_string(&activation).unwrap(),
                format!("\"{}\"", activation.name())
            );
        }
        assert!("swish".parse::<ActivationType>().is_err());
    }

    #[test]
    fn outputs_finite_for_extreme_inputs() {
        for activation in ActivationType::ALL {
            for x in [-1e9, -1.0, 0.0, 1.0, 1e9] {
                let y = activation.apply(x);
                if matches!(activation, ActivationType::Square | ActivationType::Cube) && x.abs() > 1.0 {
                    continue;
                }
                assert!(y.is_finite(), "{}({}) = {}", activation, x, y);
            }
        }
    }

    #[test]
    fn bounded_functions() {
        assert_eq!(ActivationType::Clamped.apply(4.0), 1.0);
        assert_eq!(ActivationType::Hat.apply(0.25), 0.75);
        assert_eq!(ActivationType::Gauss.apply(0.0), 1.0);
        assert!(ActivationType::Sigmoid.apply(100.0) <= 1.0);
        assert!(ActivationType::Tanh.apply(-100.0) >= -1.0);
    }
}
