//! Activation functions.
//!
//! A layer computes a pre-activation value `z = W x + b` and then applies an
//! activation function element-wise: `y = activation(z)`.
//!
//! Layers cache both `z` and `y` during the training forward pass, because the
//! derivatives here are not uniform about which one they need: sigmoid and tanh
//! are cheapest from `y`, while ReLU, ELU, softsign, softplus and arctan need `z`.
//!
//! Activations are selected per layer with a one-character kind code (see
//! [`Activation::from_code`]), so a whole network can be described by a short
//! string such as `"sss"`.

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
/// Element-wise activation function.
pub enum Activation {
    ArcTan,
    Elu { alpha: f64 },
    Identity,
    LeakyReLU { alpha: f64 },
    ReLU,
    SoftSign,
    Sigmoid,
    Tanh,
    SoftPlus,
}

impl Activation {
    /// Parse a single kind code.
    ///
    /// `alpha` is the ELU scale / leaky ReLU slope and is ignored by the other kinds.
    ///
    /// | code | kind       |
    /// |------|------------|
    /// | `a`  | arctan     |
    /// | `e`  | ELU        |
    /// | `i`  | identity   |
    /// | `l`  | leaky ReLU |
    /// | `r`  | ReLU       |
    /// | `o`  | softsign   |
    /// | `s`  | sigmoid    |
    /// | `t`  | tanh       |
    /// | `u`  | softplus   |
    pub fn from_code(code: char, alpha: f64) -> Result<Self> {
        let act = match code {
            'a' => Activation::ArcTan,
            'e' => Activation::Elu { alpha },
            'i' => Activation::Identity,
            'l' => Activation::LeakyReLU { alpha },
            'r' => Activation::ReLU,
            'o' => Activation::SoftSign,
            's' => Activation::Sigmoid,
            't' => Activation::Tanh,
            'u' => Activation::SoftPlus,
            other => return Err(Error::UnknownActivation(other)),
        };
        act.validate()?;
        Ok(act)
    }

    /// Parse one kind code per layer, e.g. `"ssts"`.
    pub fn parse_kinds(codes: &str, alpha: f64) -> Result<Vec<Self>> {
        codes.chars().map(|c| Self::from_code(c, alpha)).collect()
    }

    /// The kind code this activation was parsed from.
    pub fn code(self) -> char {
        match self {
            Activation::ArcTan => 'a',
            Activation::Elu { .. } => 'e',
            Activation::Identity => 'i',
            Activation::LeakyReLU { .. } => 'l',
            Activation::ReLU => 'r',
            Activation::SoftSign => 'o',
            Activation::Sigmoid => 's',
            Activation::Tanh => 't',
            Activation::SoftPlus => 'u',
        }
    }

    /// Validate activation parameters.
    pub fn validate(self) -> Result<()> {
        match self {
            Activation::Elu { alpha } | Activation::LeakyReLU { alpha } => {
                if !(alpha.is_finite() && alpha >= 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "activation alpha must be finite and >= 0, got {alpha}"
                    )));
                }
            }
            Activation::ArcTan
            | Activation::Identity
            | Activation::ReLU
            | Activation::SoftSign
            | Activation::Sigmoid
            | Activation::Tanh
            | Activation::SoftPlus => {}
        }

        Ok(())
    }

    #[inline]
    pub fn activate(self, x: f64) -> f64 {
        match self {
            Activation::ArcTan => x.atan(),
            Activation::Elu { alpha } => {
                if x >= 0.0 {
                    x
                } else {
                    alpha * x.exp_m1()
                }
            }
            Activation::Identity => x,
            Activation::LeakyReLU { alpha } => {
                if x >= 0.0 {
                    x
                } else {
                    alpha * x
                }
            }
            Activation::ReLU => x.max(0.0),
            Activation::SoftSign => x / (1.0 + x.abs()),
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => x.tanh(),
            Activation::SoftPlus => softplus(x),
        }
    }

    /// Derivative with respect to the pre-activation `x`.
    ///
    /// `y` must be `self.activate(x)`.
    #[inline]
    pub fn derive(self, x: f64, y: f64) -> f64 {
        match self {
            Activation::ArcTan => 1.0 / (x * x + 1.0),
            Activation::Elu { alpha } => {
                if x >= 0.0 {
                    1.0
                } else {
                    alpha * x.exp()
                }
            }
            Activation::Identity => 1.0,
            Activation::LeakyReLU { alpha } => {
                if x >= 0.0 {
                    1.0
                } else {
                    alpha
                }
            }
            Activation::ReLU => {
                if x >= 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::SoftSign => {
                let d = 1.0 + x.abs();
                1.0 / (d * d)
            }
            Activation::Sigmoid => y * (1.0 - y),
            Activation::Tanh => 1.0 - y * y,
            Activation::SoftPlus => sigmoid(x),
        }
    }
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

#[inline]
fn softplus(x: f64) -> f64 {
    // log(1 + e^x) without overflow for large x.
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    #[test]
    fn parses_every_supported_code() {
        let acts = Activation::parse_kinds("aeilrostu", 0.1).unwrap();
        assert_eq!(acts.len(), 9);
        let codes: String = acts.iter().map(|a| a.code()).collect();
        assert_eq!(codes, "aeilrostu");
    }

    #[test]
    fn unknown_code_is_a_config_error() {
        assert_eq!(
            Activation::from_code('g', 0.0),
            Err(Error::UnknownActivation('g'))
        );
        assert!(Activation::parse_kinds("ssx", 0.0).is_err());
    }

    #[test]
    fn alpha_must_be_finite_and_non_negative() {
        assert!(Activation::from_code('l', f64::NAN).is_err());
        assert!(Activation::from_code('e', -0.1).is_err());
        assert!(Activation::from_code('l', 0.1).is_ok());
        // Kinds without a coefficient ignore it.
        assert!(Activation::from_code('s', f64::NAN).is_ok());
    }

    #[test]
    fn sigmoid_basic_values() {
        assert_abs_diff_eq!(Activation::Sigmoid.activate(0.0), 0.5, epsilon = 1e-12);
        assert!(Activation::Sigmoid.activate(30.0) > 0.999);
        assert!(Activation::Sigmoid.activate(-30.0) < 0.001);
    }

    #[test]
    fn piecewise_kinds_switch_at_zero() {
        assert_eq!(Activation::ReLU.activate(-2.0), 0.0);
        assert_eq!(Activation::ReLU.derive(0.0, 0.0), 1.0);
        assert_eq!(Activation::ReLU.derive(-1.0, 0.0), 0.0);

        let leaky = Activation::LeakyReLU { alpha: 0.1 };
        assert_abs_diff_eq!(leaky.activate(-2.0), -0.2, epsilon = 1e-12);
        assert_eq!(leaky.derive(-2.0, -0.2), 0.1);

        let elu = Activation::Elu { alpha: 1.0 };
        assert_abs_diff_eq!(elu.activate(-1.0), (-1.0_f64).exp() - 1.0, epsilon = 1e-12);
        assert_eq!(elu.activate(3.0), 3.0);

        assert_abs_diff_eq!(Activation::SoftSign.activate(1.0), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(Activation::SoftSign.activate(-1.0), -0.5, epsilon = 1e-12);
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let kinds = [
            Activation::ArcTan,
            Activation::Elu { alpha: 0.7 },
            Activation::Identity,
            Activation::LeakyReLU { alpha: 0.2 },
            Activation::ReLU,
            Activation::SoftSign,
            Activation::Sigmoid,
            Activation::Tanh,
            Activation::SoftPlus,
        ];
        let eps = 1e-6;
        for act in kinds {
            for &x in &[-1.3, -0.4, 0.35, 1.7] {
                let numeric = (act.activate(x + eps) - act.activate(x - eps)) / (2.0 * eps);
                let analytic = act.derive(x, act.activate(x));
                assert_abs_diff_eq!(analytic, numeric, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn softplus_is_stable_for_large_inputs() {
        assert_abs_diff_eq!(Activation::SoftPlus.activate(800.0), 800.0, epsilon = 1e-9);
        assert!(Activation::SoftPlus.activate(-800.0) >= 0.0);
        assert_abs_diff_eq!(
            Activation::SoftPlus.activate(0.0),
            std::f64::consts::LN_2,
            epsilon = 1e-12
        );
    }
}
