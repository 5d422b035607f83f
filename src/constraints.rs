//! # Constraints operator
//!
//! Reparameterization between unconstrained optimizer variables and bounded physical
//! parameters. Each input tensor pairs with one [`Bound`]; bounded variants map the whole real
//! line into the allowed interval (sigmoid for two-sided bounds, softplus for one-sided), and
//! [`ConstraintsOp::inverse`] is the exact mathematical inverse, so projecting an initial guess
//! into the unconstrained domain and transforming back reproduces it.
//!
//! The transform kernels operate elementwise and are numerically stable over the full `f64`
//! range: the sigmoid branches on sign, softplus uses the shifted `ln_1p` form, and the
//! softplus inverse is expressed through `exp_m1` so small magnitudes keep their precision.

use crate::mrkit_errors::MrkitError;
use crate::tensor::Tensor;

// -------------------------------------------------------------------------------------------------
// Bounds
// -------------------------------------------------------------------------------------------------

/// Constraint attached to one parameter tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// Confined to the open interval `(lower, upper)`.
    Range { lower: f64, upper: f64 },
    /// Bounded below: values stay above `lower`.
    LowerOnly { lower: f64 },
    /// Bounded above: values stay below `upper`.
    UpperOnly { upper: f64 },
    /// No constraint; the tensor passes through unchanged.
    Unbounded,
}

impl Bound {
    /// Check the bound values against their domains.
    ///
    /// Every named bound must be finite (NaN and infinities rejected), and a range must be
    /// properly ordered with `lower < upper`. `index` is the position of this bound in the
    /// operator and only feeds the error message.
    fn validate(&self, index: usize) -> Result<(), MrkitError> {
        match *self {
            Bound::Range { lower, upper } => {
                if !lower.is_finite() || !upper.is_finite() {
                    return Err(MrkitError::InvalidParameter(format!(
                        "bound {index}: range bounds must be finite, got ({lower}, {upper})"
                    )));
                }
                if lower >= upper {
                    return Err(MrkitError::InvalidParameter(format!(
                        "bound {index}: range bounds must satisfy lower < upper, got ({lower}, {upper})"
                    )));
                }
            }
            Bound::LowerOnly { lower } => {
                if !lower.is_finite() {
                    return Err(MrkitError::InvalidParameter(format!(
                        "bound {index}: lower bound must be finite, got {lower}"
                    )));
                }
            }
            Bound::UpperOnly { upper } => {
                if !upper.is_finite() {
                    return Err(MrkitError::InvalidParameter(format!(
                        "bound {index}: upper bound must be finite, got {upper}"
                    )));
                }
            }
            Bound::Unbounded => {}
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------
// The operator
// -------------------------------------------------------------------------------------------------

/// Elementwise constraint transform over an ordered collection of parameter tensors.
///
/// Input `i` is transformed according to bound `i`; inputs beyond the bound list pass through
/// unchanged, as do inputs whose bound is [`Bound::Unbounded`]. Validation is eager: a value of
/// this type always holds well-formed bounds and positive betas, so the transforms themselves
/// cannot fail.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintsOp {
    bounds: Vec<Bound>,
    beta_sigmoid: f64,
    beta_softplus: f64,
}

impl ConstraintsOp {
    /// Build the operator.
    ///
    /// Arguments
    /// ---------
    /// * `bounds`: one bound per parameter tensor, in input order.
    /// * `beta_sigmoid`: steepness of the two-sided sigmoid transform, finite and positive.
    /// * `beta_softplus`: steepness of the one-sided softplus transform, finite and positive.
    ///
    /// Return
    /// ------
    /// * The operator, or [`MrkitError::InvalidParameter`] for a non-positive beta or a
    ///   malformed bound.
    pub fn new(
        bounds: Vec<Bound>,
        beta_sigmoid: f64,
        beta_softplus: f64,
    ) -> Result<ConstraintsOp, MrkitError> {
        if !beta_sigmoid.is_finite() || beta_sigmoid <= 0.0 {
            return Err(MrkitError::InvalidParameter(format!(
                "beta_sigmoid must be finite and positive, got {beta_sigmoid}"
            )));
        }
        if !beta_softplus.is_finite() || beta_softplus <= 0.0 {
            return Err(MrkitError::InvalidParameter(format!(
                "beta_softplus must be finite and positive, got {beta_softplus}"
            )));
        }
        for (index, bound) in bounds.iter().enumerate() {
            bound.validate(index)?;
        }
        Ok(ConstraintsOp {
            bounds,
            beta_sigmoid,
            beta_softplus,
        })
    }

    /// The bounds, in input order.
    pub fn bounds(&self) -> &[Bound] {
        &self.bounds
    }

    /// Map unconstrained inputs into their bounded ranges.
    ///
    /// Integer tensors hitting a bounded variant are promoted to `f32`; unbounded and surplus
    /// inputs are returned unchanged, dtype included.
    pub fn apply(&self, inputs: &[Tensor]) -> Vec<Tensor> {
        inputs
            .iter()
            .enumerate()
            .map(|(index, x)| match self.bound_for(index) {
                Bound::Range { lower, upper } => map_float(x, |v| {
                    lower + (upper - lower) * sigmoid(self.beta_sigmoid * v)
                }),
                Bound::LowerOnly { lower } => {
                    map_float(x, |v| lower + softplus(v, self.beta_softplus))
                }
                Bound::UpperOnly { upper } => {
                    map_float(x, |v| upper - softplus(-v, self.beta_softplus))
                }
                Bound::Unbounded => x.clone(),
            })
            .collect()
    }

    /// Map bounded values back into the unconstrained domain.
    ///
    /// Exact inverse of [`ConstraintsOp::apply`] on its image; values outside a bound's range
    /// produce the usual non-finite results of the underlying logarithms.
    pub fn inverse(&self, inputs: &[Tensor]) -> Vec<Tensor> {
        inputs
            .iter()
            .enumerate()
            .map(|(index, y)| match self.bound_for(index) {
                Bound::Range { lower, upper } => map_float(y, |v| {
                    logit((v - lower) / (upper - lower)) / self.beta_sigmoid
                }),
                Bound::LowerOnly { lower } => {
                    map_float(y, |v| softplus_inverse(v - lower, self.beta_softplus))
                }
                Bound::UpperOnly { upper } => {
                    map_float(y, |v| -softplus_inverse(upper - v, self.beta_softplus))
                }
                Bound::Unbounded => y.clone(),
            })
            .collect()
    }

    fn bound_for(&self, index: usize) -> Bound {
        self.bounds.get(index).copied().unwrap_or(Bound::Unbounded)
    }
}

// -------------------------------------------------------------------------------------------------
// Scalar kernels
// -------------------------------------------------------------------------------------------------

/// Apply a scalar kernel elementwise, promoting integer storage to `f32`.
fn map_float(tensor: &Tensor, f: impl Fn(f64) -> f64) -> Tensor {
    match tensor {
        Tensor::F32(a) => Tensor::F32(a.mapv(|v| f(f64::from(v)) as f32)),
        Tensor::F64(a) => Tensor::F64(a.mapv(f)),
        Tensor::I32(a) => Tensor::F32(a.mapv(|v| f(f64::from(v)) as f32)),
    }
}

/// Logistic function, branched on sign so neither branch exponentiates a large positive value.
fn sigmoid(t: f64) -> f64 {
    if t >= 0.0 {
        1.0 / (1.0 + (-t).exp())
    } else {
        let e = t.exp();
        e / (1.0 + e)
    }
}

/// Inverse of the logistic function on (0, 1).
fn logit(p: f64) -> f64 {
    p.ln() - (-p).ln_1p()
}

/// Softplus with steepness `beta`: `ln(1 + exp(beta x)) / beta`, in the shifted form
/// `x + ln_1p(exp(-beta x)) / beta` for positive arguments.
fn softplus(x: f64, beta: f64) -> f64 {
    let t = beta * x;
    if t > 0.0 {
        x + (-t).exp().ln_1p() / beta
    } else {
        t.exp().ln_1p() / beta
    }
}

/// Inverse of [`softplus`] on (0, ∞): `y + ln(-expm1(-beta y)) / beta`.
fn softplus_inverse(y: f64, beta: f64) -> f64 {
    y + (-(-beta * y).exp_m1()).ln() / beta
}

#[cfg(test)]
mod constraints_test {
    use super::*;
    use crate::tensor::DType;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn values(tensor: &Tensor) -> Vec<f64> {
        tensor.f64_array().iter().copied().collect()
    }

    #[test]
    fn test_construction_rejects_bad_parameters() {
        assert!(matches!(
            ConstraintsOp::new(vec![], 0.0, 1.0),
            Err(MrkitError::InvalidParameter(_))
        ));
        assert!(matches!(
            ConstraintsOp::new(vec![], 1.0, f64::NAN),
            Err(MrkitError::InvalidParameter(_))
        ));
        assert!(matches!(
            ConstraintsOp::new(
                vec![Bound::Range {
                    lower: f64::NAN,
                    upper: 1.0
                }],
                1.0,
                1.0
            ),
            Err(MrkitError::InvalidParameter(_))
        ));
        assert!(matches!(
            ConstraintsOp::new(
                vec![Bound::Range {
                    lower: 2.0,
                    upper: 2.0
                }],
                1.0,
                1.0
            ),
            Err(MrkitError::InvalidParameter(_))
        ));
        assert!(matches!(
            ConstraintsOp::new(
                vec![Bound::LowerOnly {
                    lower: f64::NEG_INFINITY
                }],
                1.0,
                1.0
            ),
            Err(MrkitError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_range_output_respects_bounds() {
        let op = ConstraintsOp::new(
            vec![Bound::Range {
                lower: -1.0,
                upper: 2.0,
            }],
            1.0,
            1.0,
        )
        .unwrap();
        let moderate = Tensor::from(array![-20.0_f64, -1.0, 0.0, 1.0, 20.0].into_dyn());
        let out = &op.apply(&[moderate])[0];
        for v in values(out) {
            assert!(v > -1.0 && v < 2.0, "value {v} escaped the bounds");
        }
        // Zero maps to the interval midpoint.
        assert_abs_diff_eq!(values(out)[2], 0.5, epsilon = 1e-12);

        // Far in the tails the sigmoid saturates; the output may round onto the boundary
        // itself but never beyond it and never to a non-finite value.
        let extreme = Tensor::from(array![-1000.0_f64, 1000.0].into_dyn());
        for v in values(&op.apply(&[extreme])[0]) {
            assert!(v.is_finite());
            assert!((-1.0..=2.0).contains(&v));
        }
    }

    #[test]
    fn test_round_trip_all_variants() {
        let op = ConstraintsOp::new(
            vec![
                Bound::Range {
                    lower: -1.0,
                    upper: 2.0,
                },
                Bound::LowerOnly { lower: 3.0 },
                Bound::UpperOnly { upper: -0.5 },
                Bound::Unbounded,
            ],
            2.5,
            2.0,
        )
        .unwrap();
        let x = array![-3.0_f64, -0.7, 0.0, 1.3, 4.0].into_dyn();
        let inputs = vec![
            Tensor::from(x.clone()),
            Tensor::from(x.clone()),
            Tensor::from(x.clone()),
            Tensor::from(x),
        ];
        let transformed = op.apply(&inputs);
        let recovered = op.inverse(&transformed);
        for (before, after) in inputs.iter().zip(recovered.iter()) {
            for (b, a) in values(before).into_iter().zip(values(after)) {
                assert_abs_diff_eq!(b, a, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_surplus_and_unbounded_pass_through() {
        let op = ConstraintsOp::new(vec![Bound::Unbounded], 1.0, 1.0).unwrap();
        let ints = Tensor::from(array![1_i32, 2, 3].into_dyn());
        let floats = Tensor::from(array![0.5_f64].into_dyn());
        let out = op.apply(&[ints.clone(), floats.clone()]);
        // Bound 0 is unbounded, input 1 has no bound at all; both keep value and dtype.
        assert_eq!(out[0], ints);
        assert_eq!(out[1], floats);
    }

    #[test]
    fn test_bounded_integers_promote() {
        let op = ConstraintsOp::new(vec![Bound::LowerOnly { lower: 0.0 }], 1.0, 1.0).unwrap();
        let ints = Tensor::from(array![0_i32, 1, 2].into_dyn());
        let out = &op.apply(&[ints])[0];
        assert_eq!(out.dtype(), DType::F32);
        for v in values(out) {
            assert!(v > 0.0);
        }
    }

    #[test]
    fn test_scalar_kernels() {
        assert_abs_diff_eq!(sigmoid(0.0), 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(sigmoid(700.0), 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(sigmoid(-700.0), 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(logit(0.5), 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(softplus(0.0, 1.0), std::f64::consts::LN_2, epsilon = 1e-15);

        // The inverse is exact for steepness away from 1 as well.
        for beta in [0.5, 1.0, 3.0] {
            for x in [-20.0, -2.0, -0.1, 0.0, 0.1, 2.0, 20.0] {
                let y = softplus(x, beta);
                assert_abs_diff_eq!(softplus_inverse(y, beta), x, epsilon = 1e-9);
            }
        }
    }
}
