//! # K-space trajectory container
//!
//! The [`KTrajectory`] type stores the spatial-frequency coordinates visited during an MRI
//! acquisition as three coordinate arrays (kz, ky, kx), one per physical direction, laid out
//! over the logical axes `(other, k2, k1, k0)`: a free batch axis followed by the three
//! sampling axes. The arrays are kept mutually broadcast-compatible rather than materialized at
//! full size, so a Cartesian readout that only varies along k0 stays a single line no matter
//! how many phase-encoding steps surround it.
//!
//! Construction normalizes the inputs once: every axis whose values repeat within the
//! configured tolerance collapses to a broadcastable singleton (see [`crate::repeat`]), integer
//! inputs are promoted to floating point, and the joint broadcast shape is validated to have at
//! least 4 axes. After that the container is immutable; conversions hand out new instances.
//!
//! ## Overview
//!
//! - [`KTrajectory`]: validated construction from three arrays or one stacked tensor,
//!   broadcast-shape query, stacked export, dtype/layout conversion, classification
//! - [`TrajectoryOptions`]: the two tolerances attached to a trajectory
//! - [`traj_type`]: the classification flags and 3×3 type matrix
//! - [`calculators`]: acquisition-driven constructors for common sampling schemes
//!
//! ## See also
//!
//! * [`crate::tensor::Tensor`] – the dtype-tagged array type the container stores.
//! * [`crate::repeat::remove_repeat`] – the construction-time normalization step.

use crate::constants::{
    Shape, DEFAULT_GRID_DETECTION_TOLERANCE, DEFAULT_REPEAT_DETECTION_TOLERANCE,
    MIN_TRAJECTORY_RANK, STACKED_REPEAT_DETECTION_TOLERANCE,
};
use crate::mrkit_errors::MrkitError;
use crate::repeat::remove_repeat;
use crate::tensor::{broadcast_shapes, format_shape, DType, Tensor};

pub mod calculators;
pub mod traj_type;

use traj_type::{TrajType, TrajTypeMatrix};

// -------------------------------------------------------------------------------------------------
// Construction options
// -------------------------------------------------------------------------------------------------

/// Tolerances attached to a trajectory at construction time.
///
/// Both values are immutable configuration once the trajectory exists. The defaults differ
/// between the two construction paths: building from three coordinate arrays uses the loose
/// repeat tolerance, building from a stacked tensor uses the tight one (see
/// [`TrajectoryOptions::stacked`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryOptions {
    /// Maximum distance to the nearest integer for a sample to count as grid-aligned.
    pub grid_detection_tolerance: f64,
    /// Maximum spread for an axis to count as repeated and collapse to length 1.
    /// `None` disables repeat detection entirely.
    pub repeat_detection_tolerance: Option<f64>,
}

impl Default for TrajectoryOptions {
    fn default() -> Self {
        TrajectoryOptions {
            grid_detection_tolerance: DEFAULT_GRID_DETECTION_TOLERANCE,
            repeat_detection_tolerance: Some(DEFAULT_REPEAT_DETECTION_TOLERANCE),
        }
    }
}

impl TrajectoryOptions {
    /// Defaults for the stacked-tensor construction path.
    pub fn stacked() -> Self {
        TrajectoryOptions {
            grid_detection_tolerance: DEFAULT_GRID_DETECTION_TOLERANCE,
            repeat_detection_tolerance: Some(STACKED_REPEAT_DETECTION_TOLERANCE),
        }
    }

    /// Set the grid detection tolerance.
    pub fn with_grid_detection_tolerance(mut self, tolerance: f64) -> Self {
        self.grid_detection_tolerance = tolerance;
        self
    }

    /// Set the repeat detection tolerance, or disable repeat detection with `None`.
    pub fn with_repeat_detection_tolerance(mut self, tolerance: Option<f64>) -> Self {
        self.repeat_detection_tolerance = tolerance;
        self
    }

    /// Check both tolerances against their domains.
    fn validate(&self) -> Result<(), MrkitError> {
        if !self.grid_detection_tolerance.is_finite() || self.grid_detection_tolerance < 0.0 {
            return Err(MrkitError::InvalidParameter(format!(
                "grid detection tolerance must be finite and non-negative, got {}",
                self.grid_detection_tolerance
            )));
        }
        if let Some(tolerance) = self.repeat_detection_tolerance {
            if !tolerance.is_finite() || tolerance <= 0.0 {
                return Err(MrkitError::InvalidParameter(format!(
                    "repeat detection tolerance must be finite and positive, got {tolerance}"
                )));
            }
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------
// The container
// -------------------------------------------------------------------------------------------------

/// Immutable k-space trajectory: three broadcast-compatible coordinate arrays plus the two
/// tolerances they were constructed with.
///
/// All validation happens eagerly in the constructors; a value of this type always satisfies
/// the invariants (mutually broadcastable arrays, joint broadcast rank at least 4, floating
/// storage whenever repeat detection ran). There is no mutation API.
#[derive(Debug, Clone, PartialEq)]
pub struct KTrajectory {
    kz: Tensor,
    ky: Tensor,
    kx: Tensor,
    grid_detection_tolerance: f64,
    repeat_detection_tolerance: Option<f64>,
}

impl KTrajectory {
    /// Build a trajectory from the three coordinate arrays with default options.
    ///
    /// Each array is repeat-reduced independently (integer arrays promoting to `f32`), then the
    /// three reduced shapes must be mutually broadcastable with a joint rank of at least 4.
    ///
    /// Arguments
    /// ---------
    /// * `kz`, `ky`, `kx`: coordinate arrays ordered along the logical axes
    ///   `(other, k2, k1, k0)`.
    ///
    /// Return
    /// ------
    /// * The constructed trajectory, or [`MrkitError::ShapeError`] when the arrays do not
    ///   broadcast or the joint rank is below 4.
    pub fn new(kz: Tensor, ky: Tensor, kx: Tensor) -> Result<KTrajectory, MrkitError> {
        Self::with_options(kz, ky, kx, TrajectoryOptions::default())
    }

    /// Build a trajectory from the three coordinate arrays with explicit options.
    pub fn with_options(
        kz: Tensor,
        ky: Tensor,
        kx: Tensor,
        options: TrajectoryOptions,
    ) -> Result<KTrajectory, MrkitError> {
        options.validate()?;
        let kz = remove_repeat(&kz, options.repeat_detection_tolerance)?;
        let ky = remove_repeat(&ky, options.repeat_detection_tolerance)?;
        let kx = remove_repeat(&kx, options.repeat_detection_tolerance)?;
        let shape = broadcast_shapes(&[kz.shape(), ky.shape(), kx.shape()])?;
        if shape.len() < MIN_TRAJECTORY_RANK {
            return Err(MrkitError::ShapeError(format!(
                "broadcast shape {} has rank {}, a trajectory needs at least {} axes (other, k2, k1, k0)",
                format_shape(&shape),
                shape.len(),
                MIN_TRAJECTORY_RANK
            )));
        }
        Ok(KTrajectory {
            kz,
            ky,
            kx,
            grid_detection_tolerance: options.grid_detection_tolerance,
            repeat_detection_tolerance: options.repeat_detection_tolerance,
        })
    }

    /// Build a trajectory from one stacked tensor, splitting along axis 0.
    ///
    /// The stack axis must have length exactly 3, holding kz, ky and kx in that order. This
    /// path uses the tight repeat tolerance: a stacked tensor has usually been materialized at
    /// full broadcast shape, and only exact repeats should collapse back.
    pub fn from_stacked(tensor: &Tensor) -> Result<KTrajectory, MrkitError> {
        Self::from_stacked_with_options(tensor, 0, TrajectoryOptions::stacked())
    }

    /// Build a trajectory from one stacked tensor with an explicit stack axis and options.
    ///
    /// Arguments
    /// ---------
    /// * `tensor`: the stacked representation, one rank higher than the coordinate arrays.
    /// * `stack_axis`: which axis holds the three directions, in `0..rank`.
    /// * `options`: tolerances for the underlying three-array construction.
    ///
    /// Return
    /// ------
    /// * The constructed trajectory, or [`MrkitError::InvalidShape`] when the stack axis is out
    ///   of range or does not have length 3.
    pub fn from_stacked_with_options(
        tensor: &Tensor,
        stack_axis: usize,
        options: TrajectoryOptions,
    ) -> Result<KTrajectory, MrkitError> {
        if stack_axis >= tensor.ndim() {
            return Err(MrkitError::InvalidShape(format!(
                "stack axis {} is out of range for a tensor of rank {}",
                stack_axis,
                tensor.ndim()
            )));
        }
        let len = tensor.shape()[stack_axis];
        if len != 3 {
            return Err(MrkitError::InvalidShape(format!(
                "stack axis {} of shape {} has length {}, expected exactly 3 (kz, ky, kx)",
                stack_axis,
                format_shape(tensor.shape()),
                len
            )));
        }
        let kz = tensor.index_axis(stack_axis, 0)?;
        let ky = tensor.index_axis(stack_axis, 1)?;
        let kx = tensor.index_axis(stack_axis, 2)?;
        Self::with_options(kz, ky, kx, options)
    }

    /// The kz coordinate array (physical z direction).
    pub fn kz(&self) -> &Tensor {
        &self.kz
    }

    /// The ky coordinate array (physical y direction).
    pub fn ky(&self) -> &Tensor {
        &self.ky
    }

    /// The kx coordinate array (physical x direction).
    pub fn kx(&self) -> &Tensor {
        &self.kx
    }

    /// Grid detection tolerance this trajectory was constructed with.
    pub fn grid_detection_tolerance(&self) -> f64 {
        self.grid_detection_tolerance
    }

    /// Repeat detection tolerance this trajectory was constructed with, `None` when repeat
    /// detection was disabled.
    pub fn repeat_detection_tolerance(&self) -> Option<f64> {
        self.repeat_detection_tolerance
    }

    /// Common broadcast shape of the three coordinate arrays.
    ///
    /// Always recomputed from the current shapes. Construction already validated
    /// broadcastability, so on a constructed trajectory this cannot fail; the `Result` stays so
    /// the query is safe to call in any context.
    pub fn broadcasted_shape(&self) -> Result<Shape, MrkitError> {
        broadcast_shapes(&[self.kz.shape(), self.ky.shape(), self.kx.shape()])
    }

    /// Export the trajectory as one stacked tensor.
    ///
    /// Each coordinate array is broadcast to the common shape, then the three are stacked along
    /// `stack_axis` in the order (kz, ky, kx); the result is one rank higher than the broadcast
    /// shape. Mixed dtypes promote (`F64 > F32 > I32`). The stored arrays are not modified.
    ///
    /// Round trip: feeding the result back through [`KTrajectory::from_stacked`] (with the same
    /// axis) reconstructs a trajectory with equal values, with the tight stacked tolerance
    /// collapsing the expansion again.
    pub fn as_tensor(&self, stack_axis: usize) -> Result<Tensor, MrkitError> {
        let shape = self.broadcasted_shape()?;
        let kz = self.kz.broadcast_to(&shape)?;
        let ky = self.ky.broadcast_to(&shape)?;
        let kx = self.kx.broadcast_to(&shape)?;
        Tensor::stack(stack_axis, &[kz, ky, kx])
    }

    /// New trajectory with all three arrays converted to `dtype`.
    ///
    /// The tolerances are copied as-is and repeat reduction does not run again: conversion
    /// reuses the already normalized arrays.
    pub fn to_dtype(&self, dtype: DType) -> KTrajectory {
        KTrajectory {
            kz: self.kz.to_dtype(dtype),
            ky: self.ky.to_dtype(dtype),
            kx: self.kx.to_dtype(dtype),
            grid_detection_tolerance: self.grid_detection_tolerance,
            repeat_detection_tolerance: self.repeat_detection_tolerance,
        }
    }

    /// New trajectory with all three arrays copied into contiguous row-major layout.
    ///
    /// Values, shapes and tolerances are unchanged; repeat reduction does not run again.
    pub fn to_standard_layout(&self) -> KTrajectory {
        KTrajectory {
            kz: self.kz.to_standard_layout(),
            ky: self.ky.to_standard_layout(),
            kx: self.kx.to_standard_layout(),
            grid_detection_tolerance: self.grid_detection_tolerance,
            repeat_detection_tolerance: self.repeat_detection_tolerance,
        }
    }

    /// Classify the trajectory against an explicit grid detection tolerance.
    ///
    /// Arguments
    /// ---------
    /// * `tolerance`: maximum distance to the nearest integer; must be finite and non-negative.
    ///
    /// Return
    /// ------
    /// * The full 3×3 type matrix (rows kz, ky, kx; columns k2, k1, k0), or
    ///   [`MrkitError::InvalidParameter`] for a tolerance outside its domain.
    pub fn traj_type_matrix(&self, tolerance: f64) -> Result<TrajTypeMatrix, MrkitError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(MrkitError::InvalidParameter(format!(
                "grid detection tolerance must be finite and non-negative, got {tolerance}"
            )));
        }
        Ok(traj_type::traj_type_matrix(
            &self.kz,
            &self.ky,
            &self.kx,
            tolerance,
        ))
    }

    /// Type per physical direction (kz, ky, kx), using the stored grid detection tolerance.
    pub fn type_along_kzyx(&self) -> [TrajType; 3] {
        traj_type::traj_type_matrix(
            &self.kz,
            &self.ky,
            &self.kx,
            self.grid_detection_tolerance,
        )
        .type_along_kzyx()
    }

    /// Type per logical axis (k2, k1, k0), using the stored grid detection tolerance.
    pub fn type_along_k210(&self) -> [TrajType; 3] {
        traj_type::traj_type_matrix(
            &self.kz,
            &self.ky,
            &self.kx,
            self.grid_detection_tolerance,
        )
        .type_along_k210()
    }
}

#[cfg(test)]
mod trajectory_test {
    use super::*;
    use ndarray::{array, ArrayD, IxDyn};

    fn line(values: &[f64]) -> Tensor {
        let n = values.len();
        Tensor::from(
            ArrayD::from_shape_vec(IxDyn(&[1, 1, 1, n]), values.to_vec())
                .expect("shape matches data"),
        )
    }

    #[test]
    fn test_invalid_tolerances_are_rejected() {
        let t = line(&[0.0, 1.0, 2.0]);
        let bad_grid = TrajectoryOptions::default().with_grid_detection_tolerance(-1.0);
        assert!(matches!(
            KTrajectory::with_options(t.clone(), t.clone(), t.clone(), bad_grid),
            Err(MrkitError::InvalidParameter(_))
        ));

        let bad_repeat = TrajectoryOptions::default().with_repeat_detection_tolerance(Some(0.0));
        assert!(matches!(
            KTrajectory::with_options(t.clone(), t.clone(), t.clone(), bad_repeat),
            Err(MrkitError::InvalidParameter(_))
        ));

        let nan_repeat =
            TrajectoryOptions::default().with_repeat_detection_tolerance(Some(f64::NAN));
        assert!(matches!(
            KTrajectory::with_options(t.clone(), t.clone(), t, nan_repeat),
            Err(MrkitError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_rank_below_four_is_rejected() {
        let flat = Tensor::from(array![0.0_f64, 1.0, 2.0].into_dyn());
        let err = KTrajectory::new(flat.clone(), flat.clone(), flat).unwrap_err();
        assert!(matches!(err, MrkitError::ShapeError(_)));
        assert!(err.to_string().contains("rank"));
    }

    #[test]
    fn test_construction_reduces_and_promotes() {
        // ky is a constant integer array: its k0 axis collapses and its dtype promotes.
        let kz = line(&[0.0, 1.0, 2.0]);
        let ky = Tensor::from(ArrayD::from_elem(IxDyn(&[1, 1, 1, 3]), 4_i32));
        let kx = line(&[0.0, 0.5, 1.0]);
        let traj = KTrajectory::new(kz, ky, kx).unwrap();
        assert_eq!(traj.ky().shape(), &[1, 1, 1, 1]);
        assert_eq!(traj.ky().dtype(), DType::F32);
        assert_eq!(traj.broadcasted_shape().unwrap().as_slice(), &[1, 1, 1, 3]);
    }

    #[test]
    fn test_disabled_repeat_detection_keeps_inputs() {
        let options = TrajectoryOptions::default().with_repeat_detection_tolerance(None);
        let repeated = Tensor::from(ArrayD::from_elem(IxDyn(&[1, 1, 1, 5]), 2.0_f64));
        let traj = KTrajectory::with_options(
            repeated.clone(),
            repeated.clone(),
            repeated.clone(),
            options,
        )
        .unwrap();
        assert_eq!(traj.kz().shape(), &[1, 1, 1, 5]);
        assert_eq!(traj.repeat_detection_tolerance(), None);

        // Conversions reuse the stored arrays without re-running reduction.
        let converted = traj.to_dtype(DType::F32);
        assert_eq!(converted.kz().shape(), &[1, 1, 1, 5]);
        assert_eq!(converted.repeat_detection_tolerance(), None);
        assert_eq!(
            converted.grid_detection_tolerance(),
            traj.grid_detection_tolerance()
        );
    }

    #[test]
    fn test_stacked_path_requires_length_three() {
        let stacked = Tensor::from(ArrayD::from_elem(IxDyn(&[4, 1, 1, 1, 2]), 0.0_f64));
        let err = KTrajectory::from_stacked(&stacked).unwrap_err();
        assert!(matches!(err, MrkitError::InvalidShape(_)));
        assert!(err.to_string().contains("expected exactly 3"));

        let err =
            KTrajectory::from_stacked_with_options(&stacked, 9, TrajectoryOptions::stacked())
                .unwrap_err();
        assert!(matches!(err, MrkitError::InvalidShape(_)));
    }

    #[test]
    fn test_classification_tolerance_is_validated() {
        let t = line(&[0.0, 1.0, 2.0]);
        let traj = KTrajectory::new(t.clone(), t.clone(), t).unwrap();
        assert!(traj.traj_type_matrix(1e-3).is_ok());
        assert!(matches!(
            traj.traj_type_matrix(-1e-3),
            Err(MrkitError::InvalidParameter(_))
        ));
        assert!(matches!(
            traj.traj_type_matrix(f64::INFINITY),
            Err(MrkitError::InvalidParameter(_))
        ));
    }
}
