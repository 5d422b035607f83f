//! # Trajectory calculators
//!
//! Calculators construct a fully validated [`KTrajectory`] from the sampling description of an
//! acquisition. The acquisition side is abstracted behind [`AcquisitionInfo`], a small
//! capability trait exposing the per-sample phase-encoding indices, the readout geometry and
//! the encoding limits; anything that can answer those queries (a parsed raw-data header, a
//! simulation, the shipped [`FullSampling`] layout) can drive every calculator.
//!
//! ## Overview
//!
//! - [`CartesianCalculator`]: rectilinear sampling, one grid step per encoding index
//! - [`RpeCalculator`]: radial phase encoding with a configurable angular increment and
//!   per-line radial shifts
//! - [`SunflowerGoldenRpeCalculator`]: golden-angle RPE with golden-ratio radial shifts
//! - [`Radial2DCalculator`]: radial spokes in the kx/ky plane
//!
//! All calculators produce `f32` coordinates in units of grid steps, centered with the readout
//! center at 0, and construct the trajectory through [`KTrajectory::new`], so repeat reduction
//! runs with the default tolerance and constant axes collapse to broadcastable singletons.
//!
//! ## See also
//!
//! * [`crate::trajectory::KTrajectory`] – the produced container.

use ndarray::{Array3, Array4, ArrayD, IxDyn};

use crate::constants::{GOLDEN_ANGLE, GOLDEN_RATIO};
use crate::mrkit_errors::MrkitError;
use crate::tensor::Tensor;
use crate::trajectory::KTrajectory;

// -------------------------------------------------------------------------------------------------
// Acquisition description
// -------------------------------------------------------------------------------------------------

/// Inclusive limits of one encoding axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Smallest encoding index.
    pub min: i32,
    /// Largest encoding index.
    pub max: i32,
    /// Index of the k-space center.
    pub center: i32,
}

impl Limits {
    pub fn new(min: i32, max: i32, center: i32) -> Self {
        Limits { min, max, center }
    }

    /// Number of encoding steps covered by the limits.
    pub fn length(&self) -> i32 {
        self.max - self.min + 1
    }
}

/// Capability set a calculator needs from an acquisition.
///
/// The index arrays describe which phase-encoding step each acquired readout belongs to, laid
/// out as `(other, k2, k1)`; both must have that rank and one common shape. The readout
/// geometry is uniform across acquisitions: one sample count and one center sample.
pub trait AcquisitionInfo {
    /// k1 encoding index per acquisition, shape `(other, k2, k1)`.
    fn k1_indices(&self) -> ArrayD<i32>;

    /// k2 encoding index per acquisition, shape `(other, k2, k1)`.
    fn k2_indices(&self) -> ArrayD<i32>;

    /// Number of readout samples per acquisition.
    fn num_samples(&self) -> usize;

    /// Readout sample holding the k-space center.
    fn center_sample(&self) -> usize;

    /// Encoding limits of the k1 axis.
    fn k1_limits(&self) -> Limits;

    /// Encoding limits of the k2 axis.
    fn k2_limits(&self) -> Limits;
}

/// Fully sampled rectilinear layout: every (k2, k1) combination acquired once, in order.
///
/// The index arrays are synthesized on demand (index value equals index position), the readout
/// center sits at `num_samples / 2` and the encoding centers at half the respective extents.
/// This is the layout the calculator tests drive, and a convenient starting point for
/// simulated acquisitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullSampling {
    num_samples: usize,
    num_k1: usize,
    num_k2: usize,
}

impl FullSampling {
    /// Describe a fully sampled acquisition with the given extents.
    ///
    /// Arguments
    /// ---------
    /// * `num_samples`: readout length (k0).
    /// * `num_k1`: number of k1 phase-encoding steps.
    /// * `num_k2`: number of k2 phase-encoding steps.
    ///
    /// Return
    /// ------
    /// * The layout, or [`MrkitError::InvalidShape`] when any extent is 0.
    pub fn new(num_samples: usize, num_k1: usize, num_k2: usize) -> Result<Self, MrkitError> {
        if num_samples == 0 || num_k1 == 0 || num_k2 == 0 {
            return Err(MrkitError::InvalidShape(format!(
                "sampling extents must be nonzero, got (k0, k1, k2) = ({num_samples}, {num_k1}, {num_k2})"
            )));
        }
        Ok(FullSampling {
            num_samples,
            num_k1,
            num_k2,
        })
    }
}

impl AcquisitionInfo for FullSampling {
    fn k1_indices(&self) -> ArrayD<i32> {
        Array3::from_shape_fn((1, self.num_k2, self.num_k1), |(_, _, i1)| i1 as i32).into_dyn()
    }

    fn k2_indices(&self) -> ArrayD<i32> {
        Array3::from_shape_fn((1, self.num_k2, self.num_k1), |(_, i2, _)| i2 as i32).into_dyn()
    }

    fn num_samples(&self) -> usize {
        self.num_samples
    }

    fn center_sample(&self) -> usize {
        self.num_samples / 2
    }

    fn k1_limits(&self) -> Limits {
        Limits::new(0, self.num_k1 as i32 - 1, self.num_k1 as i32 / 2)
    }

    fn k2_limits(&self) -> Limits {
        Limits::new(0, self.num_k2 as i32 - 1, self.num_k2 as i32 / 2)
    }
}

// -------------------------------------------------------------------------------------------------
// Calculator trait and shared pieces
// -------------------------------------------------------------------------------------------------

/// A sampling scheme that can turn an acquisition description into a trajectory.
pub trait TrajectoryCalculator {
    /// Compute the k-space coordinates for `info` and construct the trajectory.
    fn calculate(&self, info: &dyn AcquisitionInfo) -> Result<KTrajectory, MrkitError>;
}

/// Validate the two index arrays and return their common `(other, k2, k1)` extents.
fn index_dims(
    idx_k1: &ArrayD<i32>,
    idx_k2: &ArrayD<i32>,
) -> Result<(usize, usize, usize), MrkitError> {
    if idx_k1.ndim() != 3 {
        return Err(MrkitError::InvalidShape(format!(
            "k1 index array has rank {}, expected 3 (other, k2, k1)",
            idx_k1.ndim()
        )));
    }
    if idx_k1.shape() != idx_k2.shape() {
        return Err(MrkitError::InvalidShape(format!(
            "k1 and k2 index arrays disagree in shape: {:?} vs {:?}",
            idx_k1.shape(),
            idx_k2.shape()
        )));
    }
    let shape = idx_k1.shape();
    Ok((shape[0], shape[1], shape[2]))
}

/// Readout length and center, rejecting an empty readout.
fn readout_geometry(info: &dyn AcquisitionInfo) -> Result<(usize, f64), MrkitError> {
    let num_samples = info.num_samples();
    if num_samples == 0 {
        return Err(MrkitError::InvalidShape(
            "readout length is 0, cannot compute a trajectory".into(),
        ));
    }
    Ok((num_samples, info.center_sample() as f64))
}

/// Readout line `sample − center`, shape `(1, 1, 1, num_samples)`.
fn readout_line(info: &dyn AcquisitionInfo) -> Result<ArrayD<f32>, MrkitError> {
    let (num_samples, center) = readout_geometry(info)?;
    let line = Array4::from_shape_fn((1, 1, 1, num_samples), |(_, _, _, i0)| {
        (i0 as f64 - center) as f32
    });
    Ok(line.into_dyn())
}

/// Lift per-line radius and angle into the kz/ky coordinate arrays `(other, k2, k1, 1)`.
fn polar_components(radius: &Array3<f64>, angle: &Array3<f64>) -> (Tensor, Tensor) {
    let (num_other, num_k2, num_k1) = radius.dim();
    let kz = Array4::from_shape_fn((num_other, num_k2, num_k1, 1), |(o, i2, i1, _)| {
        (radius[[o, i2, i1]] * angle[[o, i2, i1]].sin()) as f32
    });
    let ky = Array4::from_shape_fn((num_other, num_k2, num_k1, 1), |(o, i2, i1, _)| {
        (radius[[o, i2, i1]] * angle[[o, i2, i1]].cos()) as f32
    });
    (
        Tensor::from(kz.into_dyn()),
        Tensor::from(ky.into_dyn()),
    )
}

// -------------------------------------------------------------------------------------------------
// Cartesian
// -------------------------------------------------------------------------------------------------

/// Rectilinear sampling: every coordinate is the signed distance of its encoding index to the
/// corresponding center. All three directions land exactly on the integer grid, and the
/// construction-time repeat reduction collapses each coordinate to the single axis it actually
/// varies along.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartesianCalculator;

impl TrajectoryCalculator for CartesianCalculator {
    fn calculate(&self, info: &dyn AcquisitionInfo) -> Result<KTrajectory, MrkitError> {
        let idx_k1 = info.k1_indices();
        let idx_k2 = info.k2_indices();
        let (num_other, num_k2, num_k1) = index_dims(&idx_k1, &idx_k2)?;
        let k1_center = info.k1_limits().center;
        let k2_center = info.k2_limits().center;
        let kz = Array4::from_shape_fn((num_other, num_k2, num_k1, 1), |(o, i2, i1, _)| {
            (idx_k2[[o, i2, i1]] - k2_center) as f32
        });
        let ky = Array4::from_shape_fn((num_other, num_k2, num_k1, 1), |(o, i2, i1, _)| {
            (idx_k1[[o, i2, i1]] - k1_center) as f32
        });
        let kx = readout_line(info)?;
        KTrajectory::new(
            Tensor::from(kz.into_dyn()),
            Tensor::from(ky.into_dyn()),
            Tensor::from(kx),
        )
    }
}

// -------------------------------------------------------------------------------------------------
// Radial phase encoding
// -------------------------------------------------------------------------------------------------

/// Radial phase encoding: a Cartesian readout combined with radial lines in the k2/k1 plane.
///
/// Line `j` (the k2 index) is rotated by `j × angle`; along each line the radial position is
/// the k1 index relative to the k1 center, offset by a per-line shift drawn cyclically from
/// `shift_between_rpe_lines`. The interleaved default shifts `[0.0, 0.5, 0.25, 0.75]` spread
/// neighbouring lines off the shared radial grid, improving the sampling density of the
/// combined pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct RpeCalculator {
    angle: f64,
    shift_between_rpe_lines: Vec<f64>,
}

impl RpeCalculator {
    /// Radial phase encoding with the default interleaved shifts `[0.0, 0.5, 0.25, 0.75]`.
    ///
    /// Arguments
    /// ---------
    /// * `angle`: angular increment between neighbouring lines, radians.
    pub fn new(angle: f64) -> Result<Self, MrkitError> {
        Self::with_shifts(angle, vec![0.0, 0.5, 0.25, 0.75])
    }

    /// Radial phase encoding with explicit per-line radial shifts.
    ///
    /// Line `j` uses `shifts[j mod shifts.len()]`, so a single-element list shifts every line
    /// by the same amount.
    pub fn with_shifts(angle: f64, shifts: Vec<f64>) -> Result<Self, MrkitError> {
        if !angle.is_finite() {
            return Err(MrkitError::InvalidParameter(format!(
                "angular increment must be finite, got {angle}"
            )));
        }
        if shifts.is_empty() {
            return Err(MrkitError::InvalidParameter(
                "at least one radial shift is required".into(),
            ));
        }
        if let Some(bad) = shifts.iter().find(|s| !s.is_finite()) {
            return Err(MrkitError::InvalidParameter(format!(
                "radial shifts must be finite, got {bad}"
            )));
        }
        Ok(RpeCalculator {
            angle,
            shift_between_rpe_lines: shifts,
        })
    }
}

impl TrajectoryCalculator for RpeCalculator {
    fn calculate(&self, info: &dyn AcquisitionInfo) -> Result<KTrajectory, MrkitError> {
        let idx_k1 = info.k1_indices();
        let idx_k2 = info.k2_indices();
        let (num_other, num_k2, num_k1) = index_dims(&idx_k1, &idx_k2)?;
        let k1_center = info.k1_limits().center;
        let num_shifts = self.shift_between_rpe_lines.len() as i32;
        let angle = Array3::from_shape_fn((num_other, num_k2, num_k1), |(o, i2, i1)| {
            f64::from(idx_k2[[o, i2, i1]]) * self.angle
        });
        let radius = Array3::from_shape_fn((num_other, num_k2, num_k1), |(o, i2, i1)| {
            let line = idx_k2[[o, i2, i1]];
            let shift = self.shift_between_rpe_lines[line.rem_euclid(num_shifts) as usize];
            f64::from(idx_k1[[o, i2, i1]] - k1_center) + shift
        });
        let (kz, ky) = polar_components(&radius, &angle);
        let kx = readout_line(info)?;
        KTrajectory::new(kz, ky, Tensor::from(kx))
    }
}

/// Golden-angle radial phase encoding with sunflower-like radial interleaving.
///
/// The angular increment is fixed to the golden angle, taken modulo π since a radial line
/// covers both half-planes. Each line's radial grid is offset by the fractional part of
/// `line × φ`, which distributes the offsets as evenly as the golden ratio distributes
/// anything; `rad_us_factor` scales the radial positions, widening the spacing for radially
/// undersampled acquisitions while keeping the acquired line count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunflowerGoldenRpeCalculator {
    rad_us_factor: f64,
}

impl SunflowerGoldenRpeCalculator {
    /// Golden-angle RPE with the given radial undersampling factor.
    pub fn new(rad_us_factor: f64) -> Result<Self, MrkitError> {
        if !rad_us_factor.is_finite() || rad_us_factor <= 0.0 {
            return Err(MrkitError::InvalidParameter(format!(
                "radial undersampling factor must be finite and positive, got {rad_us_factor}"
            )));
        }
        Ok(SunflowerGoldenRpeCalculator { rad_us_factor })
    }
}

impl Default for SunflowerGoldenRpeCalculator {
    fn default() -> Self {
        SunflowerGoldenRpeCalculator { rad_us_factor: 1.0 }
    }
}

impl TrajectoryCalculator for SunflowerGoldenRpeCalculator {
    fn calculate(&self, info: &dyn AcquisitionInfo) -> Result<KTrajectory, MrkitError> {
        let idx_k1 = info.k1_indices();
        let idx_k2 = info.k2_indices();
        let (num_other, num_k2, num_k1) = index_dims(&idx_k1, &idx_k2)?;
        let k1_center = info.k1_limits().center;
        let angle = Array3::from_shape_fn((num_other, num_k2, num_k1), |(o, i2, i1)| {
            (f64::from(idx_k2[[o, i2, i1]]) * GOLDEN_ANGLE).rem_euclid(std::f64::consts::PI)
        });
        let radius = Array3::from_shape_fn((num_other, num_k2, num_k1), |(o, i2, i1)| {
            let shift = (f64::from(idx_k2[[o, i2, i1]]) * GOLDEN_RATIO).rem_euclid(1.0);
            (f64::from(idx_k1[[o, i2, i1]] - k1_center) + shift) * self.rad_us_factor
        });
        let (kz, ky) = polar_components(&radius, &angle);
        let kx = readout_line(info)?;
        KTrajectory::new(kz, ky, Tensor::from(kx))
    }
}

// -------------------------------------------------------------------------------------------------
// 2D radial
// -------------------------------------------------------------------------------------------------

/// Radial spokes in the kx/ky plane: the readout itself is rotated by `k1 index × angle`,
/// kz stays a single zero (a 2D acquisition).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Radial2DCalculator {
    angle: f64,
}

impl Radial2DCalculator {
    /// Radial spokes with an explicit angular increment in radians.
    pub fn new(angle: f64) -> Result<Self, MrkitError> {
        if !angle.is_finite() {
            return Err(MrkitError::InvalidParameter(format!(
                "angular increment must be finite, got {angle}"
            )));
        }
        Ok(Radial2DCalculator { angle })
    }
}

impl Default for Radial2DCalculator {
    fn default() -> Self {
        Radial2DCalculator {
            angle: GOLDEN_ANGLE,
        }
    }
}

impl TrajectoryCalculator for Radial2DCalculator {
    fn calculate(&self, info: &dyn AcquisitionInfo) -> Result<KTrajectory, MrkitError> {
        let idx_k1 = info.k1_indices();
        let idx_k2 = info.k2_indices();
        let (num_other, num_k2, num_k1) = index_dims(&idx_k1, &idx_k2)?;
        let (num_samples, center) = readout_geometry(info)?;
        let kx = Array4::from_shape_fn(
            (num_other, num_k2, num_k1, num_samples),
            |(o, i2, i1, i0)| {
                let spoke_angle = f64::from(idx_k1[[o, i2, i1]]) * self.angle;
                ((i0 as f64 - center) * spoke_angle.cos()) as f32
            },
        );
        let ky = Array4::from_shape_fn(
            (num_other, num_k2, num_k1, num_samples),
            |(o, i2, i1, i0)| {
                let spoke_angle = f64::from(idx_k1[[o, i2, i1]]) * self.angle;
                ((i0 as f64 - center) * spoke_angle.sin()) as f32
            },
        );
        let kz = ArrayD::<f32>::zeros(IxDyn(&[1, 1, 1, 1]));
        KTrajectory::new(
            Tensor::from(kz),
            Tensor::from(ky.into_dyn()),
            Tensor::from(kx.into_dyn()),
        )
    }
}
