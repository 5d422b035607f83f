//! # Dtype-tagged dynamic-rank tensors
//!
//! This module provides the small numeric-array layer the trajectory engine is built on: a
//! [`Tensor`] is a dynamic-rank `ndarray` array tagged with its element type ([`DType`]), so a
//! trajectory can hold integer index grids and floating-point coordinates behind one type while
//! broadcasting, stacking and conversion stay total over the supported dtypes.
//!
//! ## Overview
//!
//! - [`DType`]: the supported element types (`f32`, `f64`, `i32`) and their promotion order
//! - [`Tensor`]: owned array storage with shape/dtype queries, broadcasting expansion, axis
//!   stacking and splitting, dtype and memory-layout conversion
//! - [`broadcast_shapes`]: numpy-style shape inference over any number of shapes, reporting the
//!   offending axis when two lengths conflict
//!
//! Broadcasting follows the usual right-aligned rules: shapes are compared from the trailing
//! axis, a missing leading axis counts as length 1, and two lengths are compatible when they are
//! equal or one of them is 1.
//!
//! ## See also
//!
//! * [`crate::trajectory::KTrajectory`] – the container built on top of this layer.
//! * [`crate::repeat`] – axis collapsing applied before a trajectory is stored.

use itertools::Itertools;
use ndarray::{ArrayD, Axis, IxDyn};

use crate::constants::Shape;
use crate::mrkit_errors::MrkitError;

// -------------------------------------------------------------------------------------------------
// Element types
// -------------------------------------------------------------------------------------------------

/// Element type of a [`Tensor`].
///
/// The promotion order used when mixed dtypes meet (stacking, unified export) is
/// `F64 > F32 > I32`: the result of combining two tensors is the smallest dtype that can
/// represent both without dropping fractional precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    F32,
    F64,
    I32,
}

impl DType {
    /// True for the floating-point dtypes.
    pub fn is_floating_point(self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    /// Smallest dtype able to represent values of both `self` and `other`.
    pub fn promote(self, other: DType) -> DType {
        match (self, other) {
            (DType::F64, _) | (_, DType::F64) => DType::F64,
            (DType::F32, _) | (_, DType::F32) => DType::F32,
            (DType::I32, DType::I32) => DType::I32,
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F64 => write!(f, "f64"),
            DType::I32 => write!(f, "i32"),
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Tensor storage
// -------------------------------------------------------------------------------------------------

/// Owned dynamic-rank array tagged with its element type.
///
/// All operations return new owned tensors; nothing here mutates in place. The variant payloads
/// are public so numeric code can match on the concrete storage when it needs typed access.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    I32(ArrayD<i32>),
}

impl From<ArrayD<f32>> for Tensor {
    fn from(array: ArrayD<f32>) -> Self {
        Tensor::F32(array)
    }
}

impl From<ArrayD<f64>> for Tensor {
    fn from(array: ArrayD<f64>) -> Self {
        Tensor::F64(array)
    }
}

impl From<ArrayD<i32>> for Tensor {
    fn from(array: ArrayD<i32>) -> Self {
        Tensor::I32(array)
    }
}

impl Tensor {
    /// Element type of this tensor.
    pub fn dtype(&self) -> DType {
        match self {
            Tensor::F32(_) => DType::F32,
            Tensor::F64(_) => DType::F64,
            Tensor::I32(_) => DType::I32,
        }
    }

    /// Shape as a slice of axis lengths.
    pub fn shape(&self) -> &[usize] {
        match self {
            Tensor::F32(a) => a.shape(),
            Tensor::F64(a) => a.shape(),
            Tensor::I32(a) => a.shape(),
        }
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        match self {
            Tensor::F32(a) => a.ndim(),
            Tensor::F64(a) => a.ndim(),
            Tensor::I32(a) => a.ndim(),
        }
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        match self {
            Tensor::F32(a) => a.len(),
            Tensor::F64(a) => a.len(),
            Tensor::I32(a) => a.len(),
        }
    }

    /// True when the tensor holds no elements (some axis has length 0).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the element type carries fractional precision.
    pub fn is_floating_point(&self) -> bool {
        self.dtype().is_floating_point()
    }

    /// Convert to the given element type, returning a new tensor.
    ///
    /// Integer to float is exact for the magnitudes used in k-space indexing; float to integer
    /// truncates toward zero with saturation (standard `as` cast semantics).
    pub fn to_dtype(&self, dtype: DType) -> Tensor {
        match dtype {
            DType::F32 => Tensor::F32(self.f32_array()),
            DType::F64 => Tensor::F64(self.f64_array()),
            DType::I32 => Tensor::I32(self.i32_array()),
        }
    }

    /// Copy into contiguous row-major (standard) memory layout.
    ///
    /// Values and shape are unchanged; only the memory arrangement differs. Cheap when the
    /// tensor already is in standard layout apart from the unavoidable copy into a new owner.
    pub fn to_standard_layout(&self) -> Tensor {
        match self {
            Tensor::F32(a) => Tensor::F32(a.as_standard_layout().into_owned()),
            Tensor::F64(a) => Tensor::F64(a.as_standard_layout().into_owned()),
            Tensor::I32(a) => Tensor::I32(a.as_standard_layout().into_owned()),
        }
    }

    /// Broadcast this tensor to `shape`, materializing the expansion.
    ///
    /// Arguments
    /// ---------
    /// * `shape`: the target shape; every axis must be compatible with this tensor's shape under
    ///   right-aligned broadcasting rules.
    ///
    /// Return
    /// ------
    /// * A new tensor of exactly `shape`, or [`MrkitError::ShapeError`] when the shapes are not
    ///   broadcast-compatible.
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Tensor, MrkitError> {
        let fail = || {
            MrkitError::ShapeError(format!(
                "cannot broadcast {} to {}",
                format_shape(self.shape()),
                format_shape(shape)
            ))
        };
        match self {
            Tensor::F32(a) => a
                .broadcast(IxDyn(shape))
                .map(|v| Tensor::F32(v.to_owned()))
                .ok_or_else(fail),
            Tensor::F64(a) => a
                .broadcast(IxDyn(shape))
                .map(|v| Tensor::F64(v.to_owned()))
                .ok_or_else(fail),
            Tensor::I32(a) => a
                .broadcast(IxDyn(shape))
                .map(|v| Tensor::I32(v.to_owned()))
                .ok_or_else(fail),
        }
    }

    /// Select the sub-tensor at `index` along `axis`, removing that axis.
    ///
    /// This is the splitting half of the stacked-tensor mapping: indexing a stack axis of
    /// length 3 three times recovers the three stacked parts, each one rank lower.
    pub fn index_axis(&self, axis: usize, index: usize) -> Result<Tensor, MrkitError> {
        if axis >= self.ndim() {
            return Err(MrkitError::InvalidShape(format!(
                "axis {} is out of range for a tensor of rank {}",
                axis,
                self.ndim()
            )));
        }
        if index >= self.shape()[axis] {
            return Err(MrkitError::InvalidShape(format!(
                "index {} is out of range for axis {} of length {}",
                index,
                axis,
                self.shape()[axis]
            )));
        }
        let selected = match self {
            Tensor::F32(a) => Tensor::F32(a.index_axis(Axis(axis), index).to_owned()),
            Tensor::F64(a) => Tensor::F64(a.index_axis(Axis(axis), index).to_owned()),
            Tensor::I32(a) => Tensor::I32(a.index_axis(Axis(axis), index).to_owned()),
        };
        Ok(selected)
    }

    /// Stack tensors of identical shape along a new axis.
    ///
    /// Arguments
    /// ---------
    /// * `axis`: position of the new axis in the result, in `0..=rank` of the parts.
    /// * `parts`: the tensors to stack, all of one shape. Mixed dtypes promote
    ///   (`F64 > F32 > I32`).
    ///
    /// Return
    /// ------
    /// * A tensor one rank higher than the parts, with `result.shape()[axis] == parts.len()`,
    ///   or [`MrkitError::InvalidShape`] when the parts disagree in shape, the part list is
    ///   empty, or the axis is out of range.
    pub fn stack(axis: usize, parts: &[Tensor]) -> Result<Tensor, MrkitError> {
        let first = parts.first().ok_or_else(|| {
            MrkitError::InvalidShape("cannot stack an empty list of tensors".into())
        })?;
        if let Some(mismatch) = parts.iter().find(|p| p.shape() != first.shape()) {
            return Err(MrkitError::InvalidShape(format!(
                "cannot stack tensors of shapes {} and {}",
                format_shape(first.shape()),
                format_shape(mismatch.shape())
            )));
        }
        if axis > first.ndim() {
            return Err(MrkitError::InvalidShape(format!(
                "stack axis {} is out of range for parts of rank {}",
                axis,
                first.ndim()
            )));
        }
        let stack_failed = |err: ndarray::ShapeError| {
            MrkitError::InvalidShape(format!("stacking along axis {axis} failed: {err}"))
        };
        let dtype = parts
            .iter()
            .fold(DType::I32, |acc, p| acc.promote(p.dtype()));
        match dtype {
            DType::F64 => {
                let arrays: Vec<ArrayD<f64>> = parts.iter().map(|p| p.f64_array()).collect();
                let views: Vec<_> = arrays.iter().map(|a| a.view()).collect();
                ndarray::stack(Axis(axis), &views)
                    .map(Tensor::F64)
                    .map_err(stack_failed)
            }
            DType::F32 => {
                let arrays: Vec<ArrayD<f32>> = parts.iter().map(|p| p.f32_array()).collect();
                let views: Vec<_> = arrays.iter().map(|a| a.view()).collect();
                ndarray::stack(Axis(axis), &views)
                    .map(Tensor::F32)
                    .map_err(stack_failed)
            }
            DType::I32 => {
                let arrays: Vec<ArrayD<i32>> = parts.iter().map(|p| p.i32_array()).collect();
                let views: Vec<_> = arrays.iter().map(|a| a.view()).collect();
                ndarray::stack(Axis(axis), &views)
                    .map(Tensor::I32)
                    .map_err(stack_failed)
            }
        }
    }

    /// True when every element lies within `tolerance` of its nearest integer.
    ///
    /// Integer tensors sit exactly on the grid. The deviation of a NaN or infinite element is
    /// NaN and compares false, so a tensor containing non-finite values is never grid aligned.
    /// An empty tensor is on the grid (no element deviates).
    pub fn is_on_grid(&self, tolerance: f64) -> bool {
        fn near_integer(x: f64, tolerance: f64) -> bool {
            (x - x.round()).abs() <= tolerance
        }
        match self {
            Tensor::F32(a) => a.iter().all(|&x| near_integer(f64::from(x), tolerance)),
            Tensor::F64(a) => a.iter().all(|&x| near_integer(x, tolerance)),
            Tensor::I32(_) => true,
        }
    }

    /// Elementwise comparison within an absolute tolerance.
    ///
    /// Shapes must match exactly (no broadcasting); mixed dtypes compare through `f64`.
    pub fn allclose(&self, other: &Tensor, atol: f64) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        let lhs = self.f64_array();
        let rhs = other.f64_array();
        lhs.iter()
            .zip(rhs.iter())
            .all(|(a, b)| (a - b).abs() <= atol)
    }

    /// Contents widened to `f64`, in logical order.
    pub(crate) fn f64_array(&self) -> ArrayD<f64> {
        match self {
            Tensor::F32(a) => a.mapv(f64::from),
            Tensor::F64(a) => a.clone(),
            Tensor::I32(a) => a.mapv(f64::from),
        }
    }

    fn f32_array(&self) -> ArrayD<f32> {
        match self {
            Tensor::F32(a) => a.clone(),
            Tensor::F64(a) => a.mapv(|x| x as f32),
            Tensor::I32(a) => a.mapv(|x| x as f32),
        }
    }

    fn i32_array(&self) -> ArrayD<i32> {
        match self {
            Tensor::F32(a) => a.mapv(|x| x as i32),
            Tensor::F64(a) => a.mapv(|x| x as i32),
            Tensor::I32(a) => a.clone(),
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Shape inference
// -------------------------------------------------------------------------------------------------

/// Common broadcast shape of any number of shapes, numpy rules.
///
/// Shapes are right-aligned; a missing leading axis counts as length 1; two lengths are
/// compatible when equal or when one of them is 1, the larger winning.
///
/// Arguments
/// ---------
/// * `shapes`: the shapes to combine.
///
/// Return
/// ------
/// * The broadcast shape, or [`MrkitError::ShapeError`] naming the first axis on which two
///   lengths conflict.
pub fn broadcast_shapes(shapes: &[&[usize]]) -> Result<Shape, MrkitError> {
    let rank = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut out = Shape::from_elem(1, rank);
    for s in shapes {
        let offset = rank - s.len();
        for (i, &len) in s.iter().enumerate() {
            let axis = offset + i;
            if out[axis] == 1 {
                out[axis] = len;
            } else if len != 1 && len != out[axis] {
                return Err(MrkitError::ShapeError(format!(
                    "shapes {} are not broadcastable: axis {} has conflicting lengths {} and {}",
                    shapes.iter().map(|s| format_shape(s)).format(" and "),
                    axis,
                    out[axis],
                    len
                )));
            }
        }
    }
    Ok(out)
}

/// Render a shape as `(a, b, c)` for error messages.
pub(crate) fn format_shape(shape: &[usize]) -> String {
    format!("({})", shape.iter().format(", "))
}
