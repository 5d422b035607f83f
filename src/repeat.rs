//! Repeat detection: collapsing axes whose values are constant within a tolerance down to
//! broadcastable singletons. Applied to each coordinate array once, at trajectory construction.

use ndarray::{ArrayD, Axis, Slice};

use crate::mrkit_errors::MrkitError;
use crate::tensor::{format_shape, Tensor};

/// Collapse every repeated axis of `tensor` to length 1.
///
/// An axis counts as repeated when all values along it are within `tolerance` of the first
/// value of their lane, i.e. every slice along the axis equals slice 0 elementwise within the
/// tolerance. Collapsing keeps slice 0 as the representative, so the result broadcasts back to
/// the input shape. Axes of length 1 are trivially repeated and stay as they are.
///
/// When the tolerance is enabled, integer tensors are promoted to `f32` first so that a
/// trajectory always stores a uniform floating-point representation; tensors that are already
/// floating keep their dtype.
///
/// Arguments
/// ---------
/// * `tensor`: the array to scan.
/// * `tolerance`: maximum absolute difference for two values to count as equal. `None` disables
///   the scan entirely and returns the input unchanged, dtype included.
///
/// Return
/// ------
/// * The reduced tensor, or [`MrkitError::InvalidShape`] when the scan encounters an axis of
///   length 0.
pub fn remove_repeat(tensor: &Tensor, tolerance: Option<f64>) -> Result<Tensor, MrkitError> {
    let Some(tolerance) = tolerance else {
        return Ok(tensor.clone());
    };
    if let Some(axis) = tensor.shape().iter().position(|&len| len == 0) {
        return Err(MrkitError::InvalidShape(format!(
            "cannot scan shape {} for repeats: axis {} has length 0",
            format_shape(tensor.shape()),
            axis
        )));
    }
    let reduced = match tensor {
        Tensor::F32(a) => Tensor::F32(collapse_repeated_axes(a, tolerance)),
        Tensor::F64(a) => Tensor::F64(collapse_repeated_axes(a, tolerance)),
        Tensor::I32(a) => {
            let promoted = a.mapv(|x| x as f32);
            Tensor::F32(collapse_repeated_axes(&promoted, tolerance))
        }
    };
    Ok(reduced)
}

/// Scan the axes in order and collapse each repeated one, rescanning on the already collapsed
/// array so later axes see the smaller intermediate.
fn collapse_repeated_axes<A>(array: &ArrayD<A>, tolerance: f64) -> ArrayD<A>
where
    A: Copy + Into<f64>,
{
    let mut reduced = array.clone();
    for axis in 0..reduced.ndim() {
        if reduced.shape()[axis] > 1 && axis_is_constant(&reduced, axis, tolerance) {
            reduced = reduced.slice_axis(Axis(axis), Slice::from(0..1)).to_owned();
        }
    }
    reduced
}

/// True when every lane along `axis` holds a single value within the tolerance.
fn axis_is_constant<A>(array: &ArrayD<A>, axis: usize, tolerance: f64) -> bool
where
    A: Copy + Into<f64>,
{
    array.lanes(Axis(axis)).into_iter().all(|lane| {
        let first: f64 = lane[0].into();
        lane.iter().all(|&value| {
            let value: f64 = value.into();
            (value - first).abs() <= tolerance
        })
    })
}
