//! # Trajectory type classification
//!
//! A trajectory is classified per coordinate array (kz, ky, kx) and per trailing logical axis
//! (k2, k1, k0) into a pair of independent flags: is the sampling a single point along that
//! axis, and does it lie on the integer k-space grid. The result is a 3×3 matrix of flag sets,
//! from which two reduced views are derived by bitwise AND: one type per physical direction and
//! one type per logical axis. Downstream reconstruction uses these to pick between grid-based
//! and non-uniform transforms.
//!
//! ## Overview
//!
//! - [`TrajType`]: the flag pair (`SINGLE_VALUE`, `ON_GRID`)
//! - [`TrajTypeMatrix`]: the full 3×3 classification with its two AND-reduced views
//!
//! Grid detection is a whole-array property: when every element of a coordinate array is within
//! tolerance of an integer, all three of that array's axes inherit `ON_GRID`. Single-value
//! detection is per-axis: an axis of length 1 is always `SINGLE_VALUE` and counts as trivially
//! `ON_GRID` no matter where its one sample sits. Only exact integer lattices are recognized;
//! evenly spaced fractional grids (half-integer steps and the like) classify as off-grid.
//!
//! ## See also
//!
//! * [`crate::trajectory::KTrajectory::traj_type_matrix`] – classification entry point.

use bitflags::bitflags;

use crate::tensor::Tensor;

bitflags! {
    /// Flag pair describing the sampling pattern along one axis of one coordinate array.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TrajType: u8 {
        /// The axis holds a single sample (length 1).
        const SINGLE_VALUE = 1 << 0;
        /// Every sample of the array lies on the integer grid within tolerance.
        const ON_GRID = 1 << 1;
    }
}

impl TrajType {
    /// True when the `SINGLE_VALUE` flag is set.
    pub fn is_single_value(self) -> bool {
        self.contains(TrajType::SINGLE_VALUE)
    }

    /// True when the `ON_GRID` flag is set.
    pub fn is_on_grid(self) -> bool {
        self.contains(TrajType::ON_GRID)
    }
}

impl std::fmt::Display for TrajType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.is_single_value(), self.is_on_grid()) {
            (true, true) => write!(f, "single value, on grid"),
            (true, false) => write!(f, "single value"),
            (false, true) => write!(f, "on grid"),
            (false, false) => write!(f, "arbitrary"),
        }
    }
}

/// Full 3×3 classification of a trajectory.
///
/// Rows are the physical directions in order (kz, ky, kx); columns are the logical sampling
/// axes in order (k2, k1, k0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrajTypeMatrix {
    cells: [[TrajType; 3]; 3],
}

/// Fixed-arity AND fold used by both reduced views.
fn and3(a: TrajType, b: TrajType, c: TrajType) -> TrajType {
    a & b & c
}

impl TrajTypeMatrix {
    /// Build a matrix from explicit cells (rows kz, ky, kx; columns k2, k1, k0).
    pub fn new(cells: [[TrajType; 3]; 3]) -> Self {
        TrajTypeMatrix { cells }
    }

    /// All nine cells.
    pub fn cells(&self) -> &[[TrajType; 3]; 3] {
        &self.cells
    }

    /// Type per physical direction, in order (kz, ky, kx).
    ///
    /// Each entry is the AND of its row: a direction is `SINGLE_VALUE` only if single-valued
    /// along every logical axis, `ON_GRID` only if on-grid along every logical axis.
    pub fn type_along_kzyx(&self) -> [TrajType; 3] {
        [
            and3(self.cells[0][0], self.cells[0][1], self.cells[0][2]),
            and3(self.cells[1][0], self.cells[1][1], self.cells[1][2]),
            and3(self.cells[2][0], self.cells[2][1], self.cells[2][2]),
        ]
    }

    /// Type per logical axis, in order (k2, k1, k0).
    ///
    /// Each entry is the AND of its column across the three physical directions.
    pub fn type_along_k210(&self) -> [TrajType; 3] {
        [
            and3(self.cells[0][0], self.cells[1][0], self.cells[2][0]),
            and3(self.cells[0][1], self.cells[1][1], self.cells[2][1]),
            and3(self.cells[0][2], self.cells[1][2], self.cells[2][2]),
        ]
    }
}

/// Classify the three coordinate arrays against a grid detection tolerance.
///
/// Pure function of the current tensor contents; nothing is cached, callers recompute whenever
/// values or the tolerance change. Grid membership is evaluated once per whole array; the
/// per-axis loop only adds the length-1 forcing.
pub(crate) fn traj_type_matrix(
    kz: &Tensor,
    ky: &Tensor,
    kx: &Tensor,
    tolerance: f64,
) -> TrajTypeMatrix {
    let mut cells = [[TrajType::empty(); 3]; 3];
    for (row, tensor) in [kz, ky, kx].into_iter().enumerate() {
        let on_grid = tensor.is_on_grid(tolerance);
        for (col, cell) in cells[row].iter_mut().enumerate() {
            if trailing_axis_len(tensor, col) == 1 {
                *cell |= TrajType::SINGLE_VALUE | TrajType::ON_GRID;
            }
            if on_grid {
                *cell |= TrajType::ON_GRID;
            }
        }
    }
    TrajTypeMatrix::new(cells)
}

/// Length of the logical axis for matrix column `col` (0 is k2, third from the end; 2 is k0,
/// the last axis). An axis the array does not carry counts as length 1, matching broadcast
/// left-padding.
fn trailing_axis_len(tensor: &Tensor, col: usize) -> usize {
    let shape = tensor.shape();
    let offset = 3 - col;
    if shape.len() >= offset {
        shape[shape.len() - offset]
    } else {
        1
    }
}
