//! # Constants and type definitions for mrkit
//!
//! This module centralizes the **default tolerances**, **sampling constants**, and **common type
//! definitions** used throughout the `mrkit` library.
//!
//! ## Overview
//!
//! - Default tolerances for grid detection and repeat detection
//! - Golden-section constants used by the radial trajectory calculators
//! - Core type aliases used across the crate
//!
//! These definitions are used by the trajectory container, the type classifier and the
//! trajectory calculators.

use smallvec::SmallVec;

// -------------------------------------------------------------------------------------------------
// Default tolerances
// -------------------------------------------------------------------------------------------------

/// Default tolerance for grid detection: a sample counts as grid-aligned when its distance to the
/// nearest integer does not exceed this value
pub const DEFAULT_GRID_DETECTION_TOLERANCE: f64 = 1e-3;

/// Default tolerance for repeat detection when a trajectory is built from three coordinate arrays
pub const DEFAULT_REPEAT_DETECTION_TOLERANCE: f64 = 1e-3;

/// Default tolerance for repeat detection when a trajectory is built from a stacked tensor.
/// Tighter than the direct path: the stacked form has usually been materialized at full
/// broadcast shape, so only exact repeats should collapse
pub const STACKED_REPEAT_DETECTION_TOLERANCE: f64 = 1e-8;

// -------------------------------------------------------------------------------------------------
// Trajectory layout
// -------------------------------------------------------------------------------------------------

/// Minimum rank of a trajectory's broadcast shape: the logical axes (other, k2, k1, k0)
pub const MIN_TRAJECTORY_RANK: usize = 4;

// -------------------------------------------------------------------------------------------------
// Golden-section sampling constants
// -------------------------------------------------------------------------------------------------

/// Golden ratio φ = (1 + √5) / 2
pub const GOLDEN_RATIO: f64 = 1.618033988749895;

/// Golden angle in radians (π × 0.618034), the azimuthal increment giving near-uniform angular
/// coverage for any number of radial lines
pub const GOLDEN_ANGLE: f64 = std::f64::consts::PI * 0.618034;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Array shape stored inline. Trajectory ranks stay small (4 or 5 axes in practice), so shape
/// arithmetic never needs a heap allocation
pub type Shape = SmallVec<[usize; 8]>;
