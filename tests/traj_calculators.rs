use std::f64::consts::PI;

use mrkit::constants::GOLDEN_ANGLE;
use mrkit::trajectory::calculators::{
    CartesianCalculator, FullSampling, Radial2DCalculator, RpeCalculator,
    SunflowerGoldenRpeCalculator, TrajectoryCalculator,
};
use mrkit::{Tensor, TrajType};
use ndarray::Array3;

mod common;
use common::{assert_tensors_close, rpe_sampling};

#[test]
fn test_cartesian_full_grid() {
    let traj = CartesianCalculator.calculate(&rpe_sampling()).unwrap();

    // Each direction varies along exactly one axis and collapses everywhere else.
    assert_eq!(traj.kz().shape(), &[1, 10, 1, 1]);
    assert_eq!(traj.ky().shape(), &[1, 1, 20, 1]);
    assert_eq!(traj.kx().shape(), &[1, 1, 1, 200]);

    let on_grid = TrajType::ON_GRID;
    assert_eq!(traj.type_along_k210(), [on_grid, on_grid, on_grid]);

    assert_eq!(traj.as_tensor(0).unwrap().shape(), &[3, 1, 10, 20, 200]);
}

#[test]
fn test_rpe_golden_angle_shapes() {
    let traj = RpeCalculator::new(GOLDEN_ANGLE)
        .unwrap()
        .calculate(&rpe_sampling())
        .unwrap();

    assert_eq!(traj.kz().shape(), &[1, 10, 20, 1]);
    assert_eq!(traj.ky().shape(), &[1, 10, 20, 1]);
    assert_eq!(traj.kx().shape(), &[1, 1, 1, 200]);
}

#[test]
fn test_rpe_uniform_angle_halving() {
    // With half the angular increment, every second line reproduces the coarse pattern.
    let info = rpe_sampling();
    let num_lines: usize = 10;
    let coarse = RpeCalculator::with_shifts(PI / num_lines as f64, vec![0.0])
        .unwrap()
        .calculate(&info)
        .unwrap();
    let fine = RpeCalculator::with_shifts(PI / (2 * num_lines) as f64, vec![0.0])
        .unwrap()
        .calculate(&info)
        .unwrap();

    for line in 0..num_lines / 2 {
        for (a, b) in [
            (coarse.kz(), fine.kz()),
            (coarse.ky(), fine.ky()),
        ] {
            assert_tensors_close(
                &a.index_axis(1, line).unwrap(),
                &b.index_axis(1, 2 * line).unwrap(),
                1e-6,
            );
        }
    }
    assert_tensors_close(coarse.kx(), fine.kx(), 0.0);
}

#[test]
fn test_rpe_shift_list_modularity() {
    // A single shift entry behaves like the same value repeated for every line.
    let info = rpe_sampling();
    let single = RpeCalculator::with_shifts(GOLDEN_ANGLE, vec![0.25])
        .unwrap()
        .calculate(&info)
        .unwrap();
    let repeated = RpeCalculator::with_shifts(GOLDEN_ANGLE, vec![0.25, 0.25, 0.25, 0.25])
        .unwrap()
        .calculate(&info)
        .unwrap();

    assert_eq!(single.as_tensor(0).unwrap(), repeated.as_tensor(0).unwrap());
}

#[test]
fn test_sunflower_golden_rpe_broadcast() {
    let traj = SunflowerGoldenRpeCalculator::new(2.0)
        .unwrap()
        .calculate(&rpe_sampling())
        .unwrap();

    assert_eq!(traj.kz().shape(), &[1, 10, 20, 1]);
    assert_eq!(
        traj.broadcasted_shape().unwrap().as_slice(),
        &[1, 10, 20, 200]
    );
}

#[test]
fn test_radial_2d_first_spoke_is_readout() {
    let info = FullSampling::new(16, 8, 1).unwrap();
    let traj = Radial2DCalculator::default().calculate(&info).unwrap();

    assert_eq!(traj.kz().shape(), &[1, 1, 1, 1]);
    assert_eq!(traj.ky().shape(), &[1, 1, 8, 16]);
    assert_eq!(traj.kx().shape(), &[1, 1, 8, 16]);

    // Spoke 0 has angle 0: kx carries the plain readout line, ky is zero.
    let expected_kx = Tensor::from(
        Array3::from_shape_fn((1, 1, 16), |(_, _, i0)| i0 as f32 - 8.0).into_dyn(),
    );
    let expected_ky = Tensor::from(Array3::from_elem((1, 1, 16), 0.0_f32).into_dyn());
    assert_tensors_close(&traj.kx().index_axis(2, 0).unwrap(), &expected_kx, 0.0);
    assert_tensors_close(&traj.ky().index_axis(2, 0).unwrap(), &expected_ky, 0.0);

    // The rotated spokes visit fractional coordinates, so the in-plane directions are
    // neither single valued nor on grid; kz is a single grid point.
    let types = traj.type_along_kzyx();
    assert_eq!(types[0], TrajType::SINGLE_VALUE | TrajType::ON_GRID);
    assert_eq!(types[1], TrajType::empty());
    assert_eq!(types[2], TrajType::empty());
}
