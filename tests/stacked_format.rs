use mrkit::constants::STACKED_REPEAT_DETECTION_TOLERANCE;
use mrkit::trajectory::calculators::{RpeCalculator, TrajectoryCalculator};
use mrkit::{DType, KTrajectory, MrkitError, Tensor, TrajectoryOptions};
use ndarray::{Array5, ArrayD, IxDyn};

mod common;
use common::{assert_tensors_close, rpe_sampling};

fn rpe_trajectory() -> KTrajectory {
    RpeCalculator::new(mrkit::constants::GOLDEN_ANGLE)
        .unwrap()
        .calculate(&rpe_sampling())
        .unwrap()
}

#[test]
fn test_as_tensor_materializes_broadcast() {
    let traj = rpe_trajectory();
    let stacked = traj.as_tensor(0).unwrap();

    assert_eq!(stacked.shape(), &[3, 1, 10, 20, 200]);
    assert_eq!(stacked.dtype(), DType::F32);

    // Slice 2 is kx expanded to the common shape.
    let full = traj.broadcasted_shape().unwrap();
    let expanded_kx = traj.kx().broadcast_to(&full).unwrap();
    assert_tensors_close(&stacked.index_axis(0, 2).unwrap(), &expanded_kx, 0.0);
}

#[test]
fn test_round_trip_recovers_components() {
    let traj = rpe_trajectory();
    let stacked = traj.as_tensor(0).unwrap();

    let round_trip = KTrajectory::from_stacked(&stacked).unwrap();
    assert_eq!(round_trip.kz(), traj.kz());
    assert_eq!(round_trip.ky(), traj.ky());
    assert_eq!(round_trip.kx(), traj.kx());
    assert_eq!(
        round_trip.repeat_detection_tolerance(),
        Some(STACKED_REPEAT_DETECTION_TOLERANCE)
    );
}

#[test]
fn test_split_keeps_full_size_components() {
    // A distinct value everywhere, so no axis reduces after the split.
    let stacked = Tensor::from(
        Array5::from_shape_fn((3, 1, 10, 20, 200), |(d, _, i2, i1, i0)| {
            (((d * 31 + i2) * 37 + i1) * 41 + i0) as f32 * 1e-3
        })
        .into_dyn(),
    );

    let traj = KTrajectory::from_stacked(&stacked).unwrap();
    assert_eq!(traj.kz().shape(), &[1, 10, 20, 200]);
    assert_eq!(traj.ky().shape(), &[1, 10, 20, 200]);
    assert_eq!(traj.kx().shape(), &[1, 10, 20, 200]);
}

#[test]
fn test_round_trip_with_trailing_stack_axis() {
    let traj = rpe_trajectory();
    let stacked = traj.as_tensor(4).unwrap();
    assert_eq!(stacked.shape(), &[1, 10, 20, 200, 3]);

    let round_trip =
        KTrajectory::from_stacked_with_options(&stacked, 4, TrajectoryOptions::stacked()).unwrap();
    assert_eq!(round_trip.kz(), traj.kz());
    assert_eq!(round_trip.kx(), traj.kx());

    // One past the rank is no longer a valid stacking position.
    assert!(matches!(
        traj.as_tensor(5),
        Err(MrkitError::InvalidShape(_))
    ));
}

#[test]
fn test_stacked_tolerance_only_collapses_exact_repeats() {
    // Slice 0 repeats exactly, slice 1 repeats within 1e-5, slice 2 varies.
    let values: Vec<f32> = vec![
        1.0, 1.0, 1.0, 1.0, // kz
        2.0, 2.00001, 2.0, 2.0, // ky
        0.0, 1.0, 2.0, 3.0, // kx
    ];
    let stacked = Tensor::from(
        ArrayD::from_shape_vec(IxDyn(&[3, 1, 1, 1, 4]), values).expect("shape matches data"),
    );

    let traj = KTrajectory::from_stacked(&stacked).unwrap();
    assert_eq!(traj.kz().shape(), &[1, 1, 1, 1]);
    assert_eq!(traj.ky().shape(), &[1, 1, 1, 4], "1e-5 exceeds the stacked tolerance");
    assert_eq!(traj.kx().shape(), &[1, 1, 1, 4]);

    // The loose direct-construction tolerance collapses the near-repeat as well.
    let direct = KTrajectory::new(
        stacked.index_axis(0, 0).unwrap(),
        stacked.index_axis(0, 1).unwrap(),
        stacked.index_axis(0, 2).unwrap(),
    )
    .unwrap();
    assert_eq!(direct.ky().shape(), &[1, 1, 1, 1]);
}
