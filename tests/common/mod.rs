use mrkit::tensor::Tensor;
use mrkit::trajectory::calculators::FullSampling;
use ndarray::{ArrayD, IxDyn};

/// Readout-shaped tensor `(1, 1, 1, n)` holding `values`.
pub fn line_tensor(values: &[f32]) -> Tensor {
    let shape = IxDyn(&[1, 1, 1, values.len()]);
    Tensor::from(ArrayD::from_shape_vec(shape, values.to_vec()).expect("shape matches data"))
}

/// The fully sampled acquisition the calculator tests run on: 200 readout samples, 20 k1
/// phase-encoding steps, 10 k2 lines.
pub fn rpe_sampling() -> FullSampling {
    FullSampling::new(200, 20, 10).expect("extents are nonzero")
}

/// Assert two tensors agree in shape and elementwise within `atol`.
pub fn assert_tensors_close(actual: &Tensor, expected: &Tensor, atol: f64) {
    assert_eq!(
        actual.shape(),
        expected.shape(),
        "shapes differ: {:?} vs {:?}",
        actual.shape(),
        expected.shape()
    );
    assert!(
        actual.allclose(expected, atol),
        "tensors differ beyond atol {atol}"
    );
}
