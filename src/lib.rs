pub mod constants;
pub mod constraints;
pub mod mrkit_errors;
pub mod repeat;
pub mod tensor;
pub mod trajectory;

pub use mrkit_errors::MrkitError;
pub use tensor::{DType, Tensor};
pub use trajectory::traj_type::{TrajType, TrajTypeMatrix};
pub use trajectory::{KTrajectory, TrajectoryOptions};
