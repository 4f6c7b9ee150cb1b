pub mod config;
pub mod diagram;
pub mod nn;
pub mod session;
pub mod surface;

pub use config::{LandscapeConfig, LandscapeConfigError};
pub use nn::{clamp_weight, forward, sigmoid, WeightParam, WeightSet};
pub use session::{AutoMode, CommandError, LandscapeSession};
pub use surface::{GridSample, SurfaceMesh, SurfaceStats};
