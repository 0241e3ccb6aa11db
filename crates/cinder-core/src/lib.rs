//! cinder-core: Errors, configuration, and stepping clock shared across
//! the cinder scene/physics crates.

pub mod config;
pub mod error;
pub mod time;

pub use config::PhysicsConfig;
pub use error::{CinderError, ConfigError, SceneError};
pub use time::{StepClock, StepPlan};
