//! Motor module for asterisk-mirror.
//!
//! Provides the stepper motor controller, its position tracking and the
//! interrupt signal that makes every rotation cancellable.

mod builder;
mod controller;
mod direction;
mod position;
mod signal;

pub use builder::{MotorControllerBuilder, DEFAULT_PULSE_UNIT};
pub use controller::MotorController;
pub use direction::Direction;
pub use position::{Position, DEFAULT_STEPS_PER_REVOLUTION};
pub use signal::Signal;
