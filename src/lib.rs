//! # asterisk-mirror
//!
//! Drives a stepper motor through a cycle of kinetic animation routines.
//!
//! ## Features
//!
//! - **Configuration-driven**: Defaults layered with a TOML override file
//! - **embedded-hal 1.0**: STEP/DIR/ENABLE lines are `OutputPin`s
//! - **Interruptible motion**: Every rotation and wait stops at the next
//!   pulse boundary without losing position
//! - **Routines**: Morse code, position-in-year and fluctuating drift
//! - **Orchestration**: Routines switch on a fixed interval on a background
//!   worker thread
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use asterisk_mirror::{load_settings, MotorControllerBuilder, Orchestrator, SimulatedGpio};
//!
//! let settings = load_settings("/boot/asterisk-mirror.toml")?;
//!
//! let motor = MotorControllerBuilder::new()
//!     .from_settings(&settings)?
//!     .build(SimulatedGpio::new())?;
//!
//! let mut orchestrator = Orchestrator::new(&settings, Arc::new(motor))?;
//! orchestrator.start()?;
//! // ...
//! orchestrator.stop();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Error payloads are fixed-capacity heapless strings
#![allow(clippy::result_large_err)]

// Core modules
pub mod config;
pub mod error;
pub mod gpio;
pub mod motor;
pub mod orchestrator;
pub mod routine;

// Re-exports for ergonomic API
pub use config::{load_settings, validate_settings, ConfigStore, Settings};
pub use error::{Error, Result};
pub use gpio::{GpioDriver, PinAssignment, SimulatedGpio};
pub use motor::{Direction, MotorController, MotorControllerBuilder, Signal};
pub use orchestrator::Orchestrator;
pub use routine::{Routine, RoutineKind};
