//! The pufferfish agent and its decision procedures.
//!
//! This crate owns everything the agent does between receiving a sensor
//! vector and returning a response. Applying that response to the world is
//! the simulation core's job.
//!
//! # Modules
//!
//! - [`autopilot`] -- Deterministic spiral-then-spokes terrain shaping ([`Autopilot`])
//! - [`classifier`] -- Classifier boundary and the reference perceptron ([`MlpTrainer`])
//! - [`config`] -- Tunables for the agent, autopilot, and classifier
//! - [`driver`] -- The [`Driver`] capability and the non-autopilot drivers
//! - [`error`] -- Error types for agent operations ([`AgentError`])
//! - [`pufferfish`] -- The agent and its sense-act cycle ([`Pufferfish`])
//! - [`spokes`] -- Spoke path generation for the autopilot

pub mod autopilot;
pub mod classifier;
pub mod config;
pub mod driver;
pub mod error;
pub mod pufferfish;
pub mod spokes;

// Re-export primary types at crate root for convenience.
pub use autopilot::{Autopilot, Phase};
pub use classifier::{Classifier, ClassifierError, ClassifierTrainer, Mlp, MlpTrainer, TrainingSample};
pub use config::{AutopilotConfig, ClassifierConfig, PufferfishConfig};
pub use driver::{ClassifierDriver, Driver, DriverContext, ManualDriver, MetamorphDbDriver};
pub use error::AgentError;
pub use pufferfish::Pufferfish;
