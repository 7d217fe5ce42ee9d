//! Force-directed embedding of pairwise interaction matrices into
//! Rydberg-analog register coordinates, plus the scale-invariant unit
//! converter binding the physical time/energy/distance triple.
//!
//! The embedder ([`embedder::embed_matrix`] / [`embedder::embed_graph`])
//! drives a multi-round, multi-dimensional relaxation (see [`schedule`])
//! that projects a target interaction matrix down to 2-D coordinates whose
//! induced `r^-6` interactions track it up to a global scale, subject to a
//! minimum pairwise distance and a maximum radial confinement. The
//! [`converter`] module holds the companion physics-unit bookkeeping.

pub mod cancel;
pub mod config;
pub mod converter;
pub mod embedder;
pub mod error;
pub mod force;
pub mod geometry;
pub mod observer;
pub mod scale;
pub mod schedule;

pub use cancel::CancellationToken;
pub use config::{DistanceWalkSchedule, EmbedderConfig, Schedule};
pub use converter::Converter;
pub use embedder::{embed_graph, embed_matrix, embed_matrix_with, validate, EmbedOutcome, InteractionGraph};
pub use error::{BladeError, BladeResult, ConvergenceWarning};
pub use observer::{NoopObserver, Observer, StepEvent};
