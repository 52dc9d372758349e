//! Core rust implementation of orsched, a crate for assigning surgical operations to operating
//! rooms.
//!
//! Operations that overlap in time can't share a room. Three approaches are provided on top of
//! the [`conflict::ConflictGraph`]:
//! - a first fit partition ([`partition`]) giving a feasible grouping quickly,
//! - a direct binary assignment model ([`scheduling::direct`]),
//! - a set covering model over schedules ([`scheduling::covering`]), grown on demand by column
//!   generation ([`scheduling::column_generation`]).
//!
//! Models are solved through the [`optimize::solvers::Solver`] trait.

pub mod configuration;
pub mod conflict;
pub mod logging;
pub mod model;
pub mod optimize;
pub mod partition;
pub mod scheduling;
mod utils;

pub use conflict::ConflictGraph;
pub use scheduling::SchedulingError;
