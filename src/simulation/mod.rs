//! Pallet storage simulation: movement generation, template layout, and the
//! request pipeline that drives the workbook.

pub mod error;
pub mod layout;
pub mod movements;
pub mod pipeline;
pub mod types;

pub use error::{ErrorBody, SimulationError};
pub use movements::{generate, generate_with_rng, MovementPlan};
pub use pipeline::{PersistOptions, Simulator};
pub use types::*;
