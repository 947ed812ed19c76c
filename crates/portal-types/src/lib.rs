//! Core types and traits for the Slurm web portal.
//!
//! Queue rows mirror the `squeue -o %i,%P,%j,%t,%M,%D,%R` field order used by the portal.

mod dto;
mod state;
mod traits;

pub use dto::*;
pub use state::JobState;
pub use traits::*;
