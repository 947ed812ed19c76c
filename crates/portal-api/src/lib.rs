//! Web front-end for submitting, listing and cancelling Slurm jobs.

pub mod config;
pub mod html;
pub mod server;
pub mod session;
