//! Job portal orchestration: prepares scripts, submits through the scheduler, and
//! attributes queued jobs to the interface users who submitted them.

mod error;
mod portal;
pub mod script;

pub use error::PortalError;
pub use portal::{JobPortal, PortalSettings, SubmitRequest};
pub use script::ScriptTemplate;
