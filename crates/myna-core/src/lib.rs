//! myna-core: shared foundation for the Myna workflow crates.
//!
//! Contains:
//! - error (shared error type)
//! - ids (step ids and the counter that hands them out)
//! - document (nested lookups on the settings document tree)
//! - conversion (string helpers used by the command line surface)
//! - env (environment variables exchanged with step subprocesses)

pub mod conversion;
pub mod document;
pub mod env;
pub mod error;
pub mod ids;

pub use conversion::{str_to_list, strf_datetime};
pub use env::{InstallPaths, StepEnvironment};
pub use error::{CoreError, CoreResult};
pub use ids::{StepCounter, StepId};
