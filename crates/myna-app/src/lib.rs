//! myna-app: shared behavior for the interface programs that the workflow
//! launches for each step.
//!
//! Contains:
//! - args (the command line contract every interface program accepts)
//! - app (the [`MynaApp`] context: settings, template copy, subprocess launch)
//! - exec (executable lookup on `PATH`)
//! - batch (admission of parallel jobs against a processor budget)
//! - script_call (rebuilding a command line with defaults filled in)

pub mod app;
pub mod args;
pub mod batch;
pub mod error;
pub mod exec;
pub mod script_call;

pub use app::{AppContext, MynaApp, wait_for_success};
pub use args::AppArgs;
pub use batch::BatchQueue;
pub use error::{AppError, AppResult};
pub use exec::{find_executable, is_executable};
pub use script_call::script_call_with_defaults;
