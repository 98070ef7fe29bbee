//! myna-workflow: the `config`, `run` and `sync` passes over a settings
//! document, plus the `status` report.

pub mod config;
pub mod engine;
pub mod error;
pub mod progress;
pub mod status;

pub use config::{CASE_DATA_FILE, ConfigOptions, case_data};
pub use engine::{Mode, StepOutcome, StepStatus, Workflow, WorkflowSummary};
pub use error::{WorkflowError, WorkflowResult};
pub use progress::{ProgressCallback, WorkflowEvent, WorkflowStage};
pub use status::status_markdown;
