//! myna-components: the contract of each workflow step class and the
//! lifecycle of a step from settings to validated outputs.

pub mod axis;
pub mod command;
pub mod component;
pub mod error;
pub mod registry;
pub mod spec;
pub mod state;
pub mod template;

pub use axis::Axis;
pub use component::{Case, Component, FileStatus, RunReport, StepContext};
pub use error::{ComponentError, ComponentResult};
pub use registry::ComponentRegistry;
pub use spec::ComponentSpec;
pub use state::ComponentState;
pub use template::CaseKey;
