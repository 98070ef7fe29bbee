use crate::engine::Mode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowStage {
    LoadingSettings,
    StepStarted,
    StepSkipped,
    StepFinished,
    Completed,
}

#[derive(Debug, Clone)]
pub struct WorkflowEvent {
    pub mode: Mode,
    pub stage: WorkflowStage,
    pub step_index: Option<usize>,
    pub step_name: Option<String>,
    pub message: Option<String>,
}

impl WorkflowEvent {
    pub fn stage(mode: Mode, stage: WorkflowStage, message: Option<String>) -> Self {
        Self {
            mode,
            stage,
            step_index: None,
            step_name: None,
            message,
        }
    }

    pub fn step(mode: Mode, stage: WorkflowStage, index: usize, name: &str) -> Self {
        Self {
            mode,
            stage,
            step_index: Some(index),
            step_name: Some(name.to_string()),
            message: None,
        }
    }
}

pub type ProgressCallback<'a> = Option<&'a mut dyn FnMut(WorkflowEvent)>;

pub(crate) fn emit(progress: &mut ProgressCallback<'_>, event: WorkflowEvent) {
    if let Some(cb) = progress.as_deref_mut() {
        cb(event);
    }
}
