use std::fmt;

/// Lifecycle of a component within one step iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    Unconfigured,
    Configured,
    Executed,
    SkippedExecute,
    PostProcessed,
    Checked,
}

impl ComponentState {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentState::Unconfigured => "unconfigured",
            ComponentState::Configured => "configured",
            ComponentState::Executed => "executed",
            ComponentState::SkippedExecute => "skipped-execute",
            ComponentState::PostProcessed => "post-processed",
            ComponentState::Checked => "checked",
        }
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: ComponentState) -> bool {
        use ComponentState::*;
        matches!(
            (self, next),
            (Unconfigured, Configured)
                | (Configured, Executed)
                | (Configured, SkippedExecute)
                | (Executed, PostProcessed)
                | (SkippedExecute, PostProcessed)
                | (PostProcessed, Checked)
        )
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::ComponentState::*;

    #[test]
    fn transitions_follow_lifecycle() {
        assert!(Unconfigured.can_advance_to(Configured));
        assert!(Configured.can_advance_to(SkippedExecute));
        assert!(SkippedExecute.can_advance_to(PostProcessed));
        assert!(PostProcessed.can_advance_to(Checked));

        assert!(!Unconfigured.can_advance_to(Executed));
        assert!(!Checked.can_advance_to(Configured));
        assert!(!Executed.can_advance_to(Checked));
    }
}
