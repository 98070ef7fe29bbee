use core::fmt;
use core::num::NonZeroU32;

/// Creation number of a component within one engine run, starting at 1.
///
/// Ids only order components; the step's position in `steps` is tracked
/// separately by the engine as `MYNA_STEP_INDEX`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(NonZeroU32);

impl StepId {
    /// Creation number, 1 for the first component of a run.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepId(#{})", self.get())
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.get())
    }
}

/// Monotonic source of [`StepId`]s.
///
/// Owned by whoever creates components (normally the workflow engine) and
/// passed by `&mut` into constructors, so two engines or two tests never
/// share numbering.
#[derive(Debug, Default, Clone)]
pub struct StepCounter {
    issued: u32,
}

impl StepCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next id. Saturates at `u32::MAX`.
    pub fn next_id(&mut self) -> StepId {
        self.issued = self.issued.saturating_add(1);
        StepId(NonZeroU32::MIN.saturating_add(self.issued - 1))
    }

    /// Number of ids issued so far.
    pub fn issued(&self) -> u32 {
        self.issued
    }
}
