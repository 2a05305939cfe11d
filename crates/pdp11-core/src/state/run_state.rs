use crate::CoreError;

/// Top-level execution state of one CPU context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Ready to fetch the next instruction.
    #[default]
    Running,
    /// Stopped in `WAIT` until an interrupt above the current priority arrives.
    Waiting,
    /// Stopped by `HALT`; only a host reset resumes execution.
    Halted,
    /// An internal error is latched and no further progress is possible.
    Fatal(CoreError),
}

impl RunState {
    /// Returns the latched internal error, if any.
    #[must_use]
    pub const fn latched_error(self) -> Option<CoreError> {
        match self {
            Self::Fatal(err) => Some(err),
            Self::Running | Self::Waiting | Self::Halted => None,
        }
    }

    /// Returns `true` when the next step will fetch an instruction.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}
