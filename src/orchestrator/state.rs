use super::error::FailureKind;

/// Stages of one clustering run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Loading,
    Validating,
    Optimizing,
    Committing,
    Formatting,
    Dispatching,
    Done,
    Failed(FailureKind),
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    /// Whether a run may fail while in this state
    pub fn can_fail(self) -> bool {
        matches!(
            self,
            Self::Loading | Self::Validating | Self::Optimizing | Self::Committing
        )
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub state: RunState,
    pub result_id: Option<i64>,
    /// Messages handed to the outbound channel
    pub messages_sent: usize,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Done
    }

    pub fn failure(&self) -> Option<FailureKind> {
        match self.state {
            RunState::Failed(kind) => Some(kind),
            _ => None,
        }
    }
}
