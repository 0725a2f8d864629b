use serde::Serialize;

/// Lifecycle of an attempt. There is no way back from `Submitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Running,
    Submitted,
}

/// Aggregated view of session progress, published on every tick and action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    /// Zero-based index of the current question.
    pub position: usize,
    pub remaining_secs: u32,
    pub time_limit_secs: u32,
    pub state: SessionState,
}

impl SessionProgress {
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.state == SessionState::Submitted
    }
}
