use std::sync::Arc;

use crate::error::TransportError;
use crate::model::PollSnapshot;

/// Everything the status screen shows besides the session phase.
///
/// Values are never edited in place; each poll result or notice produces a
/// new `ViewState` that replaces the previous one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    /// Latest successful poll. `None` until the first one in this session.
    pub snapshot: Option<Arc<PollSnapshot>>,
    pub last_poll_error: Option<String>,
    pub consecutive_poll_failures: u32,
    /// Transient message from the last failed or rejected operator action.
    pub notice: Option<String>,
}

impl ViewState {
    pub fn with_snapshot(&self, snapshot: PollSnapshot) -> Self {
        Self {
            snapshot: Some(Arc::new(snapshot)),
            last_poll_error: None,
            consecutive_poll_failures: 0,
            notice: self.notice.clone(),
        }
    }

    /// Record a failed tick; the previous snapshot stays visible.
    pub fn with_poll_failure(&self, err: &TransportError) -> Self {
        Self {
            snapshot: self.snapshot.clone(),
            last_poll_error: Some(err.to_string()),
            consecutive_poll_failures: self.consecutive_poll_failures.saturating_add(1),
            notice: self.notice.clone(),
        }
    }

    pub fn with_notice(&self, notice: impl Into<String>) -> Self {
        Self {
            notice: Some(notice.into()),
            ..self.clone()
        }
    }

    pub fn without_notice(&self) -> Self {
        Self {
            notice: None,
            ..self.clone()
        }
    }
}
