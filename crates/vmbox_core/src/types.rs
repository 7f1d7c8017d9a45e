use std::fmt;

use url::Url;

pub type RegionId = u64;

/// Query parameter carrying the task identifier on every poll request.
pub const TASK_ID_PARAM: &str = "task_id";

/// One submitted action, consumed by the initiating request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub action_name: String,
    pub credential: String,
    pub endpoint_url: String,
}

/// A server-side task being watched by exactly one poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub task_id: String,
    pub check_url: String,
}

impl TaskHandle {
    pub fn new(task_id: impl Into<String>, check_url: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            check_url: check_url.into(),
        }
    }

    /// `check_url` with `task_id=<id>` appended, keeping any existing query.
    pub fn poll_url(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.check_url)?;
        url.query_pairs_mut()
            .append_pair(TASK_ID_PARAM, &self.task_id);
        Ok(url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Pending,
    Completed(String),
    Failed(FailureKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionStatus {
    #[default]
    Idle,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The initiating request answered with something other than 200.
    InitiationStatus(u16),
    /// The initiating response was not JSON or carried no `task_id`.
    MalformedResponse,
    /// No response was received.
    Network,
    Timeout,
    /// A poll answered with something other than 200 or 304.
    PollStatus(u16),
    /// The task stayed pending for the configured number of attempts.
    PollTimeout { attempts: u32 },
    TooLarge { max_bytes: u64, actual: Option<u64> },
    InvalidUrl,
    /// The page hosting the region could not be loaded.
    PageStatus(u16),
}

impl FailureKind {
    pub fn is_initiation(&self) -> bool {
        matches!(
            self,
            FailureKind::InitiationStatus(_) | FailureKind::MalformedResponse
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InitiationStatus(code) => write!(f, "initiation failed with status {code}"),
            FailureKind::MalformedResponse => write!(f, "malformed initiation response"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::PollStatus(code) => write!(f, "poll failed with status {code}"),
            FailureKind::PollTimeout { attempts } => {
                write!(f, "task still pending after {attempts} poll attempts")
            }
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::PageStatus(code) => write!(f, "page load failed with status {code}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TaskHandle;

    #[test]
    fn poll_url_appends_task_id() {
        let handle = TaskHandle::new("abc123", "http://lab.example/scenario/show/web");
        let url = handle.poll_url().unwrap();
        assert_eq!(url.as_str(), "http://lab.example/scenario/show/web?task_id=abc123");
    }

    #[test]
    fn poll_url_keeps_existing_query_and_escapes() {
        let handle = TaskHandle::new("a b&c", "http://lab.example/check?vm=1");
        let url = handle.poll_url().unwrap();
        assert_eq!(url.as_str(), "http://lab.example/check?vm=1&task_id=a+b%26c");
    }

    #[test]
    fn poll_url_rejects_relative_check_url() {
        let handle = TaskHandle::new("x", "/relative/only");
        assert!(handle.poll_url().is_err());
    }
}
