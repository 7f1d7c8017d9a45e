use vmbox_core::{extract_region, FailureKind, Msg, PollOutcome, RegionId, TaskHandle};
use vmbox_logging::vmbox_warn;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TaskError {
    pub kind: FailureKind,
    pub message: String,
}

impl TaskError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to build http client: {0}")]
    Client(#[from] TaskError),
    #[error("failed to start engine runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("engine event loop has stopped")]
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    PageLoaded {
        name: String,
        url: String,
        result: Result<String, TaskError>,
    },
    TaskStarted {
        region: RegionId,
        dispatch: u64,
        result: Result<TaskHandle, TaskError>,
    },
    PollFinished {
        region: RegionId,
        task_id: String,
        result: Result<PollOutcome, TaskError>,
    },
}

impl EngineEvent {
    /// Maps the event to a core message. Only a failed page load is an error;
    /// task failures become failed outcomes for the owning region.
    pub fn into_msg(self) -> Result<Msg, TaskError> {
        match self {
            EngineEvent::PageLoaded { name, url, result } => {
                let page = result?;
                let markup = extract_region(&page, &name).unwrap_or_else(|| {
                    vmbox_warn!("No element #{} in {}; mounting the whole page", name, url);
                    page
                });
                Ok(Msg::RegionMounted {
                    name,
                    base_url: url,
                    markup,
                })
            }
            EngineEvent::TaskStarted {
                region,
                dispatch,
                result,
            } => Ok(Msg::TaskStarted {
                region,
                dispatch,
                result: result.map_err(|err| err.kind),
            }),
            EngineEvent::PollFinished {
                region,
                task_id,
                result,
            } => Ok(Msg::PollFinished {
                region,
                task_id,
                outcome: result.unwrap_or_else(|err| PollOutcome::Failed(err.kind)),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use vmbox_core::{FailureKind, Msg, PollOutcome};

    use super::{EngineEvent, TaskError};

    #[test]
    fn transport_errors_become_failed_outcomes() {
        let event = EngineEvent::PollFinished {
            region: 1,
            task_id: "t".to_string(),
            result: Err(TaskError::new(FailureKind::Network, "connection refused")),
        };
        assert_eq!(
            event.into_msg(),
            Ok(Msg::PollFinished {
                region: 1,
                task_id: "t".to_string(),
                outcome: PollOutcome::Failed(FailureKind::Network),
            })
        );
    }

    #[test]
    fn initiation_reply_keeps_its_dispatch() {
        let event = EngineEvent::TaskStarted {
            region: 2,
            dispatch: 5,
            result: Err(TaskError::new(FailureKind::InitiationStatus(500), "server error")),
        };
        assert_eq!(
            event.into_msg(),
            Ok(Msg::TaskStarted {
                region: 2,
                dispatch: 5,
                result: Err(FailureKind::InitiationStatus(500)),
            })
        );
    }

    #[test]
    fn page_load_extracts_named_region() {
        let event = EngineEvent::PageLoaded {
            name: "scenario_sidebar".to_string(),
            url: "http://lab.example/".to_string(),
            result: Ok("<body><div id=\"scenario_sidebar\"><p>vm</p></div></body>".to_string()),
        };
        assert_eq!(
            event.into_msg(),
            Ok(Msg::RegionMounted {
                name: "scenario_sidebar".to_string(),
                base_url: "http://lab.example/".to_string(),
                markup: "<p>vm</p>".to_string(),
            })
        );
    }

    #[test]
    fn failed_page_load_is_an_error() {
        let event = EngineEvent::PageLoaded {
            name: "sidebar".to_string(),
            url: "http://lab.example/".to_string(),
            result: Err(TaskError::new(FailureKind::PageStatus(403), "forbidden")),
        };
        assert_eq!(event.into_msg().unwrap_err().kind, FailureKind::PageStatus(403));
    }
}
