use std::time::Duration;

use crate::{PendingAction, RegionId, TaskHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// POST the action to its endpoint and report the task handle.
    Initiate {
        region: RegionId,
        dispatch: u64,
        action: PendingAction,
    },
    /// Wait `delay`, then check the task once.
    SchedulePoll {
        region: RegionId,
        handle: TaskHandle,
        delay: Duration,
    },
    /// Drop any scheduled or in-flight poll for the region.
    CancelPoll { region: RegionId },
}
