use crate::{FailureKind, FormRef, PollOutcome, RegionId, TaskHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A region was found in a loaded page and should become interactive.
    RegionMounted {
        name: String,
        base_url: String,
        markup: String,
    },
    /// User submitted a bound form with one of its actions.
    FormSubmitted {
        region: RegionId,
        form: FormRef,
        action: String,
    },
    /// The initiating request finished. `dispatch` echoes the `Effect::Initiate` it answers.
    TaskStarted {
        region: RegionId,
        dispatch: u64,
        result: Result<TaskHandle, FailureKind>,
    },
    /// One poll attempt finished.
    PollFinished {
        region: RegionId,
        task_id: String,
        outcome: PollOutcome,
    },
    /// User navigated away or aborted the wait.
    CancelRequested { region: RegionId },
    /// The region is gone; nothing may be scheduled against it.
    RegionDisposed { region: RegionId },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
