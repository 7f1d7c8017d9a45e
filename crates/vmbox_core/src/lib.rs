//! Vmbox core: pure action/poll state machine, view binder and view-model helpers.
mod binder;
mod config;
mod effect;
mod msg;
pub mod spoiler;
mod state;
mod types;
mod update;
mod view_model;

pub use binder::{extract_region, scan_forms, ActionForm, FormRef, ACTION_FIELD};
pub use config::{
    CoreConfig, DEFAULT_CREDENTIAL_FIELD, DEFAULT_ERROR_MARKER, DEFAULT_FORM_NAME,
    DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL,
};
pub use effect::Effect;
pub use msg::Msg;
pub use spoiler::Spoilers;
pub use state::{AppState, Region};
pub use types::{
    FailureKind, PendingAction, PollOutcome, RegionId, RegionStatus, TaskHandle, TASK_ID_PARAM,
};
pub use update::update;
pub use view_model::{AppViewModel, FormView, RegionView};
