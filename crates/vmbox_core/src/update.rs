use vmbox_logging::{vmbox_debug, vmbox_info, vmbox_warn};

use crate::{AppState, Effect, FailureKind, FormRef, Msg, PollOutcome, RegionId, TaskHandle};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::RegionMounted {
            name,
            base_url,
            markup,
        } => {
            state.mount_region(name, &base_url, &markup);
            Vec::new()
        }
        Msg::FormSubmitted {
            region,
            form,
            action,
        } => dispatch(&mut state, region, form, &action),
        Msg::TaskStarted {
            region,
            dispatch,
            result,
        } => task_started(&mut state, region, dispatch, result),
        Msg::PollFinished {
            region,
            task_id,
            outcome,
        } => poll_finished(&mut state, region, &task_id, outcome),
        Msg::CancelRequested { region } => {
            let Some(target) = state.region_mut(region) else {
                return (state, Vec::new());
            };
            if !target.is_busy() {
                return (state, Vec::new());
            }
            let handle = target.release();
            vmbox_info!(
                "Region #{} cancelled while waiting on task {:?}",
                region,
                handle.map(|h| h.task_id)
            );
            state.mark_dirty();
            vec![Effect::CancelPoll { region }]
        }
        Msg::RegionDisposed { region } => match state.remove_region(region) {
            Some(removed) if removed.is_busy() => {
                vmbox_info!("Region #{} disposed while busy", region);
                vec![Effect::CancelPoll { region }]
            }
            _ => Vec::new(),
        },
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn dispatch(state: &mut AppState, region: RegionId, form: FormRef, action: &str) -> Vec<Effect> {
    let Some(target) = state.region_mut(region) else {
        vmbox_warn!("Submit for unknown region #{} ignored", region);
        return Vec::new();
    };
    if target.is_busy() {
        vmbox_debug!("Region #{} is busy; submit of {:?} ignored", region, action);
        return Vec::new();
    }
    let Some(bound) = target.form(form) else {
        vmbox_warn!(
            "Region #{} has no bound form {:?} (generation {}); submit ignored",
            region,
            form,
            target.generation()
        );
        return Vec::new();
    };
    if !bound.offers(action) {
        vmbox_warn!("Form {:?} in region #{} does not offer {:?}", form, region, action);
        return Vec::new();
    }

    let pending = bound.pending(action);
    let dispatch = target.set_busy();
    vmbox_info!(
        "Region #{} busy: dispatching {:?} to {}",
        region,
        pending.action_name,
        pending.endpoint_url
    );
    state.mark_dirty();
    vec![Effect::Initiate {
        region,
        dispatch,
        action: pending,
    }]
}

fn task_started(
    state: &mut AppState,
    region: RegionId,
    dispatch: u64,
    result: Result<TaskHandle, FailureKind>,
) -> Vec<Effect> {
    let delay = state.config().poll_interval;
    let config = state.config().clone();
    let Some(target) = state.region_mut(region) else {
        return Vec::new();
    };
    if !target.awaits_start(dispatch) {
        vmbox_debug!(
            "Late initiation result for region #{} (dispatch {}, current {}) ignored",
            region,
            dispatch,
            target.dispatch()
        );
        return Vec::new();
    }

    let effects = match result {
        Ok(handle) => {
            vmbox_info!("Region #{} watching task {}", region, handle.task_id);
            target.attach_task(handle.clone());
            vec![Effect::SchedulePoll {
                region,
                handle,
                delay,
            }]
        }
        Err(kind) => {
            vmbox_warn!("Region #{} initiation failed: {}", region, kind);
            target.show_error(kind, &config);
            Vec::new()
        }
    };
    state.mark_dirty();
    effects
}

fn poll_finished(
    state: &mut AppState,
    region: RegionId,
    task_id: &str,
    outcome: PollOutcome,
) -> Vec<Effect> {
    let config = state.config().clone();
    let Some(target) = state.region_mut(region) else {
        return Vec::new();
    };
    if !target.owns_task(task_id) {
        vmbox_debug!("Stale poll result for task {} in region #{} ignored", task_id, region);
        return Vec::new();
    }

    let effects = match outcome {
        PollOutcome::Pending => {
            let attempts = target.record_pending();
            match config.max_poll_attempts {
                Some(limit) if attempts >= limit => {
                    vmbox_warn!(
                        "Task {} still pending after {} attempts; giving up",
                        task_id,
                        attempts
                    );
                    target.show_error(FailureKind::PollTimeout { attempts }, &config);
                    Vec::new()
                }
                _ => {
                    vmbox_debug!("Task {} pending (attempt {}), polling again", task_id, attempts);
                    match target.active_task() {
                        Some(handle) => vec![Effect::SchedulePoll {
                            region,
                            handle: handle.clone(),
                            delay: config.poll_interval,
                        }],
                        None => Vec::new(),
                    }
                }
            }
        }
        PollOutcome::Completed(markup) => {
            target.release();
            target.bind(&markup, &config);
            vmbox_info!(
                "Task {} completed; region #{} idle with {} bound form(s)",
                task_id,
                region,
                target.forms().len()
            );
            Vec::new()
        }
        PollOutcome::Failed(kind) => {
            vmbox_warn!("Task {} failed in region #{}: {}", task_id, region, kind);
            target.show_error(kind, &config);
            Vec::new()
        }
    };
    state.mark_dirty();
    effects
}
