use std::collections::BTreeMap;

use url::Url;
use vmbox_logging::{vmbox_info, vmbox_warn};

use crate::binder::{scan_forms, ActionForm, FormRef};
use crate::view_model::{AppViewModel, FormView, RegionView};
use crate::{CoreConfig, FailureKind, RegionId, RegionStatus, TaskHandle};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    config: CoreConfig,
    regions: BTreeMap<RegionId, Region>,
    next_region_id: RegionId,
    dirty: bool,
}

/// A swappable subtree of the page, owned by at most one poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    base_url: Url,
    status: RegionStatus,
    content: String,
    generation: u64,
    forms: Vec<ActionForm>,
    dispatch: u64,
    active_task: Option<TaskHandle>,
    poll_attempts: u32,
    last_failure: Option<FailureKind>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            regions: self.regions.values().map(Region::view).collect(),
            dirty: self.dirty,
        }
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(&id)
    }

    pub fn region_by_name(&self, name: &str) -> Option<RegionId> {
        self.regions
            .values()
            .find(|region| region.name == name)
            .map(|region| region.id)
    }

    /// Returns true once after any visible change.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn region_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.regions.get_mut(&id)
    }

    pub(crate) fn mount_region(&mut self, name: String, base_url: &str, markup: &str) -> Option<RegionId> {
        let base_url = match Url::parse(base_url) {
            Ok(url) => url,
            Err(err) => {
                vmbox_warn!("Cannot mount region {} with base url {:?}: {}", name, base_url, err);
                return None;
            }
        };
        self.next_region_id += 1;
        let id = self.next_region_id;
        let mut region = Region {
            id,
            name,
            base_url,
            status: RegionStatus::Idle,
            content: String::new(),
            generation: 0,
            forms: Vec::new(),
            dispatch: 0,
            active_task: None,
            poll_attempts: 0,
            last_failure: None,
        };
        region.bind(markup, &self.config);
        vmbox_info!(
            "Mounted region {} as #{} with {} bound form(s)",
            region.name,
            id,
            region.forms.len()
        );
        self.regions.insert(id, region);
        self.mark_dirty();
        Some(id)
    }

    pub(crate) fn remove_region(&mut self, id: RegionId) -> Option<Region> {
        let removed = self.regions.remove(&id);
        if removed.is_some() {
            self.mark_dirty();
        }
        removed
    }
}

impl Region {
    pub fn status(&self) -> RegionStatus {
        self.status
    }

    pub fn is_busy(&self) -> bool {
        self.status == RegionStatus::Busy
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn forms(&self) -> &[ActionForm] {
        &self.forms
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn form(&self, form: FormRef) -> Option<&ActionForm> {
        if form.generation != self.generation {
            return None;
        }
        self.forms.get(form.index)
    }

    /// Sequence number of the most recent dispatch; initiation replies carry it back.
    pub fn dispatch(&self) -> u64 {
        self.dispatch
    }

    pub fn active_task(&self) -> Option<&TaskHandle> {
        self.active_task.as_ref()
    }

    pub fn poll_attempts(&self) -> u32 {
        self.poll_attempts
    }

    pub fn last_failure(&self) -> Option<&FailureKind> {
        self.last_failure.as_ref()
    }

    /// Replaces the content and rebinds every submittable form inside it.
    pub(crate) fn bind(&mut self, markup: &str, config: &CoreConfig) {
        self.content = markup.to_string();
        self.generation += 1;
        self.forms = scan_forms(
            markup,
            &self.base_url,
            &config.form_name,
            &config.credential_field,
        );
    }

    pub(crate) fn set_busy(&mut self) -> u64 {
        self.dispatch += 1;
        self.status = RegionStatus::Busy;
        self.active_task = None;
        self.poll_attempts = 0;
        self.last_failure = None;
        self.dispatch
    }

    /// True while the region waits on the initiation reply of `dispatch`.
    pub(crate) fn awaits_start(&self, dispatch: u64) -> bool {
        self.is_busy() && self.active_task.is_none() && self.dispatch == dispatch
    }

    pub(crate) fn attach_task(&mut self, handle: TaskHandle) {
        self.active_task = Some(handle);
        self.poll_attempts = 0;
    }

    pub(crate) fn owns_task(&self, task_id: &str) -> bool {
        self.is_busy()
            && self
                .active_task
                .as_ref()
                .is_some_and(|handle| handle.task_id == task_id)
    }

    pub(crate) fn record_pending(&mut self) -> u32 {
        self.poll_attempts += 1;
        self.poll_attempts
    }

    /// Ends the poll loop; the region becomes Idle again.
    pub(crate) fn release(&mut self) -> Option<TaskHandle> {
        self.status = RegionStatus::Idle;
        self.active_task.take()
    }

    pub(crate) fn show_error(&mut self, kind: FailureKind, config: &CoreConfig) {
        self.release();
        self.content = config.error_marker.clone();
        self.generation += 1;
        self.forms.clear();
        self.last_failure = Some(kind);
    }

    fn view(&self) -> RegionView {
        let busy = self.is_busy();
        RegionView {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            spinner_visible: busy,
            content: (!busy).then(|| self.content.clone()),
            forms: self
                .forms
                .iter()
                .enumerate()
                .map(|(index, form)| FormView {
                    form: FormRef {
                        generation: self.generation,
                        index,
                    },
                    target_url: form.target_url.clone(),
                    actions: form.actions.clone(),
                })
                .collect(),
            last_failure: self.last_failure.clone(),
            poll_attempts: self.poll_attempts,
        }
    }
}
