use crate::{FailureKind, FormRef, RegionId, RegionStatus};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub regions: Vec<RegionView>,
    pub dirty: bool,
}

impl AppViewModel {
    pub fn region(&self, id: RegionId) -> Option<&RegionView> {
        self.regions.iter().find(|region| region.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionView {
    pub id: RegionId,
    pub name: String,
    pub status: RegionStatus,
    /// Progress indicator; shown exactly while the region is Busy.
    pub spinner_visible: bool,
    /// Hidden (`None`) while Busy.
    pub content: Option<String>,
    pub forms: Vec<FormView>,
    pub last_failure: Option<FailureKind>,
    pub poll_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub form: FormRef,
    pub target_url: String,
    pub actions: Vec<String>,
}
