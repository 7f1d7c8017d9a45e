use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);
/// Roughly ten minutes at the default interval.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 400;
pub const DEFAULT_FORM_NAME: &str = "vmbox_form";
pub const DEFAULT_CREDENTIAL_FIELD: &str = "csrfmiddlewaretoken";
pub const DEFAULT_ERROR_MARKER: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// Delay before every poll attempt, including the first.
    pub poll_interval: Duration,
    /// `None` keeps polling for as long as the server answers 304.
    pub max_poll_attempts: Option<u32>,
    /// `name` attribute shared by all submittable action forms.
    pub form_name: String,
    pub credential_field: String,
    /// Content shown in a region after any failure.
    pub error_marker: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: Some(DEFAULT_MAX_POLL_ATTEMPTS),
            form_name: DEFAULT_FORM_NAME.to_string(),
            credential_field: DEFAULT_CREDENTIAL_FIELD.to_string(),
            error_marker: DEFAULT_ERROR_MARKER.to_string(),
        }
    }
}
