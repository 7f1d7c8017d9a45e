use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use url::form_urlencoded;
use vmbox_core::{FailureKind, PendingAction, PollOutcome, TaskHandle, ACTION_FIELD, DEFAULT_CREDENTIAL_FIELD};
use vmbox_logging::{vmbox_debug, vmbox_trace};

use crate::decode::decode_markup;
use crate::TaskError;

/// Header the server uses to tell script requests from navigations.
const REQUESTED_WITH: &str = "X-Requested-With";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_body_bytes: u64,
    /// Form field name the credential is posted under.
    pub credential_field: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_body_bytes: 5 * 1024 * 1024,
            credential_field: DEFAULT_CREDENTIAL_FIELD.to_string(),
        }
    }
}

#[async_trait::async_trait]
pub trait TaskClient: Send + Sync {
    /// POSTs the action and returns the handle of the started task.
    async fn initiate(&self, action: &PendingAction) -> Result<TaskHandle, TaskError>;

    /// Checks the task once. A non-200/304 answer is `Ok(PollOutcome::Failed)`;
    /// `Err` means no usable response arrived.
    async fn check(&self, handle: &TaskHandle) -> Result<PollOutcome, TaskError>;

    /// GETs the page that hosts the regions.
    async fn load_page(&self, url: &str) -> Result<String, TaskError>;
}

#[derive(Debug, Deserialize)]
struct StartedTask {
    task_id: TaskIdValue,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TaskIdValue {
    Text(String),
    Number(serde_json::Number),
}

impl TaskIdValue {
    fn into_string(self) -> String {
        match self {
            TaskIdValue::Text(text) => text,
            TaskIdValue::Number(number) => number.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ReqwestTaskClient {
    settings: ClientSettings,
    client: reqwest::Client,
    cookies: Arc<Jar>,
}

impl ReqwestTaskClient {
    pub fn new(settings: ClientSettings) -> Result<Self, TaskError> {
        let cookies = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .cookie_provider(cookies.clone())
            .build()
            .map_err(|err| TaskError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            client,
            cookies,
        })
    }

    /// Seeds the cookie jar, e.g. with a session cookie for `url`.
    pub fn add_cookie(&self, cookie: &str, url: &str) -> Result<(), TaskError> {
        let url = reqwest::Url::parse(url)
            .map_err(|err| TaskError::new(FailureKind::InvalidUrl, err.to_string()))?;
        self.cookies.add_cookie_str(cookie, &url);
        Ok(())
    }

    async fn read_body(&self, response: Response) -> Result<String, TaskError> {
        let max_bytes = self.settings.max_body_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(too_large(max_bytes, content_len));
            }
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(too_large(max_bytes, next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        decode_markup(&bytes, content_type.as_deref())
            .map(|decoded| decoded.markup)
            .map_err(|err| TaskError::new(FailureKind::MalformedResponse, err.to_string()))
    }
}

#[async_trait::async_trait]
impl TaskClient for ReqwestTaskClient {
    async fn initiate(&self, action: &PendingAction) -> Result<TaskHandle, TaskError> {
        let endpoint = parse_url(&action.endpoint_url)?;
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair(ACTION_FIELD, &action.action_name)
            .append_pair(&self.settings.credential_field, &action.credential)
            .finish();

        vmbox_debug!("POST {} action={}", endpoint, action.action_name);
        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .header(REQUESTED_WITH, "XMLHttpRequest")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(TaskError::new(
                FailureKind::InitiationStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = self.read_body(response).await?;
        let started: StartedTask = serde_json::from_str(&body)
            .map_err(|err| TaskError::new(FailureKind::MalformedResponse, err.to_string()))?;
        Ok(TaskHandle::new(
            started.task_id.into_string(),
            action.endpoint_url.clone(),
        ))
    }

    async fn check(&self, handle: &TaskHandle) -> Result<PollOutcome, TaskError> {
        let url = handle
            .poll_url()
            .map_err(|err| TaskError::new(FailureKind::InvalidUrl, err.to_string()))?;

        vmbox_trace!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(REQUESTED_WITH, "XMLHttpRequest")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match response.status() {
            StatusCode::OK => Ok(PollOutcome::Completed(self.read_body(response).await?)),
            StatusCode::NOT_MODIFIED => Ok(PollOutcome::Pending),
            status => Ok(PollOutcome::Failed(FailureKind::PollStatus(status.as_u16()))),
        }
    }

    async fn load_page(&self, url: &str) -> Result<String, TaskError> {
        let url = parse_url(url)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TaskError::new(
                FailureKind::PageStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        self.read_body(response).await
    }
}

fn parse_url(url: &str) -> Result<reqwest::Url, TaskError> {
    reqwest::Url::parse(url).map_err(|err| TaskError::new(FailureKind::InvalidUrl, err.to_string()))
}

fn too_large(max_bytes: u64, actual: u64) -> TaskError {
    TaskError::new(
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "response too large",
    )
}

fn map_reqwest_error(err: reqwest::Error) -> TaskError {
    if err.is_timeout() {
        return TaskError::new(FailureKind::Timeout, err.to_string());
    }
    TaskError::new(FailureKind::Network, err.to_string())
}
