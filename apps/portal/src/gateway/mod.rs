/// API Gateway — the single point of entry for all backend calls in the portal.
///
/// ARCHITECTURAL RULE: no other module may touch the network directly.
/// Every read and every application submission MUST go through this module,
/// which collapses transport exceptions, non-2xx statuses, and 2xx bodies
/// carrying an application-level `error` field into one closed result type.
/// Callers never see raw status codes or reqwest errors.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{Config, ConfigError, ExecutionContext};
use crate::models::{JobPage, JobPosting, OrganizationProfile};
use crate::upload::FileCandidate;

/// Prefix used for same-origin requests from a browser session.
const SAME_ORIGIN_PREFIX: &str = "/api";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 10;

/// Business-rejection code the backend uses for a repeat application.
pub const DUPLICATE_CV_CODE: &str = "cv_duplication";

/// Every gateway failure, normalized. `Config` stays distinct from
/// `Transport` on purpose: a missing base URL is a deployment defect, not a
/// transient network condition, and must not be retried into.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("network error: {message}")]
    Transport { message: String },

    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("request rejected: {code}")]
    Rejection { code: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GatewayError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, GatewayError::Rejection { code } if code == DUPLICATE_CV_CODE)
    }

    fn transport(err: reqwest::Error) -> Self {
        GatewayError::Transport {
            message: err.to_string(),
        }
    }
}

/// Read endpoints wrap their payload in `{ "data": ... }`.
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// The submission a candidate hands to the backend. Exactly one payload
/// source — a validated file or free text — can exist per form, so the
/// mode-dependent fields are a tagged union rather than a pair of optionals.
#[derive(Debug, Clone)]
pub struct ApplicationForm {
    pub payload: CvPayload,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub terms: bool,
}

#[derive(Debug, Clone)]
pub enum CvPayload {
    File(FileCandidate),
    Text(String),
}

impl CvPayload {
    /// Wire value of the `submissionType` form field.
    pub fn mode_label(&self) -> &'static str {
        match self {
            CvPayload::File(_) => "file",
            CvPayload::Text(_) => "text",
        }
    }
}

/// Seam between the submission machine and the network, so tests can drive
/// the machine against a scripted backend.
#[async_trait]
pub trait ApplicationsApi: Send + Sync {
    async fn submit_application(
        &self,
        job_id: &str,
        form: ApplicationForm,
    ) -> Result<(), GatewayError>;
}

/// Resolves the URL prefix every request is built on. Browser sessions stay
/// same-origin; server-side execution requires a configured absolute URL and
/// fails fast when it is missing — a silent localhost default would turn a
/// deployment defect into misleading production failures.
pub fn resolve_base_url(
    context: ExecutionContext,
    config: &Config,
) -> Result<String, ConfigError> {
    match context {
        ExecutionContext::Browser => Ok(SAME_ORIGIN_PREFIX.to_string()),
        ExecutionContext::Server => {
            let url = config.api_url.clone().ok_or(ConfigError::MissingBaseUrl)?;
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidBaseUrl(url));
            }
            Ok(url.trim_end_matches('/').to_string())
        }
    }
}

/// The single HTTP client used by every page of the portal.
#[derive(Clone)]
pub struct ApiGateway {
    client: Client,
    base_url: String,
}

impl ApiGateway {
    pub fn new(context: ExecutionContext, config: &Config) -> Result<Self, ConfigError> {
        Self::with_timeout(context, config, DEFAULT_TIMEOUT)
    }

    /// Same contract as [`ApiGateway::new`] with a caller-chosen request
    /// timeout. The submission machine is unaware of the timeout; an elapsed
    /// one surfaces as an ordinary `Transport` failure.
    pub fn with_timeout(
        context: ExecutionContext,
        config: &Config,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let base_url = resolve_base_url(context, config)?;
        Ok(ApiGateway {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_organization(
        &self,
        organization_id: &str,
    ) -> Result<OrganizationProfile, GatewayError> {
        let url = format!("{}/organizations/{organization_id}", self.base_url);
        debug!(%url, "fetching organization");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(GatewayError::transport)?;

        let envelope: DataEnvelope<OrganizationProfile> =
            read_json(response, "Failed to fetch organization details").await?;
        Ok(envelope.data)
    }

    pub async fn get_job(&self, job_id: &str) -> Result<JobPosting, GatewayError> {
        let url = format!("{}/jobs/{job_id}", self.base_url);
        debug!(%url, "fetching job");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(GatewayError::transport)?;

        let envelope: DataEnvelope<JobPosting> =
            read_json(response, "Failed to fetch job details").await?;
        Ok(envelope.data)
    }

    /// One page of an organization's open jobs. `page` is 1-indexed; both
    /// parameters are forwarded verbatim as query parameters.
    pub async fn get_organization_jobs(
        &self,
        organization_id: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<JobPage, GatewayError> {
        let url = format!("{}/organizations/{organization_id}/jobs", self.base_url);
        let page = page.unwrap_or(DEFAULT_PAGE);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        debug!(%url, page, limit, "fetching organization jobs");

        let response = self
            .client
            .get(&url)
            .query(&[("page", page), ("limit", limit)])
            .send()
            .await
            .map_err(GatewayError::transport)?;

        let envelope: DataEnvelope<JobPage> =
            read_json(response, "Failed to fetch organization jobs").await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl ApplicationsApi for ApiGateway {
    async fn submit_application(
        &self,
        job_id: &str,
        form: ApplicationForm,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/jobs/{job_id}/apply", self.base_url);
        debug!(%url, mode = form.payload.mode_label(), "submitting application");

        let body = build_multipart(form)?;

        // No explicit Content-Type here: reqwest must set the multipart
        // boundary itself, and forcing application/json breaks the upload.
        let response = self
            .client
            .post(&url)
            .multipart(body)
            .send()
            .await
            .map_err(GatewayError::transport)?;

        // Success payload is an empty object; only the error channel matters.
        let _ack: serde_json::Value =
            read_json(response, "Failed to submit application").await?;
        Ok(())
    }
}

fn build_multipart(form: ApplicationForm) -> Result<multipart::Form, GatewayError> {
    let mut body = multipart::Form::new()
        .text("submissionType", form.payload.mode_label())
        .text("terms", if form.terms { "true" } else { "false" });

    body = match form.payload {
        CvPayload::File(file) => {
            let part = file_part(file)?;
            body.part("cv", part)
        }
        CvPayload::Text(text) => body.text("cvText", text),
    };

    for (key, value) in [
        ("fullName", form.full_name),
        ("email", form.email),
        ("phoneNumber", form.phone_number),
    ] {
        if let Some(value) = value {
            body = body.text(key, value);
        }
    }

    Ok(body)
}

fn file_part(file: FileCandidate) -> Result<multipart::Part, GatewayError> {
    let FileCandidate {
        name,
        mime_type,
        bytes,
    } = file;
    multipart::Part::bytes(bytes.to_vec())
        .file_name(name)
        .mime_str(&mime_type)
        .map_err(GatewayError::transport)
}

/// Collapses the three failure shapes the transport can produce into
/// [`GatewayError`]:
/// - non-2xx with a JSON error body → `Server` (preferring the server's own
///   message over a status-code fallback), except a known business code
///   which becomes `Rejection`;
/// - 2xx with an application-level `error` field → `Rejection`;
/// - malformed JSON anywhere → `Transport` with the endpoint's generic
///   fallback message, never a raw parse error.
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    fallback: &str,
) -> Result<T, GatewayError> {
    let status = response.status();
    let body = response.text().await.map_err(GatewayError::transport)?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|e| e.error.or(e.message))
            .unwrap_or_else(|| format!("{fallback} (status {status})"));
        warn!(status = status.as_u16(), %message, "backend returned an error");

        // The backend is inconsistent about the channel a duplicate CV
        // arrives on; a 4xx carrying the known code is still a business
        // rejection, not a server fault.
        if message == DUPLICATE_CV_CODE {
            return Err(GatewayError::Rejection { code: message });
        }
        return Err(GatewayError::Server {
            status: status.as_u16(),
            message,
        });
    }

    if let Some(code) = business_rejection(&body) {
        debug!(%code, "backend rejected the request");
        return Err(GatewayError::Rejection { code });
    }

    serde_json::from_str(&body).map_err(|err| {
        warn!("malformed response body: {err}");
        GatewayError::Transport {
            message: fallback.to_string(),
        }
    })
}

/// A 2xx body of the shape `{ "error": "..." }` signals a business
/// rejection rather than data.
fn business_rejection(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(str::to_string)
}
