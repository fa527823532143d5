use anyhow::Result;
use thiserror::Error;

/// Where the calling code is executing. Server-side rendering must reach the
/// backend through an absolute URL; a browser session stays same-origin.
/// Passed in explicitly at gateway construction — never inferred from
/// ambient globals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    Browser,
    Server,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("PORTAL_API_URL is not set; server-side requests need an absolute backend URL")]
    MissingBaseUrl,

    #[error("PORTAL_API_URL '{0}' is not an absolute http(s) URL")]
    InvalidBaseUrl(String),
}

/// Portal configuration loaded from environment variables.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Absolute backend URL, required only for [`ExecutionContext::Server`].
    pub api_url: Option<String>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            api_url: std::env::var("PORTAL_API_URL").ok(),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn with_api_url(url: impl Into<String>) -> Self {
        Config {
            api_url: Some(url.into()),
            ..Config::default()
        }
    }
}

const MB: u64 = 1024 * 1024;

/// Upload policy for CV files. Tenants run with one of two observed
/// configurations, exposed as named presets rather than literals scattered
/// through the form code.
#[derive(Debug, Clone)]
pub struct FilePolicy {
    accepted_types: Vec<String>,
    max_bytes: u64,
}

impl FilePolicy {
    /// PDF only, 10 MB — the branded application page variant.
    pub fn pdf_only() -> Self {
        FilePolicy {
            accepted_types: vec!["application/pdf".to_string()],
            max_bytes: 10 * MB,
        }
    }

    /// PDF, DOC, and DOCX, 5 MB — the broader document variant.
    pub fn documents() -> Self {
        FilePolicy {
            accepted_types: vec![
                "application/pdf".to_string(),
                "application/msword".to_string(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                    .to_string(),
            ],
            max_bytes: 5 * MB,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Exact match on the MIME string the platform reported. No extension
    /// sniffing, no case folding.
    pub fn accepts(&self, mime_type: &str) -> bool {
        self.accepted_types.iter().any(|t| t == mime_type)
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn max_megabytes(&self) -> u64 {
        self.max_bytes / MB
    }

    pub fn accepted_types(&self) -> &[String] {
        &self.accepted_types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_only_accepts_pdf() {
        assert!(FilePolicy::pdf_only().accepts("application/pdf"));
    }

    #[test]
    fn test_pdf_only_rejects_doc() {
        assert!(!FilePolicy::pdf_only().accepts("application/msword"));
    }

    #[test]
    fn test_mime_match_is_case_sensitive() {
        assert!(!FilePolicy::pdf_only().accepts("Application/PDF"));
    }

    #[test]
    fn test_documents_preset_has_lower_ceiling() {
        assert_eq!(FilePolicy::documents().max_megabytes(), 5);
        assert_eq!(FilePolicy::pdf_only().max_megabytes(), 10);
    }

    #[test]
    fn test_with_max_bytes_overrides_preset() {
        let policy = FilePolicy::documents().with_max_bytes(10 * MB);
        assert_eq!(policy.max_megabytes(), 10);
    }
}
