//! Read-only wire types supplied by the backend. Immutable once fetched;
//! owned by the page that fetched them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub work_type: String,
    pub employment_type: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub nice_to_have_skills: Vec<String>,
    #[serde(default)]
    pub salary: Option<SalaryRange>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub currency: Option<String>,
    pub period: Option<String>,
}

/// Branding payload. The core passes this through untouched; only the
/// presentation layer reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub banner_url: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub brand_color: Option<String>,
}

/// One page of an organization's open jobs. Pagination is 1-indexed and
/// passed through to the backend verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPage {
    pub jobs: Vec<JobPosting>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
}
