//! Smoke binary: fetches an organization and its open jobs through the
//! gateway, the same code path a server-rendered page uses.
//!
//! Usage: `portal <organization-id> [job-id]` with `PORTAL_API_URL` set.

use anyhow::{bail, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use portal::config::{Config, ExecutionContext};
use portal::gateway::ApiGateway;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(organization_id) = args.next() else {
        bail!("usage: portal <organization-id> [job-id]");
    };
    let job_id = args.next();

    // A missing PORTAL_API_URL surfaces here, before any request is made.
    let gateway = ApiGateway::new(ExecutionContext::Server, &config)?;
    info!("gateway ready, base URL {}", gateway.base_url());

    let organization = gateway.get_organization(&organization_id).await?;
    info!("organization: {} ({})", organization.name, organization.id);

    let page = gateway.get_organization_jobs(&organization_id, None, None).await?;
    info!("open jobs: {} of {}", page.jobs.len(), page.total);
    for job in &page.jobs {
        info!("  {} — {} ({})", job.id, job.title, job.location);
    }

    if let Some(job_id) = job_id {
        let job = gateway.get_job(&job_id).await?;
        info!("job detail: {} — {}", job.title, job.employment_type);
    }

    Ok(())
}
