//! End-to-end tests driving the real gateway against a local stub backend.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::json;

use portal::application::{ContactFields, SubmissionMachine, SubmissionMode, SubmitState};
use portal::config::{Config, ExecutionContext, FilePolicy};
use portal::gateway::{ApiGateway, GatewayError};
use portal::upload::FileCandidate;

/// Multipart fields the stub saw on the last apply call, as `name=value`
/// pairs (`cv` records the uploaded file name and content type).
type SeenFields = Arc<Mutex<Vec<String>>>;

async fn get_organization(Path(id): Path<String>) -> Json<serde_json::Value> {
    Json(json!({
        "data": {
            "id": id,
            "name": "Acme Robotics",
            "brandColor": "#1e293b"
        }
    }))
}

#[derive(serde::Deserialize)]
struct PageQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

fn sample_job(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": "Systems Engineer",
        "description": "Build things.",
        "location": "Berlin",
        "workType": "Remote",
        "employmentType": "Full-time",
        "requiredSkills": ["Rust"],
        "niceToHaveSkills": [],
        "createdAt": "2024-03-01T09:00:00Z"
    })
}

async fn get_organization_jobs(
    Path(_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Json<serde_json::Value> {
    Json(json!({
        "data": {
            "jobs": [sample_job("job-1")],
            "page": query.page.unwrap_or(0),
            "limit": query.limit.unwrap_or(0),
            "total": 1
        }
    }))
}

async fn get_job(Path(id): Path<String>) -> Response {
    if id == "garbage" {
        // 2xx with a body that is not JSON at all.
        return (StatusCode::OK, "<html>definitely not json</html>").into_response();
    }
    Json(json!({ "data": sample_job(&id) })).into_response()
}

async fn apply(
    State(seen): State<SeenFields>,
    Path(job_id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        if name == "cv" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            fields.push(format!("cv={file_name};{content_type}"));
            let _ = field.bytes().await.unwrap();
        } else {
            let value = field.text().await.unwrap();
            fields.push(format!("{name}={value}"));
        }
    }
    *seen.lock().unwrap() = fields;

    match job_id.as_str() {
        "job-dup" => Json(json!({ "error": "cv_duplication" })).into_response(),
        "job-dup-409" => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "cv_duplication" })),
        )
            .into_response(),
        "job-err" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "backend exploded" })),
        )
            .into_response(),
        _ => Json(json!({})).into_response(),
    }
}

async fn spawn_backend() -> (SocketAddr, SeenFields) {
    let seen: SeenFields = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/organizations/:id", get(get_organization))
        .route("/organizations/:id/jobs", get(get_organization_jobs))
        .route("/jobs/:id", get(get_job))
        .route("/jobs/:id/apply", post(apply))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

fn gateway_for(addr: SocketAddr) -> ApiGateway {
    let config = Config::with_api_url(format!("http://{addr}"));
    ApiGateway::new(ExecutionContext::Server, &config).unwrap()
}

fn file_machine(gateway: ApiGateway, job_id: &str) -> SubmissionMachine {
    let mut machine =
        SubmissionMachine::new(Arc::new(gateway), FilePolicy::pdf_only(), job_id);
    machine.select_mode(SubmissionMode::File);
    machine.set_contact(ContactFields {
        full_name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone_number: "+44 20 7946 0000".to_string(),
    });
    machine.attach_file(FileCandidate::new(
        "resume.pdf",
        "application/pdf",
        Bytes::from_static(b"%PDF-1.4 sample"),
    ));
    machine.set_consent(true);
    machine
}

#[tokio::test]
async fn reads_unwrap_the_data_envelope() {
    let (addr, _seen) = spawn_backend().await;
    let gateway = gateway_for(addr);

    let organization = gateway.get_organization("org-1").await.unwrap();
    assert_eq!(organization.name, "Acme Robotics");
    assert_eq!(organization.brand_color.as_deref(), Some("#1e293b"));

    let job = gateway.get_job("job-1").await.unwrap();
    assert_eq!(job.title, "Systems Engineer");
    assert_eq!(job.required_skills, vec!["Rust".to_string()]);
}

#[tokio::test]
async fn pagination_parameters_pass_through_verbatim() {
    let (addr, _seen) = spawn_backend().await;
    let gateway = gateway_for(addr);

    // The stub echoes the query parameters it received back into the page.
    let page = gateway
        .get_organization_jobs("org-1", Some(2), Some(5))
        .await
        .unwrap();
    assert_eq!(page.page, 2);
    assert_eq!(page.limit, 5);

    let defaults = gateway.get_organization_jobs("org-1", None, None).await.unwrap();
    assert_eq!(defaults.page, 1);
    assert_eq!(defaults.limit, 10);
}

#[tokio::test]
async fn file_submission_reaches_success_with_the_expected_form_fields() {
    let (addr, seen) = spawn_backend().await;
    let mut machine = file_machine(gateway_for(addr), "job-ok");

    machine.submit().await;
    assert_eq!(machine.state(), &SubmitState::Success);

    let fields = seen.lock().unwrap().clone();
    assert!(fields.contains(&"submissionType=file".to_string()));
    assert!(fields.contains(&"terms=true".to_string()));
    assert!(fields.contains(&"fullName=Ada Lovelace".to_string()));
    assert!(fields.contains(&"email=ada@example.com".to_string()));
    assert!(fields.contains(&"cv=resume.pdf;application/pdf".to_string()));
    assert!(!fields.iter().any(|f| f.starts_with("cvText=")));
}

#[tokio::test]
async fn text_submission_sends_cv_text_and_no_file() {
    let (addr, seen) = spawn_backend().await;
    let mut machine =
        SubmissionMachine::new(Arc::new(gateway_for(addr)), FilePolicy::pdf_only(), "job-ok");
    machine.select_mode(SubmissionMode::Text);
    machine.set_contact(ContactFields {
        full_name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone_number: "+44 20 7946 0000".to_string(),
    });
    machine.set_cv_text("Ten years of compiler work.");
    machine.set_consent(true);

    machine.submit().await;
    assert_eq!(machine.state(), &SubmitState::Success);

    let fields = seen.lock().unwrap().clone();
    assert!(fields.contains(&"submissionType=text".to_string()));
    assert!(fields.contains(&"cvText=Ten years of compiler work.".to_string()));
    assert!(!fields.iter().any(|f| f.starts_with("cv=")));
}

#[tokio::test]
async fn duplicate_signaled_in_a_200_body_lands_in_duplicate_rejected() {
    let (addr, _seen) = spawn_backend().await;
    let mut machine = file_machine(gateway_for(addr), "job-dup");

    machine.submit().await;
    assert_eq!(machine.state(), &SubmitState::DuplicateRejected);
}

#[tokio::test]
async fn duplicate_signaled_through_a_409_lands_in_duplicate_rejected() {
    let (addr, _seen) = spawn_backend().await;
    let mut machine = file_machine(gateway_for(addr), "job-dup-409");

    machine.submit().await;
    assert_eq!(machine.state(), &SubmitState::DuplicateRejected);
}

#[tokio::test]
async fn server_error_surfaces_the_backend_message() {
    let (addr, _seen) = spawn_backend().await;
    let mut machine = file_machine(gateway_for(addr), "job-err");

    machine.submit().await;
    match machine.state() {
        SubmitState::Failed { message } => assert!(message.contains("backend exploded")),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_backend_lands_in_failed_with_a_message() {
    // Bind then drop to get an address nothing is listening on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut machine = file_machine(gateway_for(addr), "job-ok");
    machine.submit().await;
    match machine.state() {
        SubmitState::Failed { message } => assert!(!message.is_empty()),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_response_body_is_a_transport_failure_not_a_panic() {
    let (addr, _seen) = spawn_backend().await;
    let gateway = gateway_for(addr);

    let err = gateway.get_job("garbage").await.unwrap_err();
    match err {
        GatewayError::Transport { message } => {
            assert_eq!(message, "Failed to fetch job details");
        }
        other => panic!("expected Transport, got {other:?}"),
    }
}
