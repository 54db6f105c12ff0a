// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP gateway -- exposes printer discovery and job submission as JSON.
//
// # Routes
//
//   GET  /printers   -> { "printers": [ { name, isDefault, status } ] }
//   POST /print      -> { "message": ... }   (multipart `file` + query options)
//
// Failures answer `{ "error": ... }`.  Every request, including unknown
// paths, passes the bearer gate first; CORS preflight is answered outside
// the gate so browser clients can reach the gateway at all.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use printbridge_core::error::{ErrorCategory, GatewayError, Result};
use printbridge_core::types::{PrintJobRequest, PrintOptions, PrinterDescriptor, StagedFile};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::auth::{AuthGate, require_bearer};
use crate::directory::PrinterDirectory;
use crate::dispatcher::JobDispatcher;
use crate::stager::FileStager;

/// Multipart field carrying the document.
const FILE_FIELD: &str = "file";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Components shared by every request handler.
#[derive(Clone)]
pub struct GatewayState {
    pub auth: AuthGate,
    pub directory: PrinterDirectory,
    pub stager: FileStager,
    pub dispatcher: JobDispatcher,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A [`GatewayError`] rendered as a JSON HTTP response.
#[derive(Debug)]
pub struct ApiError(GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0.category() {
            ErrorCategory::Auth => (StatusCode::UNAUTHORIZED, self.0.to_string()),
            ErrorCategory::Validation => (StatusCode::BAD_REQUEST, self.0.to_string()),
            ErrorCategory::Platform | ErrorCategory::JobExecution => {
                error!(error = %self.0, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string())
            }
            ErrorCategory::Io => {
                error!(error = %self.0, "staging I/O failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PrintersBody {
    printers: Vec<PrinterDescriptor>,
}

#[derive(Serialize)]
struct MessageBody {
    message: String,
}

/// Raw `/print` query parameters; validated by [`PrintOptions::parse`].
#[derive(Debug, Default, Deserialize)]
struct PrintQuery {
    printer: Option<String>,
    copies: Option<String>,
    duplex: Option<String>,
    #[serde(rename = "pageRange")]
    page_range: Option<String>,
}

impl PrintQuery {
    fn options(&self) -> Result<PrintOptions> {
        PrintOptions::parse(
            self.printer.as_deref(),
            self.copies.as_deref(),
            self.duplex.as_deref(),
            self.page_range.as_deref(),
        )
    }
}

async fn list_printers(
    State(state): State<Arc<GatewayState>>,
) -> std::result::Result<Json<PrintersBody>, ApiError> {
    let printers = state.directory.list().await?;
    Ok(Json(PrintersBody { printers }))
}

async fn submit_print(
    State(state): State<Arc<GatewayState>>,
    query: std::result::Result<Query<PrintQuery>, QueryRejection>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<MessageBody>, ApiError> {
    // Options first: a malformed request must not stage anything.
    let Query(query) = query.map_err(|e| GatewayError::validation(e.body_text()))?;
    let options = query.options()?;

    let mut multipart = multipart.map_err(|e| GatewayError::validation(e.body_text()))?;
    let staged = stage_first_file(&state.stager, &mut multipart).await?;

    let message = state
        .dispatcher
        .submit(PrintJobRequest::new(staged, options))
        .await?;
    Ok(Json(MessageBody { message }))
}

/// Stage the first `file` field; every other field is skipped.
async fn stage_first_file(
    stager: &FileStager,
    multipart: &mut Multipart,
) -> Result<Option<StagedFile>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::validation(e.body_text()))?
    {
        if field.name() == Some(FILE_FIELD) {
            return stager.stage_field(field).await.map(Some);
        }
    }
    Ok(None)
}

async fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "Not found".to_owned(),
        }),
    )
}

async fn method_not_allowed() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody {
            error: "Method not allowed".to_owned(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Router & server
// ---------------------------------------------------------------------------

/// Build the gateway router.
///
/// Layer order, outermost first: request tracing, CORS, bearer gate, body
/// limit.
pub fn router(state: Arc<GatewayState>, max_upload_bytes: usize) -> Router {
    let auth = state.auth.clone();
    Router::new()
        .route("/printers", get(list_printers))
        .route("/print", post(submit_print))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(axum::middleware::from_fn_with_state(auth, require_bearer))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// A bound gateway listener, ready to serve.
pub struct GatewayServer {
    listener: TcpListener,
    router: Router,
}

impl GatewayServer {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr, router: Router) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, router })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` is cancelled, then drain in-flight requests.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        info!(addr = %self.local_addr()?, "print gateway listening");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;
        info!("print gateway stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::platform::{CupsAdapter, PlatformAdapter};
    use crate::runner::{CommandOutput, CommandRunner};
    use crate::testing::ScriptedRunner;

    const TOKEN: &str = "test-token";
    const BOUNDARY: &str = "printbridge-boundary";

    fn app(runner: &Arc<ScriptedRunner>, staging: &Path) -> Router {
        let runner: Arc<dyn CommandRunner> = runner.clone();
        let adapter: Arc<dyn PlatformAdapter> = Arc::new(CupsAdapter::new(runner.clone()));
        let state = GatewayState {
            auth: AuthGate::new(TOKEN),
            directory: PrinterDirectory::new(adapter.clone()),
            stager: FileStager::new(staging),
            dispatcher: JobDispatcher::new(adapter, runner),
        };
        router(Arc::new(state), 1024 * 1024)
    }

    fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, file_name, data) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match file_name {
                Some(f) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                         Content-Type: application/pdf\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(data.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn print_request(query: &str, token: Option<&str>, body: Vec<u8>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/print{query}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body)).expect("request")
    }

    async fn json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn staged_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn missing_token_is_rejected_before_staging() {
        let staging = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(ScriptedRunner::new());
        let body = multipart_body(&[("file", Some("a.pdf"), "%PDF")]);

        for token in [None, Some("wrong")] {
            let response = app(&runner, staging.path())
                .oneshot(print_request("", token, body.clone()))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(json(response).await["error"], "Unauthorized");
        }
        assert_eq!(staged_count(staging.path()), 0);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_paths_need_the_token_too() {
        let staging = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(ScriptedRunner::new());

        let anonymous = app(&runner, staging.path())
            .oneshot(Request::builder().uri("/admin").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let authorised = app(&runner, staging.path())
            .oneshot(
                Request::builder()
                    .uri("/admin")
                    .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(authorised.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_method_answers_json() {
        let staging = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(ScriptedRunner::new());

        let response = app(&runner, staging.path())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/printers")
                    .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(json(response).await["error"], "Method not allowed");
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn lists_printers_as_json() {
        let staging = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(
            ScriptedRunner::new()
                .reply(CommandOutput::ok("Office accepting requests since today\n"))
                .reply(CommandOutput::ok("system default destination: Office\n")),
        );

        let response = app(&runner, staging.path())
            .oneshot(
                Request::builder()
                    .uri("/printers")
                    .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json(response).await,
            serde_json::json!({
                "printers": [{ "name": "Office", "isDefault": true, "status": "Available" }]
            })
        );
    }

    #[tokio::test]
    async fn enumeration_failure_is_a_server_error() {
        let staging = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(
            ScriptedRunner::new().reply(CommandOutput::failed(1, "lpstat: scheduler not responding")),
        );

        let response = app(&runner, staging.path())
            .oneshot(
                Request::builder()
                    .uri("/printers")
                    .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json(response).await;
        assert!(body["error"].as_str().expect("error").contains("scheduler not responding"));
    }

    #[tokio::test]
    async fn missing_file_field_is_a_validation_error() {
        let staging = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(ScriptedRunner::new());
        let body = multipart_body(&[("note", None, "hello")]);

        let response = app(&runner, staging.path())
            .oneshot(print_request("?printer=Office", Some(TOKEN), body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["error"], "No file uploaded");
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn bad_query_stages_nothing() {
        let staging = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(ScriptedRunner::new());
        let body = multipart_body(&[("file", Some("a.pdf"), "%PDF")]);

        for query in ["?copies=0", "?copies=many", "?duplex=maybe", "?pageRange=3-1", "?pageRange=1;id"] {
            let response = app(&runner, staging.path())
                .oneshot(print_request(query, Some(TOKEN), body.clone()))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{query}");
        }
        assert_eq!(staged_count(staging.path()), 0);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn successful_print_returns_message_and_cleans_up() {
        let staging = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(ScriptedRunner::new().reply(CommandOutput::ok("request id is Office-1")));
        let body = multipart_body(&[
            ("note", None, "ignored"),
            ("file", Some("report.pdf"), "%PDF-1.7 body"),
        ]);

        let response = app(&runner, staging.path())
            .oneshot(print_request(
                "?printer=Office&copies=3&duplex=true&pageRange=1-3",
                Some(TOKEN),
                body,
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["message"], "Printed successfully on Unix system");

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        let args = calls[0].args_lossy();
        assert_eq!(
            args[..8],
            ["-d", "Office", "-n", "3", "-o", "sides=two-sided-long-edge", "-P", "1-3"]
        );
        assert!(args[8].ends_with(".pdf"));
        assert_eq!(staged_count(staging.path()), 0);
    }

    #[tokio::test]
    async fn failed_print_reports_tool_diagnostic() {
        let staging = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(
            ScriptedRunner::new().reply(CommandOutput::failed(1, "lp: Unsupported document-format")),
        );
        let body = multipart_body(&[("file", Some("a.pdf"), "%PDF")]);

        let response = app(&runner, staging.path())
            .oneshot(print_request("?printer=Office", Some(TOKEN), body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(response).await["error"], "lp: Unsupported document-format");
        assert_eq!(staged_count(staging.path()), 0);
    }

    #[tokio::test]
    async fn concurrent_submissions_use_distinct_files() {
        let staging = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(ScriptedRunner::new());
        let router = app(&runner, staging.path());
        let body = multipart_body(&[("file", Some("same.pdf"), "%PDF")]);

        let (a, b) = tokio::join!(
            router.clone().oneshot(print_request("?printer=A", Some(TOKEN), body.clone())),
            router.clone().oneshot(print_request("?printer=B", Some(TOKEN), body.clone())),
        );
        assert_eq!(a.expect("a").status(), StatusCode::OK);
        assert_eq!(b.expect("b").status(), StatusCode::OK);

        let files: Vec<String> = runner
            .calls()
            .iter()
            .map(|c| c.args_lossy().pop().expect("file arg"))
            .collect();
        assert_eq!(files.len(), 2);
        assert_ne!(files[0], files[1]);
    }

    #[tokio::test]
    async fn cors_preflight_skips_the_gate() {
        let staging = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(ScriptedRunner::new());

        let response = app(&runner, staging.path())
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/print")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn server_stops_on_cancellation() {
        let staging = tempfile::tempdir().expect("tempdir");
        let runner = Arc::new(ScriptedRunner::new());
        let addr: SocketAddr = "127.0.0.1:0".parse().expect("addr");
        let server = GatewayServer::bind(addr, app(&runner, staging.path()))
            .await
            .expect("bind");
        assert_ne!(server.local_addr().expect("local addr").port(), 0);

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(server.serve(shutdown.clone()));
        shutdown.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .expect("server stopped")
            .expect("join")
            .expect("serve");
    }
}
