use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{ErrorResponse, IssueError};
use crate::handler;
use crate::store::IssueStore;
use crate::types::{ActionResult, Issue, IssueFields, IssueFilter};

type AppState = Arc<dyn IssueStore>;

/// Failures are reported in the body; the status is always 200.
struct AppError(IssueError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from(&self.0);
        (StatusCode::OK, Json(body)).into_response()
    }
}

impl From<IssueError> for AppError {
    fn from(err: IssueError) -> Self {
        AppError(err)
    }
}

/// Request body accepted as JSON or as an urlencoded form. A body that does
/// not parse is read as an empty payload so it fails validation instead of
/// producing a 4xx.
struct Payload<T>(T);

impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let parsed = if is_form {
            Form::<T>::from_request(req, state)
                .await
                .map(|Form(v)| v)
                .map_err(|e| e.body_text())
        } else {
            Json::<T>::from_request(req, state)
                .await
                .map(|Json(v)| v)
                .map_err(|e| e.body_text())
        };

        Ok(Payload(parsed.unwrap_or_else(|err| {
            tracing::warn!(%err, "unreadable request body");
            T::default()
        })))
    }
}

pub fn router(store: AppState) -> Router {
    Router::new()
        .route(
            "/api/issues/{project}",
            get(list_issues)
                .post(create_issue)
                .put(update_issue)
                .delete(delete_issue),
        )
        .route("/health", get(health))
        .with_state(store)
}

pub async fn start(port: u16, store: AppState) -> std::io::Result<()> {
    let app = router(store);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!("issue tracker listening on port {port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install ctrl+c handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// --- Issue endpoints ---

async fn list_issues(
    State(store): State<AppState>,
    Path(project): Path<String>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Vec<Issue>>, AppError> {
    // An undecodable query matches nothing.
    let filter = match query {
        Ok(Query(pairs)) => IssueFilter::from_pairs(pairs),
        Err(e) => {
            tracing::warn!(project = %project, err = %e.body_text(), "unreadable filter query");
            return Ok(Json(Vec::new()));
        }
    };
    tracing::debug!(project = %project, ?filter, "list issues");

    let issues = handler::list_issues(store.as_ref(), &project, &filter)?;
    Ok(Json(issues))
}

async fn create_issue(
    State(store): State<AppState>,
    Path(project): Path<String>,
    Payload(fields): Payload<IssueFields>,
) -> Result<Json<Issue>, AppError> {
    tracing::debug!(project = %project, "create issue");

    let issue = handler::create_issue(store.as_ref(), &project, &fields)?;
    Ok(Json(issue))
}

#[derive(Debug, Default, Deserialize)]
struct UpdateIssueBody {
    #[serde(rename = "_id")]
    id: Option<String>,
    #[serde(flatten)]
    fields: IssueFields,
}

async fn update_issue(
    State(store): State<AppState>,
    Path(project): Path<String>,
    Payload(body): Payload<UpdateIssueBody>,
) -> Result<Json<ActionResult>, AppError> {
    tracing::debug!(project = %project, id = ?body.id, "update issue");

    let result = handler::update_issue(store.as_ref(), body.id.as_deref(), &body.fields)?;
    Ok(Json(result))
}

#[derive(Debug, Default, Deserialize)]
struct DeleteIssueBody {
    #[serde(rename = "_id")]
    id: Option<String>,
}

async fn delete_issue(
    State(store): State<AppState>,
    Path(project): Path<String>,
    Payload(body): Payload<DeleteIssueBody>,
) -> Result<Json<ActionResult>, AppError> {
    tracing::debug!(project = %project, id = ?body.id, "delete issue");

    let result = handler::delete_issue(store.as_ref(), body.id.as_deref())?;
    Ok(Json(result))
}
