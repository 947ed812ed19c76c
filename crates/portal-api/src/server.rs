//! Axum server and routes.

use crate::html;
use crate::session::{session_cookie, session_id_from_headers, CurrentUser, SessionId, SessionStore};
use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderValue},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Form, Json, Router,
};
use portal_auth::{normalize_credentials, Authenticator};
use portal_core::{JobPortal, PortalError, ScriptTemplate, SubmitRequest};
use portal_types::JobsResponse;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;

pub struct AppState {
    pub portal: JobPortal,
    pub auth: Arc<dyn Authenticator>,
    pub sessions: SessionStore,
}

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/", get(handle_index))
        .route("/submit", get(handle_submit_page).post(handle_submit))
        .route("/template", get(handle_template))
        .route("/nodes", get(handle_nodes))
        .route("/cancel_jobs", get(handle_cancel_jobs))
        .route("/cancel/:jobid", post(handle_cancel))
        .route("/api/jobs", get(handle_jobs_json))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_login));

    Router::new()
        .route("/login", get(handle_login_page).post(handle_login))
        .route("/logout", get(handle_logout))
        .merge(protected)
        .layer(middleware::from_fn_with_state(state.clone(), ensure_session))
        .route("/health", get(handle_health))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate, public, max-age=0"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ))
        .with_state(state)
}

fn set_cookie(response: &mut Response, id: &str) {
    if let Ok(value) = HeaderValue::from_str(&session_cookie(id)) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
}

/// Attach a session id to every request. Clients without a live session get a fresh id, and
/// the cookie is only sent once the handler stored something under it.
async fn ensure_session(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let existing = match session_id_from_headers(req.headers()) {
        Some(id) if state.sessions.touch(&id).await => Some(id),
        _ => None,
    };
    let (id, fresh) = match existing {
        Some(id) => (id, false),
        None => (SessionStore::new_id(), true),
    };
    req.extensions_mut().insert(SessionId(id.clone()));
    let mut response = next.run(req).await;
    if fresh
        && !response.headers().contains_key(header::SET_COOKIE)
        && state.sessions.contains(&id).await
    {
        set_cookie(&mut response, &id);
    }
    response
}

/// Redirect to the login page unless the session has a user.
async fn require_login(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let Some(SessionId(session)) = req.extensions().get::<SessionId>().cloned() else {
        return Redirect::to("/login").into_response();
    };
    match state.sessions.username(&session).await {
        Some(user) => {
            req.extensions_mut().insert(CurrentUser(user));
            next.run(req).await
        }
        None => {
            state.sessions.flash(&session, "You need to log in.").await;
            Redirect::to("/login").into_response()
        }
    }
}

/// Page with the session's pending flashes (plus `extra`) ahead of `body`.
async fn render(
    state: &AppState,
    session: &SessionId,
    user: Option<&str>,
    title: &str,
    extra: Vec<String>,
    body: &str,
) -> Html<String> {
    let mut messages = state.sessions.take_flashes(&session.0).await;
    messages.extend(extra);
    let content = format!("{}\n{}", html::flash_block(&messages), body);
    Html(html::layout(title, user, &content))
}

async fn handle_health() -> &'static str {
    "ok"
}

async fn handle_login_page(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> Html<String> {
    let user = state.sessions.username(&session.0).await;
    render(&state, &session, user.as_deref(), "Login", Vec::new(), html::LOGIN_FORM).await
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

async fn handle_login(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Form(form): Form<LoginForm>,
) -> Response {
    let accepted = match normalize_credentials(&form.username, &form.password) {
        None => None,
        Some((username, password)) => match state.auth.authenticate(username, password).await {
            Ok(true) => Some(username.to_string()),
            Ok(false) => None,
            Err(e) => {
                tracing::error!(username, error = %e, "authentication backend failed");
                None
            }
        },
    };
    match accepted {
        Some(username) => {
            let new_id = state.sessions.login(&session.0, &username).await;
            state.sessions.flash(&new_id, "Login successful.").await;
            tracing::info!(user = %username, "login");
            let mut response = Redirect::to("/").into_response();
            set_cookie(&mut response, &new_id);
            response
        }
        None => {
            tracing::info!(username = ?form.username.trim(), "login rejected");
            state
                .sessions
                .flash(&session.0, "Login failed. Check your credentials.")
                .await;
            Redirect::to("/login").into_response()
        }
    }
}

async fn handle_logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> Redirect {
    if let Some(user) = state.sessions.logout(&session.0).await {
        tracing::info!(user = %user, "logout");
    }
    state.sessions.flash(&session.0, "You have logged out.").await;
    Redirect::to("/login")
}

async fn handle_index(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Html<String> {
    let (rows, errors) = match state.portal.registered_jobs().await {
        Ok(rows) => (rows, Vec::new()),
        Err(e) => (Vec::new(), vec![format!("Error running squeue: {}", e.user_message())]),
    };
    let body = format!("<h2>Queued Jobs</h2>\n{}", html::jobs_table(&rows, false));
    render(&state, &session, Some(&user), "Queued Jobs", errors, &body).await
}

async fn handle_jobs_json(State(state): State<Arc<AppState>>) -> Json<JobsResponse> {
    match state.portal.registered_jobs().await {
        Ok(rows) => Json(JobsResponse {
            code: 200,
            message: format!("{} job(s)", rows.len()),
            data: Some(rows),
        }),
        Err(e) => Json(JobsResponse {
            code: 502,
            message: e.user_message(),
            data: None,
        }),
    }
}

async fn handle_submit_page(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Html<String> {
    render(&state, &session, Some(&user), "Submit Job", Vec::new(), html::SUBMIT_FORM).await
}

/// Fields of both the submit form and the template form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubmitForm {
    pub job_script: String,
    pub job_name: String,
    pub time: String,
    pub nodes: String,
    pub ntasks: String,
    pub mem: String,
    pub array: String,
    pub commands: String,
}

impl SubmitForm {
    fn into_request(self) -> SubmitRequest {
        let template = ScriptTemplate {
            job_name: self.job_name.clone(),
            time: self.time,
            nodes: self.nodes,
            ntasks: self.ntasks,
            mem: self.mem,
            array: self.array,
            commands: self.commands,
        };
        SubmitRequest {
            script: self.job_script,
            job_name: self.job_name,
            template: Some(template),
        }
    }
}

async fn handle_submit(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Form(form): Form<SubmitForm>,
) -> Redirect {
    let message = match state.portal.submit(&user, &form.into_request()).await {
        Ok(outcome) => format!("Job submitted successfully: {}", outcome.output),
        Err(PortalError::NoScript) => PortalError::NoScript.to_string(),
        Err(e) => {
            tracing::warn!(user = %user, error = %e, "submission failed");
            format!("Error submitting job: {}", e.user_message())
        }
    };
    state.sessions.flash(&session.0, message).await;
    Redirect::to("/")
}

async fn handle_template(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Html<String> {
    let body = html::template_form(&state.portal.settings().job_chdir);
    render(&state, &session, Some(&user), "Job Template", Vec::new(), &body).await
}

async fn handle_nodes(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Html<String> {
    let text = match state.portal.node_status().await {
        Ok(text) => text,
        Err(e) => format!("Error running sinfo: {}", e.user_message()),
    };
    render(&state, &session, Some(&user), "Node Status", Vec::new(), &html::node_status(&text)).await
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelJobsQuery {
    #[serde(default)]
    pub all: Option<String>,
}

async fn handle_cancel_jobs(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(q): Query<CancelJobsQuery>,
) -> Html<String> {
    let is_admin = state.portal.is_admin(&user);
    let show_all = is_admin && q.all.as_deref() == Some("on");
    let (rows, errors) = match state.portal.cancellable_jobs(&user, show_all).await {
        Ok(rows) => (rows, Vec::new()),
        Err(e) => (Vec::new(), vec![format!("Error fetching job list: {}", e.user_message())]),
    };
    let mut body = String::from("<h2>Cancel Jobs</h2>\n");
    if is_admin {
        body.push_str(&html::show_all_filter(show_all));
    }
    body.push_str(&html::jobs_table(&rows, true));
    render(&state, &session, Some(&user), "Cancel Jobs", errors, &body).await
}

async fn handle_cancel(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(job_id): Path<String>,
) -> Redirect {
    let message = match state.portal.cancel(&user, &job_id).await {
        Ok(()) => format!("Job {} cancelled successfully.", job_id),
        Err(e @ (PortalError::NotRegistered(_) | PortalError::NotOwner(_))) => e.to_string(),
        Err(e) => format!("Error cancelling job {}: {}", job_id, e.user_message()),
    };
    state.sessions.flash(&session.0, message).await;
    Redirect::to("/cancel_jobs")
}
