//! Integration tests: login gating, submit, list, cancel, node status.

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use http_body_util::BodyExt;
use portal_api::server::{self, AppState};
use portal_api::session::SessionStore;
use portal_auth::MockAuthenticator;
use portal_core::{JobPortal, PortalSettings};
use portal_registry::InMemoryJobRegistry;
use portal_slurm::MockScheduler;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

fn users() -> MockAuthenticator {
    MockAuthenticator::new()
        .with_user("alice", "pw-alice")
        .with_user("bob", "pw-bob")
        .with_user("root", "pw-root")
}

fn test_app() -> (axum::Router, Arc<MockScheduler>) {
    let (app, scheduler, _) = app_with(users());
    (app, scheduler)
}

fn app_with(auth: MockAuthenticator) -> (axum::Router, Arc<MockScheduler>, SessionStore) {
    let scheduler = Arc::new(MockScheduler::new());
    let settings = PortalSettings {
        script_dir: std::env::temp_dir(),
        ..Default::default()
    };
    let portal = JobPortal::new(
        scheduler.clone(),
        Arc::new(InMemoryJobRegistry::new()),
        settings,
    );
    let sessions = SessionStore::new(Duration::from_secs(3600));
    let state = Arc::new(AppState {
        portal,
        auth: Arc::new(auth),
        sessions: sessions.clone(),
    });
    (server::router(state), scheduler, sessions)
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn session_cookie(res: &Response<Body>) -> Option<String> {
    res.headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

fn location(res: &Response<Body>) -> &str {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

async fn body_text(res: Response<Body>) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn login(app: &axum::Router, user: &str, password: &str) -> String {
    let res = app
        .clone()
        .oneshot(post_form(
            "/login",
            None,
            &format!("username={}&password={}", user, password),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");
    session_cookie(&res).expect("login sets a session cookie")
}

async fn cancel(app: &axum::Router, cookie: &str, job_id: &str) -> Response<Body> {
    let req = Request::builder()
        .method("POST")
        .uri(format!("/cancel/{}", job_id))
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(req).await.unwrap()
}

async fn page(app: &axum::Router, uri: &str, cookie: &str) -> String {
    let res = app.clone().oneshot(get(uri, Some(cookie))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK, "GET {}", uri);
    body_text(res).await
}

async fn submit(app: &axum::Router, cookie: &str, body: &str) {
    let res = app
        .clone()
        .oneshot(post_form("/submit", Some(cookie), body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");
}

#[tokio::test]
async fn protected_routes_redirect_to_login() {
    let (app, _) = test_app();
    for uri in ["/", "/submit", "/template", "/nodes", "/cancel_jobs", "/api/jobs"] {
        let res = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER, "GET {}", uri);
        assert_eq!(location(&res), "/login");
    }
    let res = app
        .clone()
        .oneshot(post_form("/cancel/1000", None, ""))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");

    let res = app.clone().oneshot(get("/", None)).await.unwrap();
    let cookie = session_cookie(&res).unwrap();
    let body = page(&app, "/login", &cookie).await;
    assert!(body.contains("You need to log in."));
    assert!(body.contains(r#"<a href="/login">Login</a>"#));
}

#[tokio::test]
async fn responses_disable_caching() {
    let (app, _) = test_app();
    let res = app.clone().oneshot(get("/health", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()[header::CACHE_CONTROL],
        "no-cache, no-store, must-revalidate, public, max-age=0"
    );
    assert_eq!(res.headers()[header::PRAGMA], "no-cache");
    assert_eq!(res.headers()[header::EXPIRES], "0");
    assert_eq!(body_text(res).await, "ok");
}

#[tokio::test]
async fn failed_login_flashes_and_stays_logged_out() {
    let (app, _) = test_app();
    let res = app
        .clone()
        .oneshot(post_form("/login", None, "username=alice&password=wrong"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");
    let cookie = session_cookie(&res).unwrap();

    let body = page(&app, "/login", &cookie).await;
    assert!(body.contains("Login failed. Check your credentials."));

    let res = app.clone().oneshot(get("/", Some(&cookie))).await.unwrap();
    assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn submit_then_list_registered_jobs() {
    let (app, scheduler) = test_app();
    scheduler.push_entry(MockScheduler::pending_entry("1", "not-through-portal"));
    let cookie = login(&app, "alice", "pw-alice").await;

    let body = page(&app, "/", &cookie).await;
    assert!(body.contains("Login successful."));
    assert!(body.contains("Welcome, alice"));
    assert!(body.contains("No jobs registered."));

    // job_script = "#!/bin/bash\r\nhostname\r\n"
    submit(&app, &cookie, "job_name=demo&job_script=%23%21%2Fbin%2Fbash%0D%0Ahostname%0D%0A").await;

    let body = page(&app, "/", &cookie).await;
    assert!(body.contains("Job submitted successfully: Submitted batch job 1000"));
    assert!(body.contains("<td>1000</td>"));
    assert!(body.contains("<td>demo</td>"));
    assert!(body.contains("<td>alice</td>"));
    assert!(!body.contains("not-through-portal"));

    assert_eq!(
        scheduler.submitted_scripts(),
        vec!["#!/bin/bash\n#SBATCH --chdir=/tmp\n#SBATCH --job-name=demo\nhostname\n".to_string()]
    );

    // Everyone sees every registered job on the index page.
    let bob = login(&app, "bob", "pw-bob").await;
    let body = page(&app, "/", &bob).await;
    assert!(body.contains("<td>1000</td>"));
}

#[tokio::test]
async fn empty_submission_is_rejected() {
    let (app, scheduler) = test_app();
    let cookie = login(&app, "alice", "pw-alice").await;
    submit(&app, &cookie, "job_name=x&job_script=").await;
    let body = page(&app, "/", &cookie).await;
    assert!(body.contains("No job script was provided."));
    assert!(scheduler.submitted_scripts().is_empty());
}

#[tokio::test]
async fn template_fields_are_rendered_without_preview() {
    let (app, scheduler) = test_app();
    let cookie = login(&app, "alice", "pw-alice").await;

    let body = page(&app, "/template", &cookie).await;
    assert!(body.contains("Job Script Generator"));

    submit(
        &app,
        &cookie,
        "job_name=tmpl&time=00%3A10%3A00&nodes=2&ntasks=4&mem=4G&array=&commands=srun+hostname&job_script=",
    )
    .await;
    assert_eq!(
        scheduler.submitted_scripts(),
        vec!["#!/bin/bash\n\
              #SBATCH --job-name=tmpl\n\
              #SBATCH --time=00:10:00\n\
              #SBATCH --nodes=2\n\
              #SBATCH --ntasks-per-node=4\n\
              #SBATCH --mem=4G\n\
              #SBATCH --chdir=/tmp\n\
              \n\
              srun hostname"
            .to_string()]
    );
}

#[tokio::test]
async fn scheduler_errors_are_flashed_verbatim() {
    let (app, scheduler) = test_app();
    let cookie = login(&app, "alice", "pw-alice").await;

    scheduler.fail_submit(Some("sbatch: error: Batch job submission failed: Invalid partition"));
    submit(&app, &cookie, "job_script=hostname").await;
    let body = page(&app, "/", &cookie).await;
    assert!(body.contains(
        "Error submitting job: sbatch: error: Batch job submission failed: Invalid partition"
    ));

    scheduler.fail_queue(Some("slurm_load_jobs error: Unable to contact slurm controller"));
    let body = page(&app, "/", &cookie).await;
    assert!(body.contains("Error running squeue: slurm_load_jobs error"));
    let body = page(&app, "/cancel_jobs", &cookie).await;
    assert!(body.contains("Error fetching job list: slurm_load_jobs error"));
}

#[tokio::test]
async fn node_status_is_escaped() {
    let (app, scheduler) = test_app();
    let cookie = login(&app, "alice", "pw-alice").await;
    let body = page(&app, "/nodes", &cookie).await;
    assert!(body.contains("<pre>PARTITION AVAIL"));
    assert!(body.contains("node[01-02]"));

    scheduler.fail_nodes(Some("<controller down>"));
    let body = page(&app, "/nodes", &cookie).await;
    assert!(body.contains("Error running sinfo: &lt;controller down&gt;"));
}

#[tokio::test]
async fn cancel_respects_ownership() {
    let (app, scheduler) = test_app();
    let alice = login(&app, "alice", "pw-alice").await;
    let bob = login(&app, "bob", "pw-bob").await;
    submit(&app, &alice, "job_script=sleep+60").await;

    let body = page(&app, "/cancel_jobs", &bob).await;
    assert!(body.contains("No jobs registered."));
    assert!(!body.contains("Show jobs of all users"));

    let res = cancel(&app, &bob, "1000").await;
    assert_eq!(location(&res), "/cancel_jobs");
    let body = page(&app, "/cancel_jobs", &bob).await;
    assert!(body.contains("You are not allowed to cancel this job (it is not yours)."));
    assert!(scheduler.cancelled().is_empty());

    let body = page(&app, "/cancel_jobs", &alice).await;
    assert!(body.contains(r#"<form method="post" action="/cancel/1000""#));

    let res = cancel(&app, &alice, "1000").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let body = page(&app, "/cancel_jobs", &alice).await;
    assert!(body.contains("Job 1000 cancelled successfully."));
    assert!(body.contains("No jobs registered."));
    assert_eq!(scheduler.cancelled(), vec!["1000".to_string()]);

    cancel(&app, &alice, "1000").await;
    let body = page(&app, "/cancel_jobs", &alice).await;
    assert!(body.contains("Job was not submitted through the interface or was already removed."));
}

#[tokio::test]
async fn failed_cancel_keeps_job_listed() {
    let (app, scheduler) = test_app();
    let alice = login(&app, "alice", "pw-alice").await;
    submit(&app, &alice, "job_script=sleep+60").await;

    scheduler.fail_cancel(Some("scancel: error: Kill job error on job id 1000"));
    cancel(&app, &alice, "1000").await;
    let body = page(&app, "/cancel_jobs", &alice).await;
    assert!(body.contains("Error cancelling job 1000: scancel: error: Kill job error on job id 1000"));
    assert!(body.contains("<td>1000</td>"));
}

#[tokio::test]
async fn admin_sees_and_cancels_all_jobs() {
    let (app, scheduler) = test_app();
    let alice = login(&app, "alice", "pw-alice").await;
    let root = login(&app, "root", "pw-root").await;
    submit(&app, &alice, "job_script=sleep+60").await;

    let body = page(&app, "/cancel_jobs", &root).await;
    assert!(body.contains("Show jobs of all users"));
    assert!(body.contains("No jobs registered."));

    let body = page(&app, "/cancel_jobs?all=on", &root).await;
    assert!(body.contains("checked"));
    assert!(body.contains("<td>alice</td>"));

    // Non-admins cannot widen their view.
    let body = page(&app, "/cancel_jobs?all=on", &alice).await;
    assert!(!body.contains("Show jobs of all users"));

    cancel(&app, &root, "1000").await;
    assert_eq!(scheduler.cancelled(), vec!["1000".to_string()]);
}

#[tokio::test]
async fn logout_ends_access() {
    let (app, _) = test_app();
    let cookie = login(&app, "alice", "pw-alice").await;

    let res = app.clone().oneshot(get("/logout", Some(&cookie))).await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");

    let body = page(&app, "/login", &cookie).await;
    assert!(body.contains("You have logged out."));

    let res = app.clone().oneshot(get("/nodes", Some(&cookie))).await.unwrap();
    assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn api_lists_registered_jobs_as_json() {
    let (app, scheduler) = test_app();
    let res = app.clone().oneshot(get("/api/jobs", None)).await.unwrap();
    assert_eq!(location(&res), "/login");

    let cookie = login(&app, "alice", "pw-alice").await;
    submit(&app, &cookie, "job_name=demo&job_script=hostname").await;

    let res = app.clone().oneshot(get("/api/jobs", Some(&cookie))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json: portal_types::JobsResponse = serde_json::from_str(&body_text(res).await).unwrap();
    assert_eq!(json.code, 200);
    let rows = json.data.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].job_id(), "1000");
    assert_eq!(rows[0].entry.name, "demo");
    assert_eq!(rows[0].interface_user, "alice");

    scheduler.fail_queue(Some("squeue: error: slurm_load_jobs"));
    let res = app.clone().oneshot(get("/api/jobs", Some(&cookie))).await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_text(res).await).unwrap();
    assert_eq!(json["code"], 502);
    assert_eq!(json["message"], "squeue: error: slurm_load_jobs");
    assert!(json["data"].is_null());
}

#[tokio::test]
async fn cancel_links_cannot_cancel_by_get() {
    let (app, scheduler) = test_app();
    let alice = login(&app, "alice", "pw-alice").await;
    submit(&app, &alice, "job_script=sleep+60").await;

    let res = app.clone().oneshot(get("/cancel/1000", Some(&alice))).await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(scheduler.cancelled().is_empty());
    let body = page(&app, "/cancel_jobs", &alice).await;
    assert!(body.contains("<td>1000</td>"));
}

#[tokio::test]
async fn auth_backend_errors_read_as_failed_login() {
    let (app, _, _) = app_with(users().failing("pam_authenticate: service unavailable"));
    let res = app
        .clone()
        .oneshot(post_form("/login", None, "username=alice&password=pw-alice"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");
    let cookie = session_cookie(&res).unwrap();

    let body = page(&app, "/login", &cookie).await;
    assert!(body.contains("Login failed. Check your credentials."));
    assert!(!body.contains("service unavailable"));
    let res = app.clone().oneshot(get("/", Some(&cookie))).await.unwrap();
    assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn multiline_username_is_refused() {
    let (app, _, _) = app_with(users());
    // username = "alice\npw-alice"
    let res = app
        .clone()
        .oneshot(post_form("/login", None, "username=alice%0Apw-alice&password=x"))
        .await
        .unwrap();
    assert_eq!(location(&res), "/login");
    let cookie = session_cookie(&res).unwrap();
    let body = page(&app, "/login", &cookie).await;
    assert!(body.contains("Login failed. Check your credentials."));
    assert!(!body.contains("Welcome"));
}

#[tokio::test]
async fn anonymous_reads_store_no_sessions() {
    let (app, _, sessions) = app_with(users());
    for _ in 0..100 {
        let res = app.clone().oneshot(get("/health", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(header::SET_COOKIE).is_none());
    }
    let res = app.clone().oneshot(get("/login", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(sessions.len().await, 0);

    // A stale cookie is not resurrected either.
    let res = app
        .clone()
        .oneshot(get("/login", Some("portal_session=deadbeef")))
        .await
        .unwrap();
    assert!(res.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(sessions.len().await, 0);

    // Gated pages store one session to carry the flash.
    let res = app.clone().oneshot(get("/", None)).await.unwrap();
    assert!(session_cookie(&res).is_some());
    assert_eq!(sessions.len().await, 1);
}
