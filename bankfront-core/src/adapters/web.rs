//! axum web layer
//!
//! Form posts arrive URL-encoded and always answer with a redirect; pages
//! are served as JSON page models. The session lives in the `token` cookie.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{RawQuery, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::{CONSENT_COOKIE, TOKEN_COOKIE};
use crate::domain::form::{PASSWORD, USERNAME, UUID};
use crate::domain::page::{LOGIN_FAILED_MSG, SIGNUP_FAILED_MSG};
use crate::domain::result::Result;
use crate::domain::{FormKind, FormState, IdempotencyToken, LoginPage, Session, SignupPage};
use crate::services::{Event, SubmissionOutcome};
use crate::FrontendContext;

type Ctx = State<Arc<FrontendContext>>;

/// Build the frontend router
pub fn router(ctx: Arc<FrontendContext>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/home", get(home))
        .route("/login", get(login_page).post(login))
        .route("/signup", get(signup_page).post(signup))
        .route("/payment", post(payment))
        .route("/deposit", post(deposit))
        .route("/logout", post(logout))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .route("/whereami", get(whereami))
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Logs method, path, status and latency of every request except probes
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    if path == "/ready" {
        return next.run(request).await;
    }

    let start = Instant::now();
    let response = next.run(request).await;
    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    if status >= 500 {
        warn!(method = %method, path = %path, status, latency_ms, "Request failed (5xx)");
    } else {
        info!(method = %method, path = %path, status, latency_ms, "Request completed");
    }
    response
}

// === Page models ===

/// Deployment details shown in every page footer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footer {
    pub bank_name: String,
    pub cluster_name: String,
    pub pod_name: String,
    pub pod_zone: String,
    pub platform: Option<String>,
    pub platform_display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Page<T: Serialize> {
    #[serde(flatten)]
    body: T,
    footer: Footer,
}

fn footer(ctx: &FrontendContext) -> Footer {
    let config = &ctx.config;
    Footer {
        bank_name: config.bank_name.clone(),
        cluster_name: config.cluster_name.clone(),
        pod_name: config.pod_name.clone(),
        pod_zone: config.pod_zone.clone(),
        platform: config
            .platform
            .and_then(|p| serde_json::to_value(p).ok())
            .and_then(|v| v.as_str().map(str::to_string)),
        platform_display_name: config.platform.map(|p| p.display_name().to_string()),
    }
}

fn page<T: Serialize>(ctx: &FrontendContext, body: T) -> Response {
    Json(Page {
        body,
        footer: footer(ctx),
    })
    .into_response()
}

/// The `msg` banner parameter of a raw query string
fn message_from(raw: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(raw?.as_bytes())
        .find(|(key, _)| key == "msg")
        .map(|(_, value)| value.into_owned())
}

// === Redirects ===

/// `path` plus an optional `msg` query, made absolute with the configured
/// scheme when the request named its host
fn location(ctx: &FrontendContext, headers: &HeaderMap, path: &str, msg: Option<&str>) -> String {
    let mut target = path.to_string();
    if let Some(msg) = msg {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("msg", msg)
            .finish();
        target = format!("{}?{}", target, query);
    }
    match headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => format!("{}://{}{}", ctx.config.scheme, host, target),
        None => target,
    }
}

fn redirect(status: StatusCode, location: String) -> Response {
    (status, [(header::LOCATION, location)]).into_response()
}

fn session_from(ctx: &FrontendContext, jar: &CookieJar) -> Option<Session> {
    ctx.verifier.session(jar.get(TOKEN_COOKIE).map(|c| c.value()))
}

fn session_cookie(session: &Session) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, session.token.clone()))
        .path("/")
        .max_age(time::Duration::seconds(session.claims.max_age()))
        .build()
}

/// Sent whether or not the browser holds the cookie
fn expired(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "")).path("/").build();
    cookie.make_removal();
    cookie
}

async fn record(ctx: &FrontendContext, event: Event) {
    let Some(log) = ctx.event_log.clone() else {
        return;
    };
    match tokio::task::spawn_blocking(move || log.log(event)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Failed to record event: {}", e),
        Err(e) => warn!("Event log task failed: {}", e),
    }
}

fn form_event(kind: FormKind, outcome: &str, request: Option<IdempotencyToken>) -> Event {
    let event = Event::for_form(kind, outcome);
    match request {
        Some(token) => event.with_request(token),
        None => event,
    }
}

// === Handlers ===

async fn index(state: Ctx, headers: HeaderMap, jar: CookieJar, query: RawQuery) -> Response {
    if session_from(&state, &jar).is_some() {
        home(state, headers, jar, query).await
    } else {
        login_page(state, headers, jar, query).await
    }
}

async fn home(State(ctx): Ctx, headers: HeaderMap, jar: CookieJar, RawQuery(query): RawQuery) -> Response {
    let Some(session) = session_from(&ctx, &jar) else {
        debug!("User isn't authenticated. Redirecting to login page");
        return redirect(StatusCode::FOUND, location(&ctx, &headers, "/login", None));
    };
    let view = ctx
        .home_service
        .load(&session, message_from(query.as_deref()))
        .await;
    page(&ctx, view)
}

async fn login_page(State(ctx): Ctx, headers: HeaderMap, jar: CookieJar, RawQuery(query): RawQuery) -> Response {
    if session_from(&ctx, &jar).is_some() {
        debug!("User already authenticated. Redirecting to /home");
        return redirect(StatusCode::FOUND, location(&ctx, &headers, "/home", None));
    }
    let search = query.as_deref().map(|q| format!("?{}", q)).unwrap_or_default();
    let message = message_from(query.as_deref());
    page(&ctx, LoginPage::new(ctx.config.bank_name.clone(), &search, message))
}

async fn signup_page(State(ctx): Ctx, headers: HeaderMap, jar: CookieJar) -> Response {
    if session_from(&ctx, &jar).is_some() {
        debug!("User already authenticated. Redirecting to /home");
        return redirect(StatusCode::FOUND, location(&ctx, &headers, "/home", None));
    }
    let today = Utc::now().date_naive();
    page(&ctx, SignupPage::new(ctx.config.bank_name.clone(), today))
}

async fn login(
    State(ctx): Ctx,
    headers: HeaderMap,
    jar: CookieJar,
    Form(form): Form<FormState>,
) -> Response {
    let result = ctx
        .auth_service
        .login(form.get(USERNAME), form.get(PASSWORD))
        .await;
    finish_login(&ctx, &headers, jar, FormKind::Login, result, LOGIN_FAILED_MSG).await
}

async fn signup(
    State(ctx): Ctx,
    headers: HeaderMap,
    jar: CookieJar,
    Form(form): Form<FormState>,
) -> Response {
    let today = Utc::now().date_naive();
    let result = ctx.auth_service.signup(&form, today).await;
    finish_login(&ctx, &headers, jar, FormKind::Signup, result, SIGNUP_FAILED_MSG).await
}

async fn finish_login(
    ctx: &FrontendContext,
    headers: &HeaderMap,
    jar: CookieJar,
    kind: FormKind,
    result: Result<Session>,
    failure_msg: &str,
) -> Response {
    match result {
        Ok(session) => {
            record(ctx, Event::for_form(kind, "succeeded")).await;
            let jar = jar.add(session_cookie(&session));
            (jar, redirect(StatusCode::FOUND, location(ctx, headers, "/home", None))).into_response()
        }
        Err(e) => {
            error!("Error during {}: {}", kind.as_str(), e);
            record(ctx, Event::for_form(kind, "failed").with_error(e.to_string())).await;
            redirect(
                StatusCode::FOUND,
                location(ctx, headers, "/login", Some(failure_msg)),
            )
        }
    }
}

async fn payment(
    State(ctx): Ctx,
    headers: HeaderMap,
    jar: CookieJar,
    Form(form): Form<FormState>,
) -> Response {
    let Some(session) = session_from(&ctx, &jar) else {
        error!("Error submitting payment: user is not authenticated");
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let request = IdempotencyToken::parse(form.get(UUID)).ok();
    record(&ctx, form_event(FormKind::Payment, "submitted", request)).await;

    let today = Utc::now().date_naive();
    let result = ctx.payment_service.submit(&session, &form, today).await;
    finish_transfer(&ctx, &headers, FormKind::Payment, request, result.map(|_| ())).await
}

async fn deposit(
    State(ctx): Ctx,
    headers: HeaderMap,
    jar: CookieJar,
    Form(form): Form<FormState>,
) -> Response {
    let Some(session) = session_from(&ctx, &jar) else {
        error!("Error submitting deposit: user is not authenticated");
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let request = IdempotencyToken::parse(form.get(UUID)).ok();
    record(&ctx, form_event(FormKind::Deposit, "submitted", request)).await;

    let today = Utc::now().date_naive();
    let result = ctx.deposit_service.submit(&session, &form, today).await;
    finish_transfer(&ctx, &headers, FormKind::Deposit, request, result.map(|_| ())).await
}

/// 303 back home on success, 302 with the failure banner otherwise
async fn finish_transfer(
    ctx: &FrontendContext,
    headers: &HeaderMap,
    kind: FormKind,
    request: Option<IdempotencyToken>,
    result: Result<()>,
) -> Response {
    let outcome = SubmissionOutcome::from_result(&result);
    let event = match &result {
        Ok(()) => form_event(kind, "succeeded", request),
        Err(e) => form_event(kind, "failed", request).with_error(e.to_string()),
    };
    record(ctx, event).await;

    let status = if outcome.is_success() {
        StatusCode::SEE_OTHER
    } else {
        StatusCode::FOUND
    };
    redirect(
        status,
        location(ctx, headers, "/home", Some(&outcome.message(kind))),
    )
}

async fn logout(State(ctx): Ctx, headers: HeaderMap, jar: CookieJar) -> Response {
    info!("Logging out");
    let jar = jar.add(expired(TOKEN_COOKIE)).add(expired(CONSENT_COOKIE));
    (jar, redirect(StatusCode::FOUND, location(&ctx, &headers, "/login", None))).into_response()
}

async fn ready() -> &'static str {
    "ok"
}

async fn version(State(ctx): Ctx) -> String {
    ctx.config.version.clone()
}

#[derive(Debug, Serialize)]
struct WhereAmI {
    cluster: String,
    pod: String,
    zone: String,
}

async fn whereami(State(ctx): Ctx) -> Json<WhereAmI> {
    Json(WhereAmI {
        cluster: ctx.config.cluster_name.clone(),
        pod: ctx.config.pod_name.clone(),
        zone: ctx.config.pod_zone.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::demo::DemoBackend;
    use crate::config::Config;
    use crate::services::TokenVerifier;

    fn ctx() -> FrontendContext {
        let config = Config::default();
        let backend = Arc::new(DemoBackend::empty(b"s", config.local_routing.clone()).unwrap());
        FrontendContext::new(config, backend, Arc::new(TokenVerifier::from_secret(b"s"))).unwrap()
    }

    #[test]
    fn test_location_encodes_message() {
        let ctx = ctx();
        let headers = HeaderMap::new();
        assert_eq!(
            location(&ctx, &headers, "/login", Some("Login Failed")),
            "/login?msg=Login+Failed"
        );
        assert_eq!(
            location(&ctx, &headers, "/home", Some("Payment failed: can't send to self")),
            "/home?msg=Payment+failed%3A+can%27t+send+to+self"
        );
    }

    #[test]
    fn test_message_from_query() {
        assert_eq!(message_from(Some("msg=Login+Failed")).as_deref(), Some("Login Failed"));
        assert_eq!(message_from(Some("x=1&msg=a%3Ab")).as_deref(), Some("a:b"));
        assert_eq!(message_from(Some("x=1")), None);
        assert_eq!(message_from(None), None);
    }

    #[test]
    fn test_location_uses_scheme_and_host() {
        let ctx = ctx();
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "bank.example:8080".parse().unwrap());
        assert_eq!(
            location(&ctx, &headers, "/home", None),
            "http://bank.example:8080/home"
        );
    }
}
