//! Authorization gate for axum routers
//!
//! [`wrap`] puts a [`Rule`] in front of a router. On each request the
//! caller's session is read from the cookie jar and checked against the
//! rule:
//!
//! 1. admins are always forwarded
//! 2. `trust_exactly != 0` and the caller's trust equals it: forwarded
//! 3. `trust_at_least >= 1` and the caller's trust reaches it: forwarded
//! 4. otherwise the login surface is served, or a `302` to the rule's
//!    redirect target
//!
//! Zero trust never satisfies a rule.
//!
//! The gate reads cookies through [`tower_cookies::Cookies`], so a
//! [`CookieManagerLayer`](tower_cookies::CookieManagerLayer) must wrap the
//! gated router.

pub mod templates;

use std::sync::Arc;

use axum::Form;
use axum::Router;
use axum::extract::{FromRequest, Query, Request, State};
use axum::http::{Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::authority::Authority;
use crate::user::{SessionUser, User};
use crate::Error;

/// Declarative access requirement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Only administrators pass.
    #[serde(default)]
    pub admin: bool,
    /// Pass callers whose trust equals this (ignored when zero).
    #[serde(default)]
    pub trust_exactly: u32,
    /// Pass callers whose trust is at least this (ignored when zero).
    #[serde(default)]
    pub trust_at_least: u32,
    /// Send refused callers here instead of serving the login form.
    #[serde(default)]
    pub redirect: Option<String>,
}

impl Rule {
    pub fn admin() -> Self {
        Self {
            admin: true,
            ..Self::default()
        }
    }

    pub fn trust_at_least(level: u32) -> Self {
        Self {
            trust_at_least: level,
            ..Self::default()
        }
    }

    pub fn trust_exactly(level: u32) -> Self {
        Self {
            trust_exactly: level,
            ..Self::default()
        }
    }

    /// Redirect refused callers to `location`.
    pub fn with_redirect(mut self, location: impl Into<String>) -> Self {
        self.redirect = Some(location.into());
        self
    }

    /// Whether `user` may pass.
    pub fn allows(&self, user: &SessionUser) -> bool {
        if user.is_admin {
            return true;
        }
        if self.admin {
            return false;
        }
        if self.trust_exactly != 0 && user.trust == self.trust_exactly {
            return true;
        }
        self.trust_at_least >= 1 && user.trust >= self.trust_at_least
    }
}

#[derive(Clone)]
struct Gate {
    authority: Authority,
    rule: Arc<Rule>,
}

/// Guard every route of `router` with `rule`.
///
/// The gate is attached with `route_layer`, so it applies to the routes
/// already added to `router` (add them first) and unmatched paths still 404.
/// Register gated routes with [`axum::routing::any`] if the login surface
/// should also answer `POST` and `DELETE` on them.
///
/// ```ignore
/// let amigos = Router::new().route("/amigos", any(amigos_page));
/// let app = Router::new()
///     .merge(gate::wrap(amigos, authority.clone(), Rule::trust_at_least(5)))
///     .layer(CookieManagerLayer::new());
/// ```
pub fn wrap<S>(router: Router<S>, authority: Authority, rule: Rule) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let gate = Gate {
        authority,
        rule: Arc::new(rule),
    };
    router.route_layer(middleware::from_fn_with_state(gate, guard))
}

async fn guard(State(gate): State<Gate>, cookies: Cookies, request: Request, next: Next) -> Response {
    let user = gate.authority.session().read_session(&cookies);
    if gate.rule.allows(&user) {
        tracing::debug!(user_id = %user.id, path = %request.uri().path(), "Gate forwarded");
        return next.run(request).await;
    }

    tracing::debug!(user_id = %user.id, path = %request.uri().path(), "Gate refused");
    if let Some(location) = &gate.rule.redirect {
        return (StatusCode::FOUND, [(header::LOCATION, location.clone())]).into_response();
    }
    login_surface(&gate.authority, &cookies, request).await
}

/// Stand-alone login endpoint: `GET` form, `POST` credentials or invitation,
/// `DELETE` logout.
pub async fn login_handler(
    State(authority): State<Authority>,
    cookies: Cookies,
    request: Request,
) -> Response {
    login_surface(&authority, &cookies, request).await
}

/// Stand-alone logout endpoint for `POST` and `DELETE`.
pub async fn logout_handler(
    State(authority): State<Authority>,
    cookies: Cookies,
    method: Method,
) -> Response {
    match method {
        Method::POST | Method::DELETE => {
            authority.session().invalidate(&cookies);
            Html(templates::logged_out_page()).into_response()
        }
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    chosen_name: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    invite: String,
}

#[derive(Debug, Default, Deserialize)]
struct InviteQuery {
    #[serde(default)]
    invite: Option<String>,
}

async fn login_surface(authority: &Authority, cookies: &Cookies, request: Request) -> Response {
    let action = request.uri().path().to_string();
    let invite = Query::<InviteQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(q)| q.invite)
        .filter(|token| !token.is_empty());

    match *request.method() {
        Method::GET | Method::HEAD => {
            Html(templates::login_page(&action, None, invite.as_deref())).into_response()
        }
        Method::POST => {
            let mut form = match Form::<LoginForm>::from_request(request, &()).await {
                Ok(Form(form)) => form,
                Err(rejection) => return rejection.into_response(),
            };
            if form.invite.is_empty()
                && let Some(token) = invite
            {
                form.invite = token;
            }
            submit(authority, cookies, form, &action).await
        }
        Method::DELETE => {
            authority.session().invalidate(cookies);
            Html(templates::logged_out_page()).into_response()
        }
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

async fn submit(authority: &Authority, cookies: &Cookies, form: LoginForm, action: &str) -> Response {
    if form.invite.is_empty() {
        return match authority.login(&form.username, &form.password).await {
            Ok(user) => issue(authority, cookies, &user),
            Err(e) => refuse(e, action, None),
        };
    }

    let name = if form.chosen_name.is_empty() {
        &form.username
    } else {
        &form.chosen_name
    };
    match authority
        .accept_invitation(name, &form.password, &form.invite)
        .await
    {
        Ok(user) => issue(authority, cookies, &user),
        Err(e) => refuse(e, action, Some(&form.invite)),
    }
}

fn issue(authority: &Authority, cookies: &Cookies, user: &User) -> Response {
    match authority.cookie_for(user) {
        Ok(cookie) => {
            cookies.add(cookie);
            Html(templates::welcome_page(&user.unique_name)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

fn refuse(err: Error, action: &str, invite: Option<&str>) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        return err.into_response();
    }
    let message = err.to_string();
    (
        status,
        Html(templates::login_page(action, Some(&message), invite)),
    )
        .into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            return (status, "Internal error").into_response();
        }
        (status, self.to_string()).into_response()
    }
}
