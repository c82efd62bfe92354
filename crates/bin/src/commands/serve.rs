//! Serve command - runs the Wicket web server.

use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{any, delete, get, post},
};
use serde::Deserialize;
use tokio::signal::unix::{SignalKind, signal};
use tower_cookies::{CookieManagerLayer, Cookies};

use wicket::{
    Authority, Rule, SessionUser,
    backend::InMemory,
    gate::{
        self,
        templates::{html_escape, page},
    },
};

use crate::cli::ServeArgs;
use crate::output::InvitationOutput;

/// Invitation form for `POST /invites`
#[derive(Debug, Default, Deserialize)]
struct InviteParams {
    #[serde(default)]
    email: String,
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    trust: u32,
}

/// Run the Wicket server
pub async fn run(args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.store.options();
    let authority = Authority::open(options.clone()).await?;

    if authority.store().is_empty().await? {
        tracing::warn!("No users yet; run `wicket first-run` to bootstrap an administrator");
    }

    let rotation = authority.spawn_key_rotation(options.rotation_interval());
    let app = router(&authority, args.amigos_trust);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        addr = %local_addr,
        data_dir = %options.data_dir().display(),
        keys = options.capacity(),
        "Wicket server listening"
    );
    println!("Wicket server starting on http://{local_addr}");
    println!();
    println!("Available endpoints:");
    println!("  GET    /            - Public page");
    println!("  *      /admin/*     - Administrators only");
    println!(
        "  *      /amigos/*    - Trust level {} and above",
        args.amigos_trust
    );
    println!("  POST   /invites     - Issue an invitation (admin)");
    println!("  DELETE /keys        - Reset all keys (admin)");
    println!("  GET    /login       - Login form");
    println!("  POST   /login       - Login or invitation acceptance");
    println!("  POST   /logout      - Logout");
    println!("  GET    /health      - Health check");
    println!();
    println!("Press Ctrl+C to shutdown");

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!("Failed to set up SIGTERM handler: {e}");
                    return;
                }
            };
            let mut sigint = match signal(SignalKind::interrupt()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!("Failed to set up SIGINT handler: {e}");
                    return;
                }
            };

            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
                _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown..."),
            }
        })
        .await?;

    rotation.abort();
    save_in_memory(&authority, &options.json_path()).await;

    println!("Server shut down");
    Ok(())
}

/// The full application: public page, gated areas, login/logout and admin API.
fn router(authority: &Authority, amigos_trust: u32) -> Router {
    let admin = Router::new()
        .route("/admin", any(handle_area))
        .route("/admin/{*rest}", any(handle_area))
        .route("/invites", post(handle_invite))
        .route("/keys", delete(handle_reset_keys));

    let amigos = Router::new()
        .route("/amigos", any(handle_area))
        .route("/amigos/{*rest}", any(handle_area));

    Router::new()
        .route("/", get(handle_index))
        .route(
            "/login",
            get(gate::login_handler)
                .post(gate::login_handler)
                .delete(gate::login_handler),
        )
        .route(
            "/logout",
            post(gate::logout_handler).delete(gate::logout_handler),
        )
        .route("/health", get(handle_health))
        .merge(gate::wrap(admin, authority.clone(), Rule::admin()))
        .merge(gate::wrap(
            amigos,
            authority.clone(),
            Rule::trust_at_least(amigos_trust),
        ))
        .with_state(authority.clone())
        .layer(CookieManagerLayer::new())
}

/// Persist the user store when running on the development backend.
async fn save_in_memory(authority: &Authority, path: &std::path::Path) {
    let Some(in_memory) = authority.store().backend().as_any().downcast_ref::<InMemory>() else {
        return;
    };
    match in_memory.save_to_file(path).await {
        Ok(()) => tracing::info!("User store saved to {}", path.display()),
        Err(e) => tracing::error!("Failed to save user store: {e}"),
    }
}

// ============================================================================
// Page Handlers
// ============================================================================

/// Handler for GET / - Public page
async fn handle_index(State(authority): State<Authority>, cookies: Cookies) -> Html<String> {
    let user = authority.session().read_session(&cookies);
    let greeting = if user.is_anonymous() {
        r#"<p><a href="/login">Login</a></p>"#.to_string()
    } else {
        format!(
            r#"<p>Logged in as <strong>{}</strong>.</p>
        <form method="POST" action="/logout"><button type="submit">Logout</button></form>"#,
            html_escape(&user.name)
        )
    };
    Html(page("Wicket", &format!("<h1>Wicket</h1>\n        {greeting}")))
}

/// Handler for the gated areas; the gate has already admitted the caller.
async fn handle_area(State(authority): State<Authority>, cookies: Cookies) -> Html<String> {
    let user = authority.session().read_session(&cookies);
    Html(area_page(&user))
}

fn area_page(user: &SessionUser) -> String {
    let role = if user.is_admin { "administrator" } else { "member" };
    page(
        "Members",
        &format!(
            "<h1>Hello, {}</h1>\n        <p>Signed in as {role} with trust level {}.</p>",
            html_escape(&user.name),
            user.trust
        ),
    )
}

// ============================================================================
// Admin API Handlers
// ============================================================================

/// Handler for POST /invites
async fn handle_invite(
    State(authority): State<Authority>,
    Form(params): Form<InviteParams>,
) -> Response {
    match authority
        .create_invitation(&params.email, params.admin, params.trust)
        .await
    {
        Ok((user, token)) => Json(InvitationOutput::new(&user, token)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Handler for DELETE /keys - Invalidate every session and invitation
async fn handle_reset_keys(State(authority): State<Authority>) -> Response {
    match authority.reset_keys().await {
        Ok(()) => {
            tracing::warn!("All keys reset by administrator");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => e.into_response(),
    }
}

// ============================================================================
// Health Handler
// ============================================================================

/// Health check response
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    backend: &'static str,
    keys: usize,
}

/// Handler for GET /health - Health check endpoint
async fn handle_health(State(authority): State<Authority>) -> Json<HealthResponse> {
    let keys = authority.keyring().len();
    Json(HealthResponse {
        status: if keys > 0 { "healthy" } else { "unhealthy" },
        backend: backend_name(authority.store().backend().as_any()),
        keys,
    })
}

fn backend_name(backend: &dyn std::any::Any) -> &'static str {
    if backend.is::<InMemory>() {
        return "inmemory";
    }
    #[cfg(feature = "sqlite")]
    if backend.is::<wicket::backend::SqlxBackend>() {
        return "sqlite";
    }
    "unknown"
}
