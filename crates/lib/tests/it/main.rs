/*! Integration tests for Wicket.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * - keyring: rotation, reset, persistence and first-run behaviour of the key ring
 * - token: token codec behaviour across rotations
 * - user_store: dual-index invariants of the user store, for every backend
 * - invitation: the pending -> activated state machine
 * - session: cookies issued and read through a real cookie manager
 * - gate: the authorization middleware driven through axum
 * - scenario: end-to-end invite, accept, login flow
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("wicket=info".parse().unwrap()))
        .with_test_writer()
        .try_init();
}

mod gate;
mod invitation;
mod keyring;
mod scenario;
mod session;
