//! The `Authority` context object
//!
//! Holds everything a request needs to authenticate a caller: the resolved
//! [`Options`], the shared [`KeyRing`], the [`TokenCodec`] built on it, the
//! [`UserStore`], the [`Session`] cookie helper and the clock. It is
//! constructed explicitly and passed to every component that needs it.
//!
//! `Authority` is a cheap-to-clone handle around `Arc<AuthorityInternal>`.

use std::sync::Arc;
use std::time::Duration;

use handle_trait::Handle;
use tokio::task::JoinHandle;
use tower_cookies::Cookie;

use crate::backend::StoreError;
use crate::clock::{Clock, SystemClock};
use crate::config::Options;
use crate::invite::Invitations;
use crate::keyring::KeyRing;
use crate::session::Session;
use crate::store::UserStore;
use crate::token::TokenCodec;
use crate::user::{User, UserError, UserId, crypto};
use crate::{Error, Result};

pub(crate) struct AuthorityInternal {
    options: Options,
    keyring: Arc<KeyRing>,
    codec: TokenCodec,
    store: UserStore,
    session: Session,
    invitations: Invitations,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AuthorityInternal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorityInternal")
            .field("options", &self.options)
            .field("keyring", &self.keyring)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

/// Shared authentication context.
///
/// ```ignore
/// use wicket::{Authority, config::Options};
///
/// #[tokio::main]
/// async fn main() -> wicket::Result<()> {
///     let authority = Authority::open(Options::default()).await?;
///     let (_, token) = authority.create_invitation("a@b.com", false, 2).await?;
///     let alice = authority.accept_invitation("alice", "pw1", &token).await?;
///     authority.login("alice", "pw1").await?;
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug, Handle)]
pub struct Authority {
    inner: Arc<AuthorityInternal>,
}

impl Authority {
    /// Open the data directory named by `options`.
    ///
    /// Loads the key ring (generating it on first run) and opens the user
    /// store. Any failure here is fatal: no partial operation without both.
    pub async fn open(options: Options) -> Result<Self> {
        let options = options.resolved();
        let data_dir = options.data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let keyring = KeyRing::open(options.key_file(), options.capacity()).await?;

        #[cfg(feature = "sqlite")]
        let store = UserStore::open_sqlite(options.db_path()).await?;
        #[cfg(not(feature = "sqlite"))]
        let store = {
            tracing::warn!("Built without SQLite; users are kept in memory");
            let backend = crate::backend::InMemory::load_from_file(options.json_path()).await?;
            UserStore::new(Arc::new(backend))
        };

        tracing::info!(
            data_dir = %data_dir.display(),
            keys = keyring.len(),
            interval_hours = options.key_rotation_interval_hours,
            "Authority ready"
        );
        Ok(Self::with_parts(
            options,
            Arc::new(keyring),
            store,
            Arc::new(SystemClock),
        ))
    }

    /// Assemble from already-opened parts.
    pub fn with_parts(
        options: Options,
        keyring: Arc<KeyRing>,
        store: UserStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let codec = TokenCodec::new(keyring.clone(), options.rotation_interval(), clock.clone());
        let session = Session::new(codec.clone(), options.cookie_name.clone());
        let invitations = Invitations::new(codec.clone(), store.clone());
        Self {
            inner: Arc::new(AuthorityInternal {
                options,
                keyring,
                codec,
                store,
                session,
                invitations,
                clock,
            }),
        }
    }

    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    pub fn keyring(&self) -> &Arc<KeyRing> {
        &self.inner.keyring
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.inner.codec
    }

    pub fn store(&self) -> &UserStore {
        &self.inner.store
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Save a pending user and return it with its invitation token.
    pub async fn create_invitation(
        &self,
        email: &str,
        is_admin: bool,
        trust: u32,
    ) -> Result<(User, String)> {
        self.inner
            .invitations
            .create_invitation(email, is_admin, trust)
            .await
    }

    /// Redeem an invitation token for an activated account.
    pub async fn accept_invitation(
        &self,
        chosen_name: &str,
        password: &str,
        token: &str,
    ) -> Result<User> {
        self.inner
            .invitations
            .accept_invitation(chosen_name, password, token)
            .await
    }

    /// Bootstrap invitation for the first administrator.
    pub async fn first_run_invitation(&self, root_name: &str) -> Result<(User, String)> {
        self.inner.invitations.first_run_invitation(root_name).await
    }

    /// Administrative path: create an already-activated user.
    pub async fn create_user(
        &self,
        name: &str,
        password: &str,
        email: &str,
        is_admin: bool,
        trust: u32,
    ) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(UserError::EmptyUsername.into());
        }
        let user = User {
            id: UserId::generate(),
            unique_name: name.to_string(),
            email: email.to_string(),
            password_hash: crypto::hash_password(password)?,
            is_admin,
            trust,
            active: true,
            last_seen: None,
        };
        self.store().save(&user).await.map_err(|e| match e {
            Error::Store(StoreError::NameUnavailable { name }) => UserError::NameTaken { name }.into(),
            other => other,
        })?;
        tracing::info!(user_id = %user.id, name = %user.unique_name, "Created user");
        Ok(user)
    }

    /// Check a name and password.
    ///
    /// Every failure is [`UserError::Unauthorized`]; storage faults are
    /// still returned as such. On success `last_seen` is updated.
    pub async fn login(&self, name: &str, password: &str) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(UserError::Unauthorized.into());
        }
        let user = match self.store().load_by_name(name).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                tracing::warn!(name, "Login failed");
                return Err(UserError::Unauthorized.into());
            }
            Err(e) => return Err(e),
        };

        if !user.active || crypto::verify_password(password, &user.password_hash).is_err() {
            tracing::warn!(name, "Login failed");
            return Err(UserError::Unauthorized.into());
        }

        let user = self.store().touch(&user.id, self.clock().now_utc()).await?;
        tracing::info!(user_id = %user.id, name = %user.unique_name, "Logged in");
        Ok(user)
    }

    /// [`Authority::login`] and seal the result into a session cookie.
    pub async fn login_cookie(&self, name: &str, password: &str) -> Result<(User, Cookie<'static>)> {
        let user = self.login(name, password).await?;
        let cookie = self.session().build_cookie(&user.session())?;
        Ok((user, cookie))
    }

    /// Session cookie for a freshly activated or loaded user.
    pub fn cookie_for(&self, user: &User) -> Result<Cookie<'static>> {
        Ok(self.session().build_cookie(&user.session())?)
    }

    /// Rename an activated user.
    pub async fn change_name(&self, user: &User, new_name: &str) -> Result<User> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(UserError::EmptyUsername.into());
        }
        self.store().change_name(user, new_name).await
    }

    /// Look up by id, falling back to name.
    pub async fn load_user(&self, id: &UserId, name: &str) -> Result<User> {
        self.store().load(id, name).await
    }

    /// Rotate the key ring one step.
    pub async fn rotate_keys(&self) -> Result<()> {
        Ok(self.keyring().rotate().await?)
    }

    /// Regenerate every key, invalidating all sessions and invitations.
    pub async fn reset_keys(&self) -> Result<()> {
        Ok(self.keyring().reset().await?)
    }

    /// Rotate keys every `interval` on a background task.
    ///
    /// The first rotation happens one full interval after the call.
    pub fn spawn_key_rotation(&self, interval: Duration) -> JoinHandle<()> {
        let authority = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = authority.rotate_keys().await {
                    tracing::error!(error = %e, "Scheduled key rotation failed");
                }
            }
        })
    }
}
