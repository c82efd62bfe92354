//! Invitation flow
//!
//! An invitation is a pending [`User`] (no name, no password) sealed into a
//! bearer token. Accepting it claims a name and sets a password in a single
//! store transaction, exactly once per record:
//!
//! ```text
//! Pending { name: "", hash: "" } --accept(name, password)--> Activated { name, hash }
//! ```

use crate::backend::StoreError;
use crate::constants::ROOT_TRUST;
use crate::store::UserStore;
use crate::token::{TokenCodec, TokenPurpose};
use crate::user::{SessionUser, User, UserError, crypto};
use crate::{Error, Result};

/// Issues and redeems invitation tokens.
#[derive(Clone, Debug)]
pub struct Invitations {
    codec: TokenCodec,
    store: UserStore,
}

impl Invitations {
    /// Invitations sealed by `codec`'s ring under [`TokenPurpose::Invitation`].
    pub fn new(codec: TokenCodec, store: UserStore) -> Self {
        Self {
            codec: codec.with_purpose(TokenPurpose::Invitation),
            store,
        }
    }

    /// The invitation codec.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Save a pending user and return it with its invitation token.
    pub async fn create_invitation(
        &self,
        email: &str,
        is_admin: bool,
        trust: u32,
    ) -> Result<(User, String)> {
        let user = User::pending(email, is_admin, trust);
        self.store.save(&user).await?;
        let token = self.codec.encode(&user.session())?;
        tracing::info!(user_id = %user.id, is_admin, trust, "Created invitation");
        Ok((user, token))
    }

    /// Bootstrap invitation for the first administrator.
    ///
    /// Only succeeds while no user record exists. `root_name` is kept as the
    /// pending record's email handle; the invitee still chooses a login name
    /// on acceptance.
    pub async fn first_run_invitation(&self, root_name: &str) -> Result<(User, String)> {
        let root_name = root_name.trim();
        if root_name.is_empty() {
            return Err(UserError::EmptyUsername.into());
        }

        let user = User::pending(root_name, true, ROOT_TRUST);
        if !self.store.insert_first(&user).await? {
            return Err(UserError::AlreadyInitialized.into());
        }
        let token = self.codec.encode(&user.session())?;
        tracing::info!(user_id = %user.id, "Created first-run administrator invitation");
        Ok((user, token))
    }

    /// Redeem `token`, claiming `chosen_name` with `password`.
    pub async fn accept_invitation(
        &self,
        chosen_name: &str,
        password: &str,
        token: &str,
    ) -> Result<User> {
        let skeleton: SessionUser = self
            .codec
            .decode_as(token)
            .ok_or(UserError::InvalidInvitation)?;
        if skeleton.id.is_empty() {
            return Err(UserError::InvalidInvitation.into());
        }

        let pending = self
            .store
            .load_by_id(&skeleton.id)
            .await
            .map_err(map_store_error)?;
        if pending.is_activated() {
            return Err(UserError::AlreadyAccepted {
                id: pending.id.to_string(),
            }
            .into());
        }

        let chosen_name = chosen_name.trim();
        if chosen_name.is_empty() {
            return Err(UserError::EmptyUsername.into());
        }
        if self.store.backend().get_by_name(chosen_name).await?.is_some() {
            return Err(UserError::NameTaken {
                name: chosen_name.to_string(),
            }
            .into());
        }

        let hash = crypto::hash_password(password)?;
        let user = self
            .store
            .activate(&pending.id, chosen_name, &hash)
            .await
            .map_err(map_store_error)?;

        tracing::info!(user_id = %user.id, name = %user.unique_name, "Activated user");
        Ok(user)
    }
}

/// Translate store outcomes into invitation outcomes.
fn map_store_error(err: Error) -> Error {
    match err {
        Error::Store(StoreError::NotFound { .. }) => UserError::InvalidInvitation.into(),
        Error::Store(StoreError::AlreadyActivated { id }) => UserError::AlreadyAccepted { id }.into(),
        Error::Store(StoreError::NameUnavailable { name }) => UserError::NameTaken { name }.into(),
        other => other,
    }
}
