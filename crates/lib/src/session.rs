//! Cookie sessions
//!
//! A session is a [`SessionUser`] sealed by the [`TokenCodec`] and stored in a
//! single http-only, `SameSite=Lax` cookie on path `/`. There is no
//! server-side session table: validity is the token's, and logout overwrites
//! the cookie with a sentinel that never decodes.

use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

use crate::constants::LOGOUT_SENTINEL;
use crate::token::{TokenCodec, TokenError};
use crate::user::SessionUser;

/// Builds and reads session cookies.
#[derive(Clone, Debug)]
pub struct Session {
    codec: TokenCodec,
    cookie_name: String,
}

impl Session {
    pub fn new(codec: TokenCodec, cookie_name: impl Into<String>) -> Self {
        Self {
            codec,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Seal `user` into a fresh session cookie.
    pub fn build_cookie(&self, user: &SessionUser) -> Result<Cookie<'static>, TokenError> {
        let token = self.codec.encode(user)?;
        Ok(self.cookie(token))
    }

    /// The caller's identity, or the anonymous user if the cookie is missing
    /// or does not verify.
    pub fn read_session(&self, cookies: &Cookies) -> SessionUser {
        match cookies.get(&self.cookie_name) {
            Some(cookie) => self.read_value(cookie.value()),
            None => SessionUser::anonymous(),
        }
    }

    /// Decode a raw cookie value.
    pub fn read_value(&self, value: &str) -> SessionUser {
        self.codec
            .decode_as::<SessionUser>(value)
            .unwrap_or_else(SessionUser::anonymous)
    }

    /// Overwrite the session cookie with the logout sentinel.
    pub fn invalidate(&self, cookies: &Cookies) {
        cookies.add(self.logout_cookie());
    }

    /// The cookie written on logout.
    pub fn logout_cookie(&self) -> Cookie<'static> {
        self.cookie(LOGOUT_SENTINEL.to_string())
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.cookie_name.clone(), value);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookie
    }
}
