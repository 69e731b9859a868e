//! Share access control.
//!
//! A protected share is unlocked by a cookie named `auth---{reference}` whose
//! value is the share's derived token (see [`Share::auth_token`]). Open shares
//! need no cookie.

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use fileserve_common::{Error, Result};
use fileserve_db::{Share, ShareFile, ShareRepository};

pub const COOKIE_PREFIX: &str = "auth---";

pub fn cookie_name(share_reference: &str) -> String {
    format!("{COOKIE_PREFIX}{share_reference}")
}

/// Outcome of checking a request against a share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Allowed(Share),
    /// Protected share, missing or wrong token.
    Unauthorized { share_name: String },
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Password accepted; set this token as the share cookie.
    Token(String),
    /// The share has no password.
    Open,
    InvalidPassword,
    NotFound,
}

/// Check a presented token against a loaded share.
pub fn check_share(share: Share, presented: Option<&str>) -> Authorization {
    match share.auth_token() {
        None => Authorization::Allowed(share),
        Some(expected) if presented == Some(expected.as_str()) => Authorization::Allowed(share),
        Some(_) => Authorization::Unauthorized {
            share_name: share.name,
        },
    }
}

/// A file may only be served under the share that owns it.
pub fn authorize_file(share: &Share, file: &ShareFile) -> Result<()> {
    if file.share_id == share.id {
        Ok(())
    } else {
        Err(Error::Forbidden("file does not belong to this share".into()))
    }
}

/// Build the auth cookie for a share. `secure` is off only in development.
pub fn auth_cookie(share_reference: &str, token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((cookie_name(share_reference), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .build()
}

#[derive(Clone)]
pub struct AuthGate {
    repository: Arc<dyn ShareRepository>,
}

impl AuthGate {
    pub fn new(repository: Arc<dyn ShareRepository>) -> Self {
        Self { repository }
    }

    pub fn authorize(&self, share_reference: &str, presented: Option<&str>) -> Result<Authorization> {
        Ok(match self.repository.share_by_reference(share_reference)? {
            Some(share) => check_share(share, presented),
            None => Authorization::NotFound,
        })
    }

    /// [`AuthGate::authorize`] with the token read from the request cookies.
    pub fn authorize_cookies(&self, share_reference: &str, jar: &CookieJar) -> Result<Authorization> {
        let presented = jar.get(&cookie_name(share_reference)).map(|c| c.value().to_string());
        self.authorize(share_reference, presented.as_deref())
    }

    pub fn login(&self, share_reference: &str, password: &str) -> Result<LoginOutcome> {
        let Some(share) = self.repository.share_by_reference(share_reference)? else {
            return Ok(LoginOutcome::NotFound);
        };

        let Some(token) = share.auth_token() else {
            return Ok(LoginOutcome::Open);
        };

        if share.validate_password(password) {
            tracing::debug!(share = %share.reference, "Share unlocked");
            Ok(LoginOutcome::Token(token))
        } else {
            tracing::info!(share = %share.reference, "Rejected share password");
            Ok(LoginOutcome::InvalidPassword)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use fileserve_common::sha256_hex;
    use fileserve_db::pool::{get_conn, init_memory_pool};
    use fileserve_db::queries::shares::create_share;
    use fileserve_db::SqliteShareRepository;

    fn gate_with_shares() -> (AuthGate, Share, Share) {
        let pool = init_memory_pool().unwrap();
        let (open, locked) = {
            let conn = get_conn(&pool).unwrap();
            (
                create_share(&conn, "Open", None).unwrap(),
                create_share(&conn, "Locked", Some("hunter2")).unwrap(),
            )
        };
        let gate = AuthGate::new(Arc::new(SqliteShareRepository::new(pool)));
        (gate, open, locked)
    }

    #[test]
    fn open_share_always_allowed() {
        let (gate, open, _) = gate_with_shares();
        assert_matches!(gate.authorize(&open.reference, None).unwrap(), Authorization::Allowed(_));
        assert_matches!(
            gate.authorize(&open.reference, Some("garbage")).unwrap(),
            Authorization::Allowed(_)
        );
    }

    #[test]
    fn protected_share_needs_exact_token() {
        let (gate, _, locked) = gate_with_shares();
        let token = locked.auth_token().unwrap();

        assert_eq!(
            gate.authorize(&locked.reference, None).unwrap(),
            Authorization::Unauthorized {
                share_name: "Locked".into()
            }
        );
        assert_matches!(
            gate.authorize(&locked.reference, Some("wrong")).unwrap(),
            Authorization::Unauthorized { .. }
        );
        assert_matches!(
            gate.authorize(&locked.reference, Some(&token.to_uppercase())).unwrap(),
            Authorization::Unauthorized { .. }
        );
        assert_matches!(
            gate.authorize(&locked.reference, Some(&token)).unwrap(),
            Authorization::Allowed(share) if share.id == locked.id
        );
    }

    #[test]
    fn unknown_share_not_found() {
        let (gate, _, _) = gate_with_shares();
        assert_eq!(gate.authorize("missing", None).unwrap(), Authorization::NotFound);
        assert_eq!(gate.login("missing", "x").unwrap(), LoginOutcome::NotFound);
    }

    #[test]
    fn login_outcomes() {
        let (gate, open, locked) = gate_with_shares();

        assert_eq!(gate.login(&open.reference, "anything").unwrap(), LoginOutcome::Open);
        assert_eq!(
            gate.login(&locked.reference, "nope").unwrap(),
            LoginOutcome::InvalidPassword
        );

        let expected = sha256_hex(&format!(
            "{}{}",
            locked.reference,
            locked.password_hash.as_deref().unwrap()
        ));
        assert_eq!(
            gate.login(&locked.reference, "hunter2").unwrap(),
            LoginOutcome::Token(expected)
        );
    }

    #[test]
    fn cookie_jar_token_is_read() {
        let (gate, _, locked) = gate_with_shares();
        let token = locked.auth_token().unwrap();

        let jar = CookieJar::new().add(Cookie::new(cookie_name(&locked.reference), token));
        assert_matches!(
            gate.authorize_cookies(&locked.reference, &jar).unwrap(),
            Authorization::Allowed(_)
        );

        // A cookie for another share does not count
        let jar = CookieJar::new().add(Cookie::new(cookie_name("other"), "x"));
        assert_matches!(
            gate.authorize_cookies(&locked.reference, &jar).unwrap(),
            Authorization::Unauthorized { .. }
        );
    }

    #[test]
    fn file_must_belong_to_share() {
        let share = Share {
            id: 1,
            name: "A".into(),
            reference: "a".into(),
            password_hash: None,
        };
        let mut file = ShareFile {
            id: 7,
            share_id: 1,
            file_path: "/srv/a.txt".into(),
            file_name: "a.txt".into(),
            reference: "f".into(),
        };
        assert!(authorize_file(&share, &file).is_ok());

        file.share_id = 2;
        assert_matches!(authorize_file(&share, &file), Err(Error::Forbidden(_)));
    }

    #[test]
    fn cookie_attributes() {
        let cookie = auth_cookie("abc", "tok".into(), true);
        assert_eq!(cookie.name(), "auth---abc");
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.secure(), Some(true));

        assert_eq!(auth_cookie("abc", "tok".into(), false).secure(), Some(false));
    }
}
