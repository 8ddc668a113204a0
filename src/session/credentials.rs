use crate::error::QualarError;
use serde::Serialize;
use std::env;
use std::fmt;

/// Environment variable holding the Qualar login.
pub const LOGIN_ENV: &str = "CETESB_USER";
/// Environment variable holding the Qualar password.
pub const PASSWORD_ENV: &str = "CETESB_PW";

/// Login and password for the Qualar portal.
///
/// Nothing is validated beyond presence: the portal gives no usable signal for a
/// rejected login, so bad credentials only show up later as empty query results.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    login: String,
    password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    /// Reads the credentials from `CETESB_USER` and `CETESB_PW`.
    ///
    /// # Errors
    ///
    /// Returns [`QualarError::MissingCredential`] if either variable is unset or empty.
    pub fn from_env() -> Result<Self, QualarError> {
        Ok(Self::new(read_var(LOGIN_ENV)?, read_var(PASSWORD_ENV)?))
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub(crate) fn form(&self) -> LoginForm<'_> {
        LoginForm {
            cetesb_login: &self.login,
            cetesb_password: &self.password,
        }
    }
}

fn read_var(name: &'static str) -> Result<String, QualarError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(QualarError::MissingCredential(name)),
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Form body of the login endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct LoginForm<'a> {
    cetesb_login: &'a str,
    cetesb_password: &'a str,
}
