//! Authenticated portal sessions.
//!
//! A [`Session`] owns one cookie-storing HTTP client. Logging in once stores the
//! portal's session cookie in that client, and every query of a batch is sent
//! through the same session. Sessions are never shared between concurrent tasks.

pub mod credentials;
pub mod error;

use crate::session::credentials::Credentials;
use crate::session::error::PortalError;
use log::{debug, info, warn};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub(crate) const LOGIN_PATH: &str = "/qualar/autenticador";

pub struct Session {
    client: Client,
    base_url: String,
    login: String,
}

impl Session {
    /// Opens a session and submits the login form once.
    ///
    /// Authentication is best-effort. The portal answers a rejected login with an
    /// ordinary page, so only transport failures and non-success HTTP statuses are
    /// reported here. A bad login surfaces later as queries without a result table.
    ///
    /// # Errors
    ///
    /// Returns a [`PortalError`] if the client cannot be built or the login request
    /// fails at the transport level.
    pub async fn authenticate(
        base_url: &str,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Self, PortalError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(PortalError::ClientBuild)?;

        let session = Session {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            login: credentials.login().to_string(),
        };

        let body = session.post_form(LOGIN_PATH, &credentials.form()).await?;
        debug!("Login response for {} was {} bytes", session.login, body.len());
        info!("Opened portal session for {} at {}", session.login, session.base_url);
        Ok(session)
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Posts a url-encoded form to `path` and returns the response body.
    pub(crate) async fn post_form<T: Serialize + ?Sized>(
        &self,
        path: &str,
        form: &T,
    ) -> Result<String, PortalError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .form(form)
            .send()
            .await
            .map_err(|e| PortalError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    PortalError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    PortalError::NetworkRequest(url, e)
                });
            }
        };

        response
            .text()
            .await
            .map_err(|e| PortalError::BodyRead(url, e))
    }

    /// Releases the session. Dropping it has the same effect.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!("Released portal session for {}", self.login);
    }
}
