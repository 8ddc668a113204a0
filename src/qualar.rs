//! The main entry point: a configured client for the CETESB Qualar portal.
//!
//! [`Qualar`] holds the credentials and connection settings. It offers a simple
//! retrieval that returns every requested series in memory, and a robust
//! retrieval that retries each query and writes results to disk as it goes.

use crate::batch::manifest::BatchManifest;
use crate::batch::orchestrator::{
    run, BatchOptions, SessionFactory, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY,
};
use crate::error::QualarError;
use crate::query::builder::{build_queries, Ids};
use crate::series::retrieval::{retrieve_keys, Retrieval};
use crate::session::credentials::Credentials;
use crate::session::error::PortalError;
use crate::session::Session;
use crate::utils::{ensure_dir_exists, get_data_dir};
use bon::bon;
use chrono::NaiveDate;
use log::info;
use std::path::PathBuf;
use std::time::Duration;

/// Address of the public Qualar portal.
pub const DEFAULT_BASE_URL: &str = "https://qualar.cetesb.sp.gov.br";
/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// File name robust batches write to inside the save directory.
pub const DEFAULT_SAVE_FILE: &str = "qualar_batch.csv";

/// Client for downloading hourly series from the Qualar portal.
///
/// Every retrieval logs in once and sends all of its queries through that one
/// session. Create an instance with [`Qualar::builder()`], or with
/// [`Qualar::from_env()`] to read the credentials from `CETESB_USER` and
/// `CETESB_PW`.
///
/// # Examples
///
/// ```rust,no_run
/// # use qualar::{Credentials, Qualar, QualarError};
/// # use chrono::NaiveDate;
/// # async fn run() -> Result<(), QualarError> {
/// let client = Qualar::builder()
///     .credentials(Credentials::new("someone@usp.br", "secret"))
///     .build();
///
/// let retrieval = client
///     .retrieve()
///     .start_date(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap())
///     .end_date(NaiveDate::from_ymd_opt(2021, 1, 7).unwrap())
///     .parameters(63u32)
///     .stations(99u32)
///     .call()
///     .await?;
/// println!("{}", retrieval.to_frame()?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Qualar {
    credentials: Credentials,
    base_url: String,
    timeout: Duration,
    save_dir: Option<PathBuf>,
}

#[bon]
impl Qualar {
    /// Creates a client.
    ///
    /// # Arguments
    ///
    /// * `credentials` - Login and password for the portal.
    /// * `base_url` - Optional portal address, defaults to [`DEFAULT_BASE_URL`].
    /// * `timeout` - Optional per-request timeout, defaults to [`DEFAULT_TIMEOUT`].
    /// * `save_dir` - Optional directory for robust batches without an explicit
    ///   save path. Defaults to `qualar_rs` under the user data directory.
    #[builder]
    pub fn new(
        credentials: Credentials,
        #[builder(into)] base_url: Option<String>,
        timeout: Option<Duration>,
        #[builder(into)] save_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            credentials,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
            save_dir,
        }
    }

    /// Creates a client with default settings and credentials read from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`QualarError::MissingCredential`] if `CETESB_USER` or `CETESB_PW`
    /// is unset or empty.
    pub fn from_env() -> Result<Self, QualarError> {
        Ok(Self::builder().credentials(Credentials::from_env()?).build())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Logs in and returns the session, for callers running their own loops.
    ///
    /// # Errors
    ///
    /// Returns [`QualarError::Portal`] if the login request fails at the transport level.
    pub async fn open_session(&self) -> Result<Session, QualarError> {
        Ok(Session::authenticate(&self.base_url, &self.credentials, self.timeout).await?)
    }

    /// Downloads one hourly series per station and parameter pair.
    ///
    /// All queries go through a single session, in station-major order. This
    /// method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `start_date` - First day of the range.
    /// * `end_date` - Last day of the range, inclusive.
    /// * `parameters` - One parameter id or several.
    /// * `stations` - One station id or several.
    /// * `all_dates` - When `true` (the default) each series covers every hour of
    ///   the range, with nulls where the portal had no reading. When `false` it
    ///   only holds the hours the portal returned.
    ///
    /// # Returns
    ///
    /// A [`Retrieval`] holding one table per station and parameter pair.
    ///
    /// # Errors
    ///
    /// Returns [`QualarError::InvalidDateRange`] before any request if `end_date`
    /// is before `start_date`. A transport failure or a table with a value that
    /// is not a number aborts the whole retrieval.
    #[builder]
    pub async fn retrieve(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        #[builder(into)] parameters: Ids,
        #[builder(into)] stations: Ids,
        #[builder(default = true)] all_dates: bool,
    ) -> Result<Retrieval, QualarError> {
        check_range(start_date, end_date)?;
        let keys = build_queries(stations, parameters, start_date, end_date);
        if keys.is_empty() {
            return Ok(Retrieval::default());
        }

        let session = self.open_session().await?;
        let retrieval = retrieve_keys(&session, &keys, all_dates).await;
        session.close();
        retrieval
    }

    /// Downloads station and parameter pairs with retries, writing every result
    /// to disk as soon as it is known.
    ///
    /// Measurements are appended to `save_path`. One row per pair goes to
    /// `<base>_successes.csv` or `<base>_failures.csv` next to it, `<base>` being
    /// `save_path` without its extension. This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `start_date` - First day of the range.
    /// * `end_date` - Last day of the range, inclusive.
    /// * `parameters` - One parameter id or several.
    /// * `stations` - One station id or several.
    /// * `save_path` - Optional data file. Defaults to [`DEFAULT_SAVE_FILE`] in
    ///   the save directory, which is created if needed.
    /// * `max_attempts` - Optional attempts per pair, defaults to 3.
    /// * `retry_delay` - Optional pause between attempts, defaults to one second.
    /// * `resume` - Keep existing files and skip pairs already recorded in them.
    ///
    /// # Returns
    ///
    /// A [`BatchManifest`] listing the pairs that succeeded and those that failed.
    ///
    /// # Errors
    ///
    /// Failing pairs are not errors. Only an invalid date range, an unusable save
    /// location or a failure to write the files is returned as an error.
    #[builder]
    pub async fn retrieve_robust(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        #[builder(into)] parameters: Ids,
        #[builder(into)] stations: Ids,
        #[builder(into)] save_path: Option<PathBuf>,
        max_attempts: Option<u32>,
        retry_delay: Option<Duration>,
        #[builder(default)] resume: bool,
    ) -> Result<BatchManifest, QualarError> {
        check_range(start_date, end_date)?;

        let save_path = match save_path {
            Some(path) => path,
            None => self.default_save_dir()?.join(DEFAULT_SAVE_FILE),
        };
        if let Some(parent) = save_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir_exists(parent)
                .await
                .map_err(|e| QualarError::SaveDirCreation(parent.to_path_buf(), e))?;
        }

        let keys = build_queries(stations, parameters, start_date, end_date);
        let options = BatchOptions {
            max_attempts: max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            retry_delay: retry_delay.unwrap_or(DEFAULT_RETRY_DELAY),
            resume,
        };
        info!("Robust retrieval of {} keys into {}", keys.len(), save_path.display());
        Ok(run(self, &keys, &save_path, options).await?)
    }

    fn default_save_dir(&self) -> Result<PathBuf, QualarError> {
        match &self.save_dir {
            Some(dir) => Ok(dir.clone()),
            None => get_data_dir().map_err(QualarError::SaveDirResolution),
        }
    }
}

impl SessionFactory for Qualar {
    async fn new_session(&self) -> Result<Session, PortalError> {
        Session::authenticate(&self.base_url, &self.credentials, self.timeout).await
    }
}

fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), QualarError> {
    if end < start {
        return Err(QualarError::InvalidDateRange { start, end });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::report::BatchFiles;
    use crate::series::error::SeriesError;
    use crate::series::reconcile::VALUE_COLUMN;
    use crate::test_support::{data_row, mount_login, portal_page};
    use tempfile::TempDir;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const QUERY_ROUTE: &str = "/qualar/exportaDados.do";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn client(server: &MockServer) -> Qualar {
        Qualar::builder()
            .credentials(Credentials::new("user", "secret"))
            .base_url(server.uri())
            .timeout(Duration::from_secs(5))
            .build()
    }

    fn ozone_page() -> String {
        portal_page(&[
            data_row("01/01/2021", "01:00", "12,5"),
            data_row("03/01/2021", "10:00", "30"),
            data_row("07/01/2021", "24:00", "41,2"),
        ])
    }

    #[test]
    fn test_builder_defaults() {
        let client = Qualar::builder()
            .credentials(Credentials::new("user", "secret"))
            .build();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);
        assert!(client.save_dir.is_none());
    }

    #[tokio::test]
    async fn test_retrieve_gap_fills_each_pair() -> Result<(), QualarError> {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path(QUERY_ROUTE))
            .respond_with(ResponseTemplate::new(200).set_body_string(ozone_page()))
            .expect(2)
            .mount(&server)
            .await;

        let retrieval = client(&server)
            .retrieve()
            .start_date(date(2021, 1, 1))
            .end_date(date(2021, 1, 7))
            .parameters(vec![63, 17])
            .stations(99)
            .call()
            .await?;

        assert_eq!(retrieval.len(), 2);
        let ozone = retrieval.get(99, 63).unwrap();
        assert_eq!(ozone.frame.height(), 169);
        assert_eq!(
            ozone.frame.column(VALUE_COLUMN).map_err(SeriesError::from)?.null_count(),
            169 - 3
        );
        assert_eq!(retrieval.to_frame()?.height(), 2 * 169);
        Ok(())
    }

    #[tokio::test]
    async fn test_retrieve_without_gap_filling() -> Result<(), QualarError> {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path(QUERY_ROUTE))
            .and(body_string_contains("parametroVO.nparmt=63"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ozone_page()))
            .mount(&server)
            .await;

        let retrieval = client(&server)
            .retrieve()
            .start_date(date(2021, 1, 1))
            .end_date(date(2021, 1, 7))
            .parameters(63)
            .stations(99)
            .all_dates(false)
            .call()
            .await?;

        assert_eq!(retrieval.get(99, 63).unwrap().frame.height(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_table_gives_all_null_series() -> Result<(), QualarError> {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path(QUERY_ROUTE))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>sem dados</html>"))
            .mount(&server)
            .await;

        let retrieval = client(&server)
            .retrieve()
            .start_date(date(2021, 1, 1))
            .end_date(date(2021, 1, 2))
            .parameters(63)
            .stations(99)
            .call()
            .await?;

        let frame = &retrieval.get(99, 63).unwrap().frame;
        assert_eq!(frame.height(), 49);
        assert_eq!(frame.column(VALUE_COLUMN).map_err(SeriesError::from)?.null_count(), 49);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_value_aborts_retrieve() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path(QUERY_ROUTE))
            .respond_with(ResponseTemplate::new(200).set_body_string(portal_page(&[
                data_row("01/01/2021", "01:00", "1"),
                data_row("01/01/2021", "02:00", "---"),
            ])))
            .mount(&server)
            .await;

        let result = client(&server)
            .retrieve()
            .start_date(date(2021, 1, 1))
            .end_date(date(2021, 1, 2))
            .parameters(63)
            .stations(99)
            .call()
            .await;

        assert!(matches!(
            result,
            Err(QualarError::Series(SeriesError::MalformedValue { .. }))
        ));
    }

    #[tokio::test]
    async fn test_reversed_range_is_rejected_before_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = client(&server)
            .retrieve()
            .start_date(date(2021, 1, 7))
            .end_date(date(2021, 1, 1))
            .parameters(63)
            .stations(99)
            .call()
            .await;

        assert!(matches!(result, Err(QualarError::InvalidDateRange { .. })));
    }

    #[tokio::test]
    async fn test_retrieve_robust_writes_batch_files() -> Result<(), QualarError> {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path(QUERY_ROUTE))
            .and(body_string_contains("parametroVO.nparmt=63"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ozone_page()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(QUERY_ROUTE))
            .and(body_string_contains("parametroVO.nparmt=17"))
            .respond_with(ResponseTemplate::new(200).set_body_string(portal_page(&[])))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let save_path = dir.path().join("nested").join("ozone.csv");

        let manifest = client(&server)
            .retrieve_robust()
            .start_date(date(2021, 1, 1))
            .end_date(date(2021, 1, 7))
            .parameters([63, 17])
            .stations(99)
            .save_path(save_path.clone())
            .max_attempts(2)
            .retry_delay(Duration::ZERO)
            .call()
            .await?;

        assert_eq!(manifest.successes.len(), 1);
        assert_eq!(manifest.successes[0].parameter_id, 63);
        assert_eq!(manifest.failures.len(), 1);
        assert_eq!(manifest.failures[0].parameter_id, 17);

        let files = BatchFiles::for_save_path(&save_path);
        assert!(files.data.is_file());
        assert!(files.successes.is_file());
        assert!(files.failures.is_file());
        Ok(())
    }

    #[tokio::test]
    async fn test_default_save_dir_is_used() -> Result<(), QualarError> {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path(QUERY_ROUTE))
            .respond_with(ResponseTemplate::new(200).set_body_string(ozone_page()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let client = Qualar::builder()
            .credentials(Credentials::new("user", "secret"))
            .base_url(server.uri())
            .save_dir(dir.path().join("batches"))
            .build();

        let manifest = client
            .retrieve_robust()
            .start_date(date(2021, 1, 1))
            .end_date(date(2021, 1, 7))
            .parameters(63)
            .stations(99)
            .call()
            .await?;

        assert_eq!(manifest.successes.len(), 1);
        assert!(dir.path().join("batches").join(DEFAULT_SAVE_FILE).is_file());
        Ok(())
    }
}
