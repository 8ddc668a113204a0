use crate::batch::error::BatchError;
use crate::batch::manifest::{BatchManifest, Resolution};
use crate::batch::report::{BatchFiles, BatchWriter};
use crate::query::builder::QueryKey;
use crate::scrape::table_scraper::{scrape, ScrapeOutcome};
use crate::series::error::SeriesError;
use crate::session::error::PortalError;
use crate::session::Session;
use crate::types::measurement::{measurements_from_rows, Measurement};
use bon::Builder;
use log::{debug, info, warn};
use std::future::Future;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

const EMPTY_REASON: &str = "no data table returned";

/// Opens authenticated sessions for a batch.
///
/// The batch asks for a new session at the start and again after every
/// transport failure.
pub trait SessionFactory {
    fn new_session(&self) -> impl Future<Output = Result<Session, PortalError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct BatchOptions {
    /// Attempts per key, at least 1.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
    /// Pause before every attempt after the first.
    #[builder(default = DEFAULT_RETRY_DELAY)]
    pub retry_delay: Duration,
    /// Keep existing files and skip keys they already record.
    #[builder(default)]
    pub resume: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            resume: false,
        }
    }
}

enum Attempt {
    Data(Vec<Measurement>),
    Empty,
    Transport(PortalError),
    Malformed(SeriesError),
}

/// Scrapes every key with retries, persisting each one as soon as it resolves.
///
/// Keys are handled in order through one session. A key that yields data is a
/// success. Empty results and transport failures are retried up to
/// `max_attempts`, with a fresh session after a transport failure. A table
/// whose values cannot be parsed fails the key at once. No single key can abort
/// the batch.
///
/// # Errors
///
/// Only when the batch files cannot be opened, read or written, or when
/// `max_attempts` is 0.
pub async fn run<F: SessionFactory>(
    factory: &F,
    keys: &[QueryKey],
    save_path: &Path,
    options: BatchOptions,
) -> Result<BatchManifest, BatchError> {
    if options.max_attempts == 0 {
        return Err(BatchError::ZeroAttempts);
    }

    let files = BatchFiles::for_save_path(save_path);
    let recorded = if options.resume {
        files.read_recorded()?
    } else {
        BatchManifest::default()
    };
    let mut writer = BatchWriter::open(&files, options.resume)?;

    info!("Starting batch of {} keys", keys.len());
    let mut manifest = BatchManifest::default();
    let mut session: Option<Session> = None;

    for key in keys {
        if recorded.successes.contains(key) {
            debug!("Skipping {}, already recorded as a success", key);
            manifest.successes.push(*key);
            continue;
        }
        if recorded.failures.contains(key) {
            debug!("Skipping {}, already recorded as a failure", key);
            manifest.failures.push(*key);
            continue;
        }

        let resolution = resolve_key(factory, &mut session, key, &options).await;
        writer.record(key, &resolution).inspect_err(|e| {
            warn!(
                "Stopping batch after {} resolved keys, could not record {}: {}",
                manifest.len(),
                key,
                e
            );
        })?;
        match resolution {
            Resolution::Success { .. } => manifest.successes.push(*key),
            Resolution::Failure { .. } => manifest.failures.push(*key),
        }
    }

    if let Some(session) = session.take() {
        session.close();
    }
    info!(
        "Batch finished: {} succeeded, {} failed",
        manifest.successes.len(),
        manifest.failures.len()
    );
    Ok(manifest)
}

async fn resolve_key<F: SessionFactory>(
    factory: &F,
    session: &mut Option<Session>,
    key: &QueryKey,
    options: &BatchOptions,
) -> Resolution {
    let mut reason = String::from(EMPTY_REASON);

    for attempt in 1..=options.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(options.retry_delay).await;
        }

        match attempt_key(factory, session, key).await {
            Attempt::Data(measurements) => {
                let resolution = Resolution::Success {
                    attempts: attempt,
                    measurements,
                };
                info!("Resolved {} after {} attempt(s)", key, resolution.attempts());
                return resolution;
            }
            Attempt::Empty => {
                debug!("Attempt {}/{} for {} was empty", attempt, options.max_attempts, key);
                reason = String::from(EMPTY_REASON);
            }
            Attempt::Transport(e) => {
                warn!(
                    "Attempt {}/{} for {} failed: {}",
                    attempt, options.max_attempts, key, e
                );
                reason = e.to_string();
            }
            Attempt::Malformed(e) => {
                warn!("Giving up on {}: {}", key, e);
                return Resolution::Failure {
                    attempts: attempt,
                    reason: e.to_string(),
                };
            }
        }
    }

    warn!("Giving up on {} after {} attempts", key, options.max_attempts);
    Resolution::Failure {
        attempts: options.max_attempts,
        reason,
    }
}

/// One try at `key`, reusing the session in `slot` or opening a new one.
///
/// A session that hit a transport failure is closed instead of being put back.
async fn attempt_key<F: SessionFactory>(
    factory: &F,
    slot: &mut Option<Session>,
    key: &QueryKey,
) -> Attempt {
    let session = match slot.take() {
        Some(session) => session,
        None => match factory.new_session().await {
            Ok(session) => session,
            Err(e) => return Attempt::Transport(e),
        },
    };

    match scrape(&session, key).await {
        Ok(ScrapeOutcome::Empty) => {
            *slot = Some(session);
            Attempt::Empty
        }
        Ok(ScrapeOutcome::Data(rows)) => {
            *slot = Some(session);
            match measurements_from_rows(rows) {
                Ok(measurements) => Attempt::Data(measurements),
                Err(e) => Attempt::Malformed(e),
            }
        }
        Err(e) => {
            session.close();
            Attempt::Transport(e)
        }
    }
}
