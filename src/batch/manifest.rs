use crate::query::builder::QueryKey;
use crate::types::measurement::Measurement;
use serde::Serialize;

/// Which keys of a batch ended up with data and which did not.
///
/// Every key handed to a batch lands in exactly one of the two lists, in the
/// order it was resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchManifest {
    pub successes: Vec<QueryKey>,
    pub failures: Vec<QueryKey>,
}

impl BatchManifest {
    /// Number of resolved keys.
    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successes.is_empty() && self.failures.is_empty()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.successes.contains(key) || self.failures.contains(key)
    }
}

/// How a single key of a batch was settled.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Resolution {
    Success {
        attempts: u32,
        measurements: Vec<Measurement>,
    },
    Failure {
        attempts: u32,
        reason: String,
    },
}

impl Resolution {
    pub(crate) fn attempts(&self) -> u32 {
        match self {
            Resolution::Success { attempts, .. } | Resolution::Failure { attempts, .. } => *attempts,
        }
    }
}
