//! Document versions
//!
//! A [`Version`] is `(edit_count, tiebreaker)`. Versions are totally ordered:
//! the higher edit count wins, and on equal edit counts the higher tiebreaker
//! wins. Replicas converge because every peer picks the same maximum.

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::FormatError;

const VERSION_SEPARATOR: char = '+';

/// Revision identifier of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    edit_count: u64,
    tiebreaker: u64,
}

impl Version {
    /// Create a version from its parts
    pub fn new(edit_count: u64, tiebreaker: u64) -> Self {
        Self {
            edit_count,
            tiebreaker,
        }
    }

    /// Number of mutations this document has seen, starting at 1
    pub fn edit_count(&self) -> u64 {
        self.edit_count
    }

    /// Value breaking ties between versions with equal edit counts
    pub fn tiebreaker(&self) -> u64 {
        self.tiebreaker
    }

    /// Parse the `"<edit_count>+<tiebreaker>"` form
    pub fn parse(input: &str) -> Result<Self, FormatError> {
        let invalid = || FormatError::InvalidVersion(input.to_string());

        let (edit_count, tiebreaker) = input.split_once(VERSION_SEPARATOR).ok_or_else(invalid)?;
        if !is_decimal(edit_count) || !is_decimal(tiebreaker) {
            return Err(invalid());
        }

        let edit_count: u64 = edit_count.parse().map_err(|_| invalid())?;
        let tiebreaker: u64 = tiebreaker.parse().map_err(|_| invalid())?;
        if edit_count == 0 {
            return Err(invalid());
        }

        Ok(Self::new(edit_count, tiebreaker))
    }
}

fn is_decimal(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.edit_count
            .cmp(&other.edit_count)
            .then_with(|| self.tiebreaker.cmp(&other.tiebreaker))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.edit_count, VERSION_SEPARATOR, self.tiebreaker)
    }
}

impl FromStr for Version {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Source of tiebreaker values
pub type TiebreakerGenerator = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Creates initial and successor versions
#[derive(Clone)]
pub struct VersionFactory {
    tiebreaker: TiebreakerGenerator,
}

impl Default for VersionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VersionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionFactory").finish_non_exhaustive()
    }
}

impl VersionFactory {
    /// Create a factory whose tiebreakers come from the wall clock (nanoseconds)
    pub fn new() -> Self {
        Self::with_generator(Arc::new(wall_clock_nanos))
    }

    /// Create a factory with a custom tiebreaker source
    pub fn with_generator(tiebreaker: TiebreakerGenerator) -> Self {
        Self { tiebreaker }
    }

    /// Version of a newly created document
    pub fn create(&self) -> Version {
        Version::new(1, (self.tiebreaker)())
    }

    /// Successor of `prior`, one edit further along
    pub fn create_from(&self, prior: &Version) -> Version {
        Version::new(prior.edit_count.saturating_add(1), (self.tiebreaker)())
    }
}

fn wall_clock_nanos() -> u64 {
    let now = chrono::Utc::now();
    now.timestamp_nanos_opt()
        .map(|nanos| nanos as u64)
        .unwrap_or_else(|| now.timestamp_micros() as u64)
}
