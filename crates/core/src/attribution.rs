//! Process attribution cache
//!
//! Maps a pid to a human-readable identity. Lookups go to the OS at most once
//! per pid for the lifetime of the cache; failed lookups are cached as
//! `unknown`/`unknown` so short-lived processes don't trigger retry storms.
//!
//! A pid that is reused by a new process after the original exits keeps the
//! identity of the first process seen. That staleness is accepted.

use crate::error::LookupError;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// Placeholder for identity fields that could not be resolved
pub const UNKNOWN: &str = "unknown";

/// Human-readable identity of a process
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessIdentity {
    /// Process name
    pub name: String,
    /// Owning account
    pub owner: String,
}

impl ProcessIdentity {
    /// Create an identity from resolved parts
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
        }
    }

    /// The sentinel identity for failed lookups
    pub fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN)
    }
}

impl fmt::Display for ProcessIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.owner)
    }
}

/// OS-specific pid -> identity resolution
///
/// Implementations may be slow; the cache never calls them while the
/// aggregator is locked.
pub trait IdentityLookup: Send + Sync {
    /// Resolve name and owner of `pid`
    fn lookup(&self, pid: u32) -> Result<ProcessIdentity, LookupError>;
}

impl<F> IdentityLookup for F
where
    F: Fn(u32) -> Result<ProcessIdentity, LookupError> + Send + Sync,
{
    fn lookup(&self, pid: u32) -> Result<ProcessIdentity, LookupError> {
        self(pid)
    }
}

/// Lazily populated pid -> identity cache
pub struct AttributionCache {
    lookup: Arc<dyn IdentityLookup>,
    identities: DashMap<u32, ProcessIdentity>,
}

impl AttributionCache {
    /// Create an empty cache backed by `lookup`
    pub fn new(lookup: Arc<dyn IdentityLookup>) -> Self {
        Self {
            lookup,
            identities: DashMap::new(),
        }
    }

    /// Resolve a pid, consulting the OS only on the first request
    pub fn resolve(&self, pid: u32) -> ProcessIdentity {
        if let Some(hit) = self.identities.get(&pid) {
            return hit.value().clone();
        }

        // The shard stays locked while resolving so concurrent misses for
        // the same pid don't both hit the OS.
        self.identities
            .entry(pid)
            .or_insert_with(|| self.lookup_or_unknown(pid))
            .value()
            .clone()
    }

    /// Record a process reported by an event source
    ///
    /// The reported name wins over the looked-up one; the owner still comes
    /// from the lookup. Existing entries are never replaced.
    pub fn on_process(&self, pid: u32, name: &str) {
        if self.identities.contains_key(&pid) {
            return;
        }

        self.identities.entry(pid).or_insert_with(|| {
            let owner = match self.lookup.lookup(pid) {
                Ok(identity) => identity.owner,
                Err(_) => UNKNOWN.to_string(),
            };
            let name = if name.trim().is_empty() { UNKNOWN } else { name };
            ProcessIdentity::new(name, owner)
        });
    }

    /// Whether `pid` already has an identity
    pub fn contains(&self, pid: u32) -> bool {
        self.identities.contains_key(&pid)
    }

    /// Number of cached pids
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Whether nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    fn lookup_or_unknown(&self, pid: u32) -> ProcessIdentity {
        match self.lookup.lookup(pid) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::debug!(pid, error = %e, "process lookup failed");
                ProcessIdentity::unknown()
            }
        }
    }
}

impl fmt::Debug for AttributionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributionCache")
            .field("cached", &self.identities.len())
            .finish()
    }
}
