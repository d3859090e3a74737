//! Aggregate root trait and optimistic-concurrency vocabulary.

/// Aggregate root marker + minimal interface.
///
/// This is intentionally small so domain modules can decide how they model
/// state transitions without bringing in any infrastructure concerns.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Incremented once per successful mutating operation; the store compares
    /// it against the version seen at load time to detect concurrent writers.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation checked when a unit of work flushes
/// aggregate state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The aggregate was created in this scope; no stored record may exist.
    New,
    /// The aggregate was loaded at this exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// `current` is the stored version, or `None` when no record exists.
    pub fn matches(self, current: Option<u64>) -> bool {
        match (self, current) {
            (ExpectedVersion::New, None) => true,
            (ExpectedVersion::Exact(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }
}

impl core::fmt::Display for ExpectedVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ExpectedVersion::New => write!(f, "new"),
            ExpectedVersion::Exact(v) => write!(f, "v{v}"),
        }
    }
}
