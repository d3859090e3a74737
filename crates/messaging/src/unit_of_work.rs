//! Unit-of-work contract: one transactional scope per handler invocation.

use thiserror::Error;

use stockline_domain::{Event, ProductRepository, RepositoryError};

/// Transactional scope handed to each handler invocation.
///
/// A scope owns its repositories. Nothing reaches the backing store until
/// [`UnitOfWork::commit`]; dropping the scope without committing discards
/// every pending write, which is what rolls back a failed handler.
///
/// `commit` may be called more than once in a scope. Each commit flushes the
/// state mutated since the previous one and harvests the outbox of every
/// aggregate the repositories have handed out so far.
pub trait UnitOfWork {
    type Products: ProductRepository;

    /// Repository bound to this scope.
    fn products(&mut self) -> &mut Self::Products;

    /// Flush pending aggregate state, then read and clear the outbox of
    /// every seen aggregate. Returns the events harvested by this commit;
    /// the same events also accumulate in the scope for
    /// [`UnitOfWork::take_new_events`].
    fn commit(&mut self) -> Result<Vec<Event>, UnitOfWorkError>;

    /// Explicitly discard pending writes and forget seen aggregates.
    fn rollback(&mut self);

    /// Drain every event harvested by this scope's commits so far. The bus
    /// calls this once after the handler returns to feed its cascade queue.
    fn take_new_events(&mut self) -> Vec<Event>;
}

/// Opens fresh unit-of-work scopes. Shared by reference across dispatches,
/// so implementations hold their backing store behind an `Arc`.
pub trait UnitOfWorkFactory: Send + Sync {
    type Uow: UnitOfWork;

    fn begin(&self) -> Self::Uow;
}

/// Commit-time failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitOfWorkError {
    /// Another scope committed the same aggregate first.
    #[error("optimistic concurrency conflict: {0}")]
    Concurrency(String),

    /// The backing store itself misbehaved.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl UnitOfWorkError {
    pub fn concurrency(msg: impl Into<String>) -> Self {
        Self::Concurrency(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn is_concurrency(&self) -> bool {
        matches!(self, Self::Concurrency(_))
    }
}

impl From<RepositoryError> for UnitOfWorkError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Storage(msg) => Self::Storage(msg),
        }
    }
}
