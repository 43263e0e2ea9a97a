//! Error type returned by event subscribers.

/// A subscriber's report that it could not handle an event.
///
/// The bus only logs these; they never reach the publisher.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The subscriber failed for the given reason.
    #[error("subscriber failed: {0}")]
    Subscriber(String),
}
