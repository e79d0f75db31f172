use thiserror::Error;

/// Error taxonomy for the booking core.
///
/// Every failure carries enough structured detail for the caller to render
/// an actionable message without re-querying state. Nothing is retried
/// internally: a lost uniqueness race surfaces as `SeatConflict` and the
/// caller decides whether to try again with a different seat.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("event not found")]
    EventNotFound,

    #[error("booking not found")]
    BookingNotFound,

    #[error("seats already booked: {}", .0.join(", "))]
    SeatConflict(Vec<String>),

    #[error("event is sold out")]
    SoldOut,

    #[error("capacity exceeded: requested {requested}, available {available}")]
    CapacityExceeded { requested: i32, available: i32 },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Store unavailable or otherwise failing. To be retried by the
    /// caller, not swallowed here.
    #[error("store unavailable: {0}")]
    Transient(#[source] anyhow::Error),
}

impl CoreError {
    pub fn transient<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CoreError::Transient(anyhow::Error::new(err))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
