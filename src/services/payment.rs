//! Payment step, modeled as a black-box outcome draw.
//!
//! The real gateway integration lives outside the core; what the booking
//! flow needs is a single yes/no answer per settlement attempt. The draw
//! is deliberately one-shot: the engine never retries a failed charge.

use crate::config::PaymentConfig;
use crate::error::CoreResult;
use crate::models::Booking;
use async_trait::async_trait;
use rand::Rng;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Attempt to charge for a booking. `Ok(true)` means the payment
    /// completed, `Ok(false)` that it was declined.
    async fn charge(&self, booking: &Booking) -> CoreResult<bool>;
}

/// Probabilistic gateway with a configurable success rate (default 90%).
pub struct RandomGateway {
    success_rate: f64,
}

impl RandomGateway {
    pub fn new(success_rate: f64) -> Self {
        RandomGateway {
            success_rate: success_rate.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &PaymentConfig) -> Self {
        Self::new(config.success_rate)
    }
}

impl Default for RandomGateway {
    fn default() -> Self {
        Self::new(0.9)
    }
}

#[async_trait]
impl PaymentGateway for RandomGateway {
    async fn charge(&self, _booking: &Booking) -> CoreResult<bool> {
        Ok(rand::thread_rng().gen_bool(self.success_rate))
    }
}
