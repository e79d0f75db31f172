pub mod booking;
pub mod notifier;
pub mod payment;

pub use booking::{BookingEngine, SeatAvailability, SeatMap};
pub use notifier::{BookingNotification, LogNotifier, Notifier};
pub use payment::{PaymentGateway, RandomGateway};
