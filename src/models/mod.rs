pub mod booking;
pub mod event;
pub mod user;

pub use booking::{
    decode_confirmation_token, encode_confirmation_token, Booking, BookingStatus,
    ConfirmationPayload, PaymentStatus,
};
pub use event::{DynamicPricing, Event, PricingRule};
pub use user::User;
