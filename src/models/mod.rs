pub mod booking;
pub mod owner;
pub mod payment;
pub mod slot_time;
pub mod turf;

pub use booking::{Booking, BookingStatus, BookingType, PaymentMethod, PaymentStatus, Pricing};
pub use owner::{Customer, Owner, OwnerStanding};
pub use payment::{PaymentEvent, WebhookEnvelope};
pub use turf::{DayTemplate, SlotDefinition, Turf, WeekTemplate};
