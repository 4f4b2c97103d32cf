pub mod booking;
pub mod slot;
pub mod staff;

pub use booking::{Booking, BookingStatus, PaymentMethod, ServiceCategory};
pub use slot::ScheduledSlot;
pub use staff::{Staff, StaffRole};
