pub mod availability;
pub mod booking;
pub mod review;
pub mod tutor;
pub mod user;

pub use availability::{
    AvailabilitySlot, NormalizedSlot, SlotBatch, SlotInput, SlotPatch, SlotView, TimeOfDay, WeekDay,
};
pub use booking::{Booking, BookingStatus};
pub use review::Review;
pub use tutor::TutorProfile;
pub use user::{PublicUser, Role, User};
