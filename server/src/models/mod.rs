pub mod event;
pub mod filter;
pub mod registration;
pub mod user;

pub use event::{Event, EventChanges, EventRecord, EventView, NewEvent};
pub use filter::EventFilter;
pub use registration::{PaymentStatus, Registration, RegistrationStatus};
pub use user::{NewUser, ProfileChanges, User};
