pub mod registrations;

pub use registrations::{RegistrationError, RegistrationManager};
