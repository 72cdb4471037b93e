pub mod auth;
pub mod events;
pub mod health;
pub mod registrations;
pub mod users;

pub use auth::CurrentUser;
pub use health::health_check;
