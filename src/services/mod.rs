pub mod admin;
pub mod auth;
pub mod availability;
pub mod reviews;
pub mod scheduling;
pub mod tutors;
