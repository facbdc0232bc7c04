pub mod auth;
pub mod consumption;
