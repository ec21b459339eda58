//! Endpoint handlers organized by domain

pub mod auth;
pub mod connections;
pub mod health;
pub mod links;
pub mod option_profiles;
pub mod profiles;
pub mod qr;
pub mod users;
