pub mod auth;
pub mod route;
