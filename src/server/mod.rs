pub mod errors;
pub mod handlers;
pub mod types;
pub mod views;
