pub mod backend;
pub mod errors;
pub mod render;
pub mod uploads;
