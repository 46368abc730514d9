pub mod progress;
pub mod ranking;
pub mod treatment;
