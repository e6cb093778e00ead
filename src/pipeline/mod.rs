//! Pipeline module - counting and construction drivers
pub mod construct;
pub mod count;
