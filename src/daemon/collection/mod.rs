pub mod collector;
pub mod usage_event;
pub mod visibility;
