pub mod durations;
pub mod module;
pub mod presentation;
pub mod state;
