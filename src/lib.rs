//! Focus and distraction estimation with a Pomodoro session timer.
//! A small daemon counts foreground time and switches, a CLI reads the numbers back and asks for
//! feedback. Works offline, a remote stats service and a generative model are optional.

pub mod cli;
pub mod daemon;
pub mod fs;
pub mod insights;
pub mod remote;
pub mod stats;
pub mod timer;
pub mod tracking;
pub mod utils;
