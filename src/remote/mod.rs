//! Best effort client for the stats/logging service. Nothing in here is allowed to take the daemon
//! down: every failure ends up as a [RemoteError](client::RemoteError) that callers log and move on.

pub mod client;
pub mod entities;
pub mod session;
