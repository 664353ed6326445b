use std::future::Future;

use anyhow::Result;

use crate::daemon::collection::usage_event::UsageEvent;

/// Represents an event processor. The daemon uses [UsageProcessor](super::usage::UsageProcessor),
/// tests are free to plug in anything that records events.
pub trait EventProcessor {
    fn process_next(&mut self, message: UsageEvent) -> impl Future<Output = Result<()>>;

    fn finalize(&mut self) -> impl Future<Output = Result<()>>;
}
