use anyhow::Result;
use module::EventProcessor;
use tokio::sync::mpsc::Receiver;
use tracing::{error, trace};

use super::collection::usage_event::UsageEvent;

pub mod module;
pub mod usage;

/// Receives usage events and hands them to a processor one at a time, in order.
pub struct ProcessingModule<Processor> {
    receiver: Receiver<UsageEvent>,
    processor: Processor,
}

impl<P: EventProcessor> ProcessingModule<P> {
    pub fn new(receiver: Receiver<UsageEvent>, processor: P) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(event) = self.receiver.recv().await {
            trace!("Processing event {:?}", event);
            if let Err(e) = self.processor.process_next(event.clone()).await {
                error!("Error processing event {:?}: {e:?}", event)
            }
        }

        let result = self.processor.finalize().await;
        self.receiver.close();
        result
    }
}
