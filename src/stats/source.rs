use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use crate::{
    daemon::storage::{entities::UsageSnapshot, snapshot_storage::SnapshotStorage},
    remote::{
        client::{RemoteApi, RemoteError},
        entities::{DateRange, RemoteTotals},
    },
    utils::time::dates_between,
};

use super::derive::{aggregate, derive_stats, UsageStats};

/// Where stats come from: the local snapshots and, if configured, the remote service.
pub struct StatsSource<S> {
    storage: S,
    remote: Option<Arc<dyn RemoteApi>>,
    remote_timeout: Duration,
}

impl<S: SnapshotStorage> StatsSource<S> {
    pub fn new(storage: S, remote: Option<Arc<dyn RemoteApi>>, remote_timeout: Duration) -> Self {
        Self {
            storage,
            remote,
            remote_timeout,
        }
    }

    /// A remote request never runs longer than `limit`.
    pub fn cap_remote_timeout(&mut self, limit: Duration) {
        self.remote_timeout = self.remote_timeout.min(limit);
    }

    /// Sum of stored snapshots in the range. Days that can't be read are skipped.
    pub async fn load_local(&self, range: DateRange, now: DateTime<Utc>) -> UsageSnapshot {
        let mut snapshots = vec![];
        for date in dates_between(range.start, range.end) {
            match self.storage.load(date).await {
                Ok(Some(v)) => snapshots.push(v),
                Ok(None) => {}
                Err(e) => error!("Skipping unreadable snapshot for {date} {e:?}"),
            }
        }
        aggregate(snapshots, now)
    }

    /// `None` when no remote is configured. Both requests have to succeed within the timeout.
    pub async fn fetch_remote(&self, range: DateRange) -> Option<Result<RemoteTotals, RemoteError>> {
        let api = self.remote.as_ref()?;
        let request = async {
            let (focus, activity) = tokio::join!(api.focus_stats(range), api.activity_stats(range));
            Ok::<_, RemoteError>(RemoteTotals {
                focus: focus?,
                activity: activity?,
            })
        };
        let result = tokio::time::timeout(self.remote_timeout, request)
            .await
            .unwrap_or(Err(RemoteError::Timeout))
            .inspect_err(|e| warn!("Remote stats unavailable, using local data {e}"));
        Some(result)
    }

    pub async fn collect(&self, range: DateRange, now: DateTime<Utc>) -> UsageStats {
        debug!("Collecting stats for {range:?}");
        let (local, remote) = tokio::join!(self.load_local(range, now), self.fetch_remote(range));
        derive_stats(&local, remote, now)
    }
}
