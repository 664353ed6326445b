//!  Storage is organized through [snapshot_storage::SnapshotStorageImpl].
//!  The basic idea is:
//!   - There is a directory with all the snapshots.
//!   - Every UTC day gets its own JSON document named after the date.
//!   - Writes replace the whole document atomically.

pub mod entities;
pub mod snapshot_storage;
