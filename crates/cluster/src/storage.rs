//! An LMDB-backed Raft log/vote store (via `heed`, §4.4 step 2: a durable
//! log and stable store that survives process restart) plus a
//! JSON-snapshotted state machine store (§4.4: "Snapshot/restore serialize
//! both maps as JSON"). Snapshots go through `file-store`'s atomic-write
//! primitive rather than the embedded database, since the snapshot is a
//! single whole-state blob rather than an append-only log.

use std::io::Cursor;
use std::ops::RangeBounds;
use std::path::PathBuf;
use std::sync::Arc;

use heed::byteorder::BigEndian;
use heed::types::{SerdeBincode, Unit, U64};
use heed::{Database, Env, EnvOpenOptions};
use openraft::storage::{IOFlushed, LogFlushed, RaftLogReader, RaftLogStorage, RaftSnapshotBuilder, RaftStateMachine};
use openraft::{
    Entry, EntryPayload, LogId, LogState, OptionalSend, RaftSnapshotBuilderExt, Snapshot, SnapshotMeta,
    StorageError, StorageIOError, StoredMembership, Vote,
};
use parking_lot::RwLock;

use crate::state_machine::{Command, CommandResponse};
use crate::types::{ClusterNode, NodeId, TypeConfig};

type LogKey = U64<BigEndian>;
type LogDb = Database<LogKey, SerdeBincode<Entry<TypeConfig>>>;
type VoteDb = Database<Unit, SerdeBincode<Vote<NodeId>>>;

/// Entries live at `{data_dir}/raft-log.lmdb` keyed by big-endian log
/// index; the vote (the "stable store") lives alongside them in the same
/// environment under a separate named database.
#[derive(Clone)]
pub struct LogStore {
    env: Env,
    log_db: LogDb,
    vote_db: VoteDb,
}

impl LogStore {
    pub fn open(data_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = data_dir.into().join("raft-log.lmdb");
        std::fs::create_dir_all(&path)?;
        let env = unsafe { EnvOpenOptions::new().max_dbs(2).map_size(1 << 30).open(&path)? };
        let mut wtxn = env.write_txn()?;
        let log_db: LogDb = env.create_database(&mut wtxn, Some("log"))?;
        let vote_db: VoteDb = env.create_database(&mut wtxn, Some("vote"))?;
        wtxn.commit()?;
        Ok(LogStore { env, log_db, vote_db })
    }
}

fn read_err(e: heed::Error) -> StorageError<NodeId> {
    StorageIOError::read_logs(&e).into()
}

fn write_err(e: heed::Error) -> StorageError<NodeId> {
    StorageIOError::write_logs(&e).into()
}

impl RaftLogReader<TypeConfig> for LogStore {
    async fn try_get_log_entries<RB: RangeBounds<u64> + Clone + OptionalSend>(
        &mut self,
        range: RB,
    ) -> Result<Vec<Entry<TypeConfig>>, StorageError<NodeId>> {
        let rtxn = self.env.read_txn().map_err(read_err)?;
        let mut entries = Vec::new();
        for item in self.log_db.range(&rtxn, &range).map_err(read_err)? {
            let (_, entry) = item.map_err(read_err)?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

impl RaftLogStorage<TypeConfig> for LogStore {
    type LogReader = Self;

    async fn get_log_state(&mut self) -> Result<LogState<TypeConfig>, StorageError<NodeId>> {
        let rtxn = self.env.read_txn().map_err(read_err)?;
        let last = self.log_db.last(&rtxn).map_err(read_err)?.map(|(_, e)| e.log_id);
        Ok(LogState { last_purged_log_id: None, last_log_id: last })
    }

    async fn save_vote(&mut self, vote: &Vote<NodeId>) -> Result<(), StorageError<NodeId>> {
        let mut wtxn = self.env.write_txn().map_err(|e| StorageIOError::write_vote(&e))?;
        self.vote_db.put(&mut wtxn, &(), vote).map_err(|e| StorageIOError::write_vote(&e))?;
        wtxn.commit().map_err(|e| StorageIOError::write_vote(&e))?;
        Ok(())
    }

    async fn read_vote(&mut self) -> Result<Option<Vote<NodeId>>, StorageError<NodeId>> {
        let rtxn = self.env.read_txn().map_err(|e| StorageIOError::read_vote(&e))?;
        self.vote_db.get(&rtxn, &()).map_err(|e| StorageIOError::read_vote(&e).into())
    }

    async fn append<I>(&mut self, entries: I, callback: LogFlushed<TypeConfig>) -> Result<(), StorageError<NodeId>>
    where
        I: IntoIterator<Item = Entry<TypeConfig>> + OptionalSend,
    {
        let mut wtxn = self.env.write_txn().map_err(write_err)?;
        for entry in entries {
            self.log_db.put(&mut wtxn, &entry.log_id.index, &entry).map_err(write_err)?;
        }
        wtxn.commit().map_err(write_err)?;
        callback.log_io_completed(Ok(()));
        Ok(())
    }

    async fn truncate(&mut self, log_id: LogId<NodeId>) -> Result<(), StorageError<NodeId>> {
        let mut wtxn = self.env.write_txn().map_err(write_err)?;
        self.log_db.delete_range(&mut wtxn, &(log_id.index..)).map_err(write_err)?;
        wtxn.commit().map_err(write_err)?;
        Ok(())
    }

    async fn purge(&mut self, log_id: LogId<NodeId>) -> Result<(), StorageError<NodeId>> {
        let mut wtxn = self.env.write_txn().map_err(write_err)?;
        self.log_db.delete_range(&mut wtxn, &(..=log_id.index)).map_err(write_err)?;
        wtxn.commit().map_err(write_err)?;
        Ok(())
    }

    async fn get_log_reader(&mut self) -> Self::LogReader {
        self.clone()
    }
}

/// Wraps [`crate::state_machine::ClusterStateMachine`] behind the
/// `RaftStateMachine` trait, persisting snapshots to `{data_dir}/snapshot.json`
/// via `file-store`'s atomic rename (§4.4).
pub struct StateMachineStore {
    pub state_machine: RwLock<crate::state_machine::ClusterStateMachine>,
    last_applied: RwLock<Option<LogId<NodeId>>>,
    last_membership: RwLock<StoredMembership<NodeId, ClusterNode>>,
    snapshot_path: PathBuf,
}

impl StateMachineStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let snapshot_path = data_dir.join("snapshot.json");
        let state_machine = std::fs::read(&snapshot_path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();
        StateMachineStore {
            state_machine: RwLock::new(state_machine),
            last_applied: RwLock::new(None),
            last_membership: RwLock::new(StoredMembership::default()),
            snapshot_path,
        }
    }

    fn persist_snapshot(&self) -> Result<(), StorageError<NodeId>> {
        let bytes = {
            let sm = self.state_machine.read();
            serde_json::to_vec_pretty(&*sm).map_err(|e| StorageIOError::write_snapshot(None, &e))?
        };
        file_store::atomic_write(&self.snapshot_path, &bytes)
            .map_err(|e| StorageIOError::write_snapshot(None, &e))?;
        Ok(())
    }
}

impl RaftSnapshotBuilder<TypeConfig> for Arc<StateMachineStore> {
    async fn build_snapshot(&mut self) -> Result<Snapshot<TypeConfig>, StorageError<NodeId>> {
        let data = {
            let sm = self.state_machine.read();
            serde_json::to_vec(&*sm).map_err(|e| StorageIOError::read_state_machine(&e))?
        };
        let last_applied = *self.last_applied.read();
        let last_membership = self.last_membership.read().clone();
        let meta = SnapshotMeta {
            last_log_id: last_applied,
            last_membership,
            snapshot_id: format!("snap-{}", last_applied.map(|l| l.index).unwrap_or(0)),
        };
        Ok(Snapshot { meta, snapshot: Box::new(Cursor::new(data)) })
    }
}

impl RaftStateMachine<TypeConfig> for Arc<StateMachineStore> {
    type SnapshotBuilder = Self;

    async fn applied_state(
        &mut self,
    ) -> Result<(Option<LogId<NodeId>>, StoredMembership<NodeId, ClusterNode>), StorageError<NodeId>> {
        Ok((*self.last_applied.read(), self.last_membership.read().clone()))
    }

    async fn apply<I>(&mut self, entries: I) -> Result<Vec<CommandResponse>, StorageError<NodeId>>
    where
        I: IntoIterator<Item = Entry<TypeConfig>> + OptionalSend,
    {
        let mut responses = Vec::new();
        for entry in entries {
            *self.last_applied.write() = Some(entry.log_id);
            let response = match entry.payload {
                EntryPayload::Blank => CommandResponse::default(),
                EntryPayload::Normal(cmd) => self.state_machine.write().apply(cmd),
                EntryPayload::Membership(membership) => {
                    *self.last_membership.write() = StoredMembership::new(Some(entry.log_id), membership);
                    CommandResponse::default()
                }
            };
            responses.push(response);
        }
        let _ = self.persist_snapshot();
        Ok(responses)
    }

    async fn get_snapshot_builder(&mut self) -> Self::SnapshotBuilder {
        self.clone()
    }

    async fn begin_receiving_snapshot(
        &mut self,
    ) -> Result<Box<Cursor<Vec<u8>>>, StorageError<NodeId>> {
        Ok(Box::new(Cursor::new(Vec::new())))
    }

    async fn install_snapshot(
        &mut self,
        meta: &SnapshotMeta<NodeId, ClusterNode>,
        snapshot: Box<Cursor<Vec<u8>>>,
    ) -> Result<(), StorageError<NodeId>> {
        let restored = crate::state_machine::ClusterStateMachine::restore(
            serde_json::from_slice(snapshot.get_ref()).map_err(|e| StorageIOError::read_snapshot(None, &e))?,
        )
        .map_err(|e| StorageIOError::read_snapshot(None, &e))?;
        *self.state_machine.write() = restored;
        *self.last_applied.write() = meta.last_log_id;
        *self.last_membership.write() = meta.last_membership.clone();
        self.persist_snapshot()?;
        Ok(())
    }

    async fn get_current_snapshot(&mut self) -> Result<Option<Snapshot<TypeConfig>>, StorageError<NodeId>> {
        Ok(Some(self.build_snapshot().await?))
    }
}
