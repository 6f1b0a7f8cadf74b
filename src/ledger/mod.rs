//! Local upload ledger: the persisted, capped, newest-first history of uploads.
//!
//! The whole history is one JSON list stored under [`UPLOADS_KEY`] in a
//! [`KvStore`]. Updates are read-modify-write, so the store is owned by a
//! single worker thread and every [`Ledger`] handle talks to it over a
//! channel. Concurrent `append` calls queue up behind each other instead of
//! overwriting each other's list. Each append runs through
//! [`KvStore::update`], which keeps other processes sharing the same
//! database file out for the duration of the write.

mod store;

pub use store::{KvStore, MemoryStore, SqliteStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument, trace};

use crate::api::{LocalImageRef, SearchId};
use crate::config::DEFAULT_LEDGER_CAPACITY;
use crate::error::{Result, SnapError};

/// Storage key of the serialized upload list.
pub const UPLOADS_KEY: &str = "uploads";

/// Pending commands buffered before `append`/`list_all` callers wait.
const COMMAND_BUFFER: usize = 64;

/// One past upload attempt. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// The local image that was submitted.
    pub uri: LocalImageRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_id: Option<SearchId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub date: DateTime<Utc>,
}

impl LedgerEntry {
    /// Entry dated now.
    pub fn new(uri: LocalImageRef) -> Self {
        Self {
            uri,
            server_path: None,
            search_id: None,
            title: None,
            date: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_server_path(mut self, path: impl Into<String>) -> Self {
        self.server_path = Some(path.into());
        self
    }

    #[must_use]
    pub const fn with_search_id(mut self, id: SearchId) -> Self {
        self.search_id = Some(id);
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub const fn at(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }
}

/// Put `entry` at the front and drop the oldest entries beyond `capacity`.
pub fn prepend_capped(entries: &mut Vec<LedgerEntry>, entry: LedgerEntry, capacity: usize) {
    entries.insert(0, entry);
    entries.truncate(capacity);
}

enum Command {
    Append {
        entry: LedgerEntry,
        reply: oneshot::Sender<Result<usize>>,
    },
    List {
        reply: oneshot::Sender<Result<Vec<LedgerEntry>>>,
    },
}

/// Handle to the ledger worker. Cheap to clone; all clones share one worker.
#[derive(Debug, Clone)]
pub struct Ledger {
    tx: mpsc::Sender<Command>,
    capacity: usize,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Append { entry, .. } => f.debug_struct("Append").field("entry", entry).finish(),
            Self::List { .. } => f.write_str("List"),
        }
    }
}

impl Ledger {
    /// Start a worker owning `store`, keeping at most 200 entries.
    pub fn spawn<S: KvStore>(store: S) -> Result<Self> {
        Self::spawn_with_capacity(store, DEFAULT_LEDGER_CAPACITY)
    }

    /// Start a worker owning `store` with a custom cap (at least 1).
    pub fn spawn_with_capacity<S: KvStore>(store: S, capacity: usize) -> Result<Self> {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let worker = Worker { store, capacity };

        std::thread::Builder::new()
            .name("snapped-ledger".to_string())
            .spawn(move || worker.run(rx))
            .map_err(|e| SnapError::Storage(format!("Failed to start ledger worker: {e}")))?;

        debug!(capacity, "Ledger worker started");
        Ok(Self { tx, capacity })
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Prepend an entry, evicting the oldest beyond capacity.
    ///
    /// Returns the ledger length after the write.
    #[instrument(skip(self, entry), fields(uri = %entry.uri, search_id = ?entry.search_id))]
    pub async fn append(&self, entry: LedgerEntry) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Append { entry, reply }).await?;
        rx.await.map_err(|_| worker_gone())?
    }

    /// All entries, newest first. Reads the store afresh on every call.
    ///
    /// # Errors
    ///
    /// `Storage` if the persisted list cannot be parsed. Corrupt data is
    /// reported, never discarded.
    pub async fn list_all(&self) -> Result<Vec<LedgerEntry>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::List { reply }).await?;
        rx.await.map_err(|_| worker_gone())?
    }

    /// Newest entry, if any.
    pub async fn latest(&self) -> Result<Option<LedgerEntry>> {
        Ok(self.list_all().await?.into_iter().next())
    }

    async fn send(&self, command: Command) -> Result<()> {
        trace!(?command, "Queueing ledger command");
        self.tx.send(command).await.map_err(|_| worker_gone())
    }
}

fn worker_gone() -> SnapError {
    SnapError::Storage("ledger worker stopped".to_string())
}

struct Worker<S> {
    store: S,
    capacity: usize,
}

impl<S: KvStore> Worker<S> {
    fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.blocking_recv() {
            match command {
                Command::Append { entry, reply } => {
                    let _ = reply.send(self.append(entry));
                }
                Command::List { reply } => {
                    let _ = reply.send(self.read());
                }
            }
        }
        debug!("Ledger worker stopped: all handles dropped");
    }

    fn read(&self) -> Result<Vec<LedgerEntry>> {
        match self.store.get(UPLOADS_KEY)? {
            Some(raw) => parse_entries(&raw),
            None => Ok(Vec::new()),
        }
    }

    fn append(&mut self, entry: LedgerEntry) -> Result<usize> {
        let capacity = self.capacity;
        let mut len = 0;
        self.store.update(UPLOADS_KEY, |raw| {
            let mut entries = match raw {
                Some(raw) => parse_entries(&raw)?,
                None => Vec::new(),
            };
            prepend_capped(&mut entries, entry, capacity);
            len = entries.len();
            serde_json::to_string(&entries)
                .map_err(|e| SnapError::Storage(format!("failed to serialize ledger: {e}")))
        })?;

        info!(len, "Ledger entry recorded");
        Ok(len)
    }
}

fn parse_entries(raw: &str) -> Result<Vec<LedgerEntry>> {
    serde_json::from_str(raw).map_err(|e| {
        error!(error = %e, "Upload ledger is corrupt");
        SnapError::Storage(format!("upload ledger is corrupt: {e}"))
    })
}
