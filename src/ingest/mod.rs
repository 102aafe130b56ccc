//! Ingest orchestration & the consumer-facing facade
//!
//! [Indexer] owns the store, the filter engine, and at most one live ingest
//! job. Starting a new job cancels the prior one; a cancelled job's state
//! updates become no-ops and cancellation is never surfaced as an error.
//! The background parse + store pipeline runs under a hard deadline; index
//! building continues in the background after success and its failures are
//! only logged.

pub mod job;

pub use job::{IngestOutcome, IngestProgress, JobState};

use crate::{
    base::{account::Account, badge::Badge, fingerprint::Fingerprint},
    constants::{INGEST_DEADLINE_SECS, MAX_INDEX_BYTES, PROGRESS_CHANNEL_CAPACITY},
    error::{into_indexer_error, ErrorCode, IndexerError},
    filter::FilterEngine,
    search::{build_search_indexes, estimated_index_bytes, prefixes_of, trigrams_of},
    store::{
        account::AccountStore, bitset::BitsetStore, column::ColumnKind,
        search::SearchIndexStore, IndexerStore,
    },
    utility::now_millis,
};
use bytesize::ByteSize;
use job::{run_pipeline, JobMessage};
use log::{error, info, warn};
use std::{
    collections::HashMap,
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub name: String,
    pub size_bytes: u64,
    pub uploaded_at: u64,
    pub fingerprint: Fingerprint,
    pub account_count: u32,
}

/// Consumer-visible upload state
#[derive(Debug, Clone, PartialEq)]
pub struct UploadState {
    pub status: JobState,
    pub error: Option<IndexerError>,
    pub file: Option<FileMetadata>,
}

impl Default for UploadState {
    fn default() -> Self {
        Self {
            status: JobState::Idle,
            error: None,
            file: None,
        }
    }
}

struct ActiveJob {
    id: u64,
    token: CancellationToken,
}

pub struct Indexer {
    store: Arc<IndexerStore>,
    engine: tokio::sync::Mutex<FilterEngine>,
    job_seq: AtomicU64,
    active: Arc<Mutex<Option<ActiveJob>>>,
    status: watch::Sender<UploadState>,
}

impl Indexer {
    pub fn new(store: Arc<IndexerStore>) -> Self {
        let (status, _) = watch::channel(UploadState::default());

        Self {
            engine: tokio::sync::Mutex::new(FilterEngine::new(store.clone())),
            store,
            job_seq: AtomicU64::new(0),
            active: Arc::new(Mutex::new(None)),
            status,
        }
    }

    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(Arc::new(IndexerStore::new(path)?)))
    }

    pub fn store(&self) -> &Arc<IndexerStore> {
        &self.store
    }

    /// Watch upload state transitions
    pub fn status(&self) -> watch::Receiver<UploadState> {
        self.status.subscribe()
    }

    /// Cancel the live ingest job, if any
    pub fn cancel(&self) {
        if let Some(job) = self.active.lock().expect("active job lock").as_ref() {
            job.token.cancel();
        }
    }

    pub async fn ingest(
        &self,
        bytes: Vec<u8>,
        name: &str,
    ) -> Result<IngestOutcome, IndexerError> {
        self.ingest_with_progress(bytes, name, None).await
    }

    /// Run an ingest job, optionally forwarding progress events. Starting a
    /// new job cancels the prior one.
    pub async fn ingest_with_progress(
        &self,
        bytes: Vec<u8>,
        name: &str,
        progress: Option<mpsc::Sender<IngestProgress>>,
    ) -> Result<IngestOutcome, IndexerError> {
        let job_id = self.job_seq.fetch_add(1, Ordering::SeqCst);
        let token = CancellationToken::new();

        {
            let mut active = self.active.lock().expect("active job lock");
            if let Some(prev) = active.take() {
                prev.token.cancel();
            }
            *active = Some(ActiveJob {
                id: job_id,
                token: token.clone(),
            });
        }

        self.set_status(job_id, JobState::Loading, None, None);

        let size_bytes = bytes.len() as u64;
        let (messages_tx, mut messages_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        let mut handle = tokio::spawn(run_pipeline(
            self.store.clone(),
            bytes,
            name.to_string(),
            token.clone(),
            messages_tx,
        ));

        let deadline = tokio::time::sleep(Duration::from_secs(INGEST_DEADLINE_SECS));
        tokio::pin!(deadline);

        let outcome = loop {
            tokio::select! {
                Some(message) = messages_rx.recv() => match message {
                    JobMessage::Progress(event) => {
                        if let Some(progress) = &progress {
                            // coalesce when the consumer lags
                            let _ = progress.try_send(event);
                        }
                    }
                    JobMessage::State(state) => self.set_status(job_id, state, None, None),
                    JobMessage::Ready | JobMessage::Result(_) | JobMessage::Error(_) => (),
                },
                result = &mut handle => {
                    break match result {
                        Ok(outcome) => outcome,
                        Err(e) => Err(IndexerError::new(
                            ErrorCode::WorkerCrashed,
                            format!("ingest task failed: {e}"),
                        )),
                    };
                }
                _ = &mut deadline => {
                    token.cancel();
                    handle.abort();
                    break Err(IndexerError::new(
                        ErrorCode::WorkerTimeout,
                        "ingest exceeded its deadline",
                    ));
                }
            }
        };

        match outcome {
            Ok(outcome) => {
                let metadata = FileMetadata {
                    name: name.to_string(),
                    size_bytes,
                    uploaded_at: now_millis(),
                    fingerprint: outcome.fingerprint.clone(),
                    account_count: outcome.account_count,
                };

                self.set_status(job_id, JobState::Indexing, None, Some(metadata.clone()));
                self.spawn_index_build(job_id, outcome.fingerprint.clone(), metadata);
                Ok(outcome)
            }
            Err(e) if e.is_cancelled() => {
                // silent reset, never an error to the consumer
                self.set_status(job_id, JobState::Idle, None, None);
                self.finish_job(job_id);
                Err(e)
            }
            Err(e) => {
                error!("Ingest failed ({}, pipeline): {}", e.code, e.message);
                self.set_status(job_id, JobState::Error, Some(e.clone()), None);
                self.finish_job(job_id);
                Err(e)
            }
        }
    }

    /// Build search indexes off the stored username column, then flip the
    /// job to Success. Skipped when already built or projected oversize;
    /// failures are logged, never fatal.
    fn spawn_index_build(&self, job_id: u64, fingerprint: Fingerprint, metadata: FileMetadata) {
        let store = self.store.clone();
        let status = self.status.clone();
        let is_current = self.current_job_guard(job_id);
        let active = self.active.clone();

        tokio::spawn(async move {
            if let Err(e) = build_indexes_if_needed(&store, &fingerprint).await {
                warn!("Search index build for {fingerprint} failed: {e}");
            }

            if is_current() {
                status.send_modify(|state| {
                    state.status = JobState::Success;
                    state.error = None;
                    state.file = Some(metadata);
                });

                let mut active = active.lock().expect("active job lock");
                if active.as_ref().map(|job| job.id) == Some(job_id) {
                    *active = None;
                }
            }
        });
    }

    /// Canonical positions matching the badge filters & query
    pub async fn filter(
        &self,
        fingerprint: &Fingerprint,
        query: &str,
        badges: &[Badge],
    ) -> Result<Vec<u32>, IndexerError> {
        let mut engine = self.engine.lock().await;
        self.bind_engine(&mut engine, fingerprint).await?;

        engine
            .filter_to_indices(query, badges)
            .await
            .map_err(into_indexer_error)
    }

    /// Hydrate accounts at the given positions, preserving order
    pub async fn hydrate(
        &self,
        fingerprint: &Fingerprint,
        indices: &[u32],
    ) -> Result<Vec<Account>, IndexerError> {
        let mut engine = self.engine.lock().await;
        self.bind_engine(&mut engine, fingerprint).await?;

        engine
            .load_accounts_by_indices(indices)
            .await
            .map_err(into_indexer_error)
    }

    /// Per-badge account counts
    pub fn stats(&self, fingerprint: &Fingerprint) -> Result<HashMap<Badge, u32>, IndexerError> {
        self.store
            .get_badge_stats(fingerprint)
            .map_err(into_indexer_error)
    }

    /// Drop every record for the fingerprint
    pub async fn clear(&self, fingerprint: &Fingerprint) -> Result<(), IndexerError> {
        let mut engine = self.engine.lock().await;
        if engine.fingerprint() == Some(fingerprint) {
            engine.clear();
        }

        self.store
            .clear_fingerprint(fingerprint)
            .map_err(into_indexer_error)
    }

    /// Drop everything
    pub async fn clear_all(&self) -> Result<(), IndexerError> {
        self.engine.lock().await.clear();
        self.store.clear_all().map_err(into_indexer_error)
    }

    async fn bind_engine(
        &self,
        engine: &mut FilterEngine,
        fingerprint: &Fingerprint,
    ) -> Result<(), IndexerError> {
        if engine.fingerprint() != Some(fingerprint) {
            engine
                .init(fingerprint.clone(), None)
                .await
                .map_err(into_indexer_error)?;
        }
        Ok(())
    }

    /// Closure answering "is this job still the active one?", usable from
    /// spawned tasks
    fn current_job_guard(&self, job_id: u64) -> impl Fn() -> bool {
        let active = self.active.clone();
        move || {
            active
                .lock()
                .expect("active job lock")
                .as_ref()
                .map(|job| job.id)
                == Some(job_id)
        }
    }

    fn finish_job(&self, job_id: u64) {
        let mut active = self.active.lock().expect("active job lock");
        if active.as_ref().map(|job| job.id) == Some(job_id) {
            *active = None;
        }
    }

    /// Update upload state iff the job is still the active one
    fn set_status(
        &self,
        job_id: u64,
        state: JobState,
        error: Option<IndexerError>,
        file: Option<FileMetadata>,
    ) {
        let is_current = {
            let active = self.active.lock().expect("active job lock");
            active.as_ref().map(|job| job.id) == Some(job_id)
        };
        if !is_current {
            return;
        }

        self.status.send_modify(|upload| {
            upload.status = state;
            upload.error = error;
            upload.file = file;
        });
    }
}

/// Probe first, estimate second, build last
pub(crate) async fn build_indexes_if_needed(
    store: &Arc<IndexerStore>,
    fingerprint: &Fingerprint,
) -> anyhow::Result<()> {
    if store.has_search_indexes(fingerprint)? {
        return Ok(());
    }

    let Some(column) = store.get_string_column(fingerprint, ColumnKind::Usernames)? else {
        return Ok(());
    };

    let usernames: Vec<(String, u32)> = (0..column.len())
        .filter_map(|i| column.get(i).map(|name| (name.to_string(), i as u32)))
        .collect();

    // upper bound: duplicate keys counted once each
    let key_upper_bound: usize = usernames
        .iter()
        .map(|(name, _)| prefixes_of(name).len() + trigrams_of(name).len())
        .sum();
    let estimate = estimated_index_bytes(key_upper_bound, usernames.len() as u32);

    if estimate > MAX_INDEX_BYTES {
        info!(
            "Skipping search index build for {fingerprint}: projected {}",
            ByteSize(estimate)
        );
        return Ok(());
    }

    build_search_indexes(store, fingerprint, &usernames).await
}

#[cfg(test)]
mod tests {
    use super::{job::run_pipeline, *};
    use crate::store::file::FileStore;
    use std::io::Write;
    use tokio::sync::mpsc;
    use zip::{write::SimpleFileOptions, ZipWriter};

    fn archive() -> Vec<u8> {
        let mut writer = ZipWriter::new(std::io::Cursor::new(vec![]));
        writer
            .start_file("following.json", SimpleFileOptions::default())
            .unwrap();
        writer
            .write_all(
                br#"{"relationships_following": [{"string_list_data": [{"value": "jane", "timestamp": 7}]}]}"#,
            )
            .unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn store() -> (tempfile::TempDir, Arc<IndexerStore>) {
        let dir = tempfile::TempDir::with_prefix("ingest-pipeline-tests").unwrap();
        let store = Arc::new(IndexerStore::new(dir.path()).unwrap());
        (dir, store)
    }

    #[tokio::test]
    async fn test_cancelled_job_leaves_no_side_effects() -> anyhow::Result<()> {
        let (_dir, store) = store();
        let bytes = archive();
        let fingerprint = Fingerprint::digest(&bytes)?;

        let token = CancellationToken::new();
        token.cancel();

        let (messages, _keep_alive) = mpsc::channel(8);
        let err = run_pipeline(store.clone(), bytes, "a.zip".to_string(), token, messages)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(store.get_file(&fingerprint)?.is_none());
        assert!(store.get_accounts_by_range(&fingerprint, 0, 10)?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_pipeline_writes_file_record_last() -> anyhow::Result<()> {
        let (_dir, store) = store();
        let bytes = archive();

        let token = CancellationToken::new();
        let (messages, _keep_alive) = mpsc::channel(8);
        let outcome = run_pipeline(store.clone(), bytes, "a.zip".to_string(), token, messages)
            .await
            .expect("pipeline succeeds");

        // a visible file record implies its companions are readable
        let record = store.get_file(&outcome.fingerprint)?.expect("file record");
        assert_eq!(record.account_count, 1);
        assert!(record.processing_time_ms.is_some());
        assert_eq!(
            store
                .get_accounts_by_range(&outcome.fingerprint, 0, 10)?
                .len(),
            1
        );
        Ok(())
    }
}
