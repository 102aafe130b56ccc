//! Ingest job pipeline
//!
//! One job turns archive bytes into a fully stored fingerprint:
//! fingerprint, cache check, parse, roster build, store, file record. The
//! pipeline runs on a background task, publishes typed messages over a
//! channel, and polls its cancellation token between stages. Cancellation
//! after data lands but before the file record rolls the records back, so
//! a cancelled job leaves no observable side effects.

use crate::{
    base::fingerprint::Fingerprint,
    constants::{MAX_ARCHIVE_BYTES, STORE_VERSION},
    error::{into_indexer_error, ErrorCode, IndexerError},
    parser::{discovery::FileDiscovery, parse_archive_with_progress, ParseWarning},
    roster::build_roster,
    store::{account::AccountStore, file::FileRecord, file::FileStore, IndexerStore},
    utility::now_millis,
};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Upload status surfaced to the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Loading,
    Parsing,
    Storing,
    Indexing,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestProgress {
    pub fraction: f64,
    pub processed_count: u32,
    pub total_count: u32,
}

/// Messages the background pipeline publishes to its owner
#[derive(Debug, Clone)]
pub enum JobMessage {
    Ready,
    Progress(IngestProgress),
    State(JobState),
    Result(Box<IngestOutcome>),
    Error(IndexerError),
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub fingerprint: Fingerprint,
    pub account_count: u32,
    pub warnings: Vec<ParseWarning>,
    pub discovery: FileDiscovery,
}

pub(super) async fn run_pipeline(
    store: Arc<IndexerStore>,
    bytes: Vec<u8>,
    name: String,
    token: CancellationToken,
    messages: mpsc::Sender<JobMessage>,
) -> Result<IngestOutcome, IndexerError> {
    let _ = messages.try_send(JobMessage::Ready);

    let result = pipeline(store, bytes, name, &token, &messages).await;
    let terminal = match &result {
        Ok(outcome) => JobMessage::Result(Box::new(outcome.clone())),
        Err(e) => JobMessage::Error(e.clone()),
    };
    let _ = messages.try_send(terminal);

    result
}

async fn pipeline(
    store: Arc<IndexerStore>,
    bytes: Vec<u8>,
    name: String,
    token: &CancellationToken,
    messages: &mpsc::Sender<JobMessage>,
) -> Result<IngestOutcome, IndexerError> {
    let publish = |message: JobMessage| {
        // coalesce rather than block when the consumer lags
        let _ = messages.try_send(message);
    };

    let started = now_millis();
    let check_cancelled = || {
        if token.is_cancelled() {
            Err(IndexerError::cancelled())
        } else {
            Ok(())
        }
    };

    if bytes.len() as u64 > MAX_ARCHIVE_BYTES {
        return Err(IndexerError::new(
            ErrorCode::FileTooLarge,
            format!("archive is {} bytes, over the limit", bytes.len()),
        ));
    }

    let fingerprint = Fingerprint::digest(&bytes)?;
    debug!("Ingest {name:?} fingerprinted as {fingerprint}");
    check_cancelled()?;

    // cache check: a live file record means the archive is already stored
    if let Some(record) = store.get_file(&fingerprint).map_err(into_indexer_error)? {
        info!("Ingest cache hit for {fingerprint}");
        return Ok(IngestOutcome {
            fingerprint,
            account_count: record.account_count,
            warnings: vec![],
            discovery: FileDiscovery::default(),
        });
    }
    check_cancelled()?;

    publish(JobMessage::State(JobState::Parsing));
    let result = parse_archive_with_progress(&bytes, &mut |processed, total| {
        publish(JobMessage::Progress(IngestProgress {
            fraction: 0.1 + 0.5 * (processed as f64 / total.max(1) as f64),
            processed_count: processed as u32,
            total_count: total as u32,
        }));
        !token.is_cancelled()
    });

    if let Some(fatal) = result.fatal_warning() {
        return Err(IndexerError::new(fatal.code, fatal.message.clone()));
    }

    let roster = build_roster(&result.data);
    let account_count = roster.len() as u32;
    check_cancelled()?;

    publish(JobMessage::State(JobState::Storing));
    publish(JobMessage::Progress(IngestProgress {
        fraction: 0.7,
        processed_count: 0,
        total_count: account_count,
    }));

    store
        .store_all(&fingerprint, &roster)
        .map_err(into_indexer_error)?;

    // cancelled while storing: roll the records back so nothing is observable
    if token.is_cancelled() {
        if let Err(e) = store.clear_fingerprint(&fingerprint) {
            warn!("Failed to roll back cancelled ingest {fingerprint}: {e}");
        }
        return Err(IndexerError::cancelled());
    }

    let now = now_millis();
    store
        .put_file(&FileRecord {
            fingerprint: fingerprint.to_string(),
            name,
            size_bytes: bytes.len() as u64,
            uploaded_at: now,
            account_count,
            last_accessed: now,
            schema_version: STORE_VERSION,
            processing_time_ms: Some(now.saturating_sub(started)),
        })
        .map_err(into_indexer_error)?;

    publish(JobMessage::Progress(IngestProgress {
        fraction: 1.0,
        processed_count: account_count,
        total_count: account_count,
    }));
    info!("Ingest of {fingerprint} complete: {account_count} accounts");

    Ok(IngestOutcome {
        fingerprint,
        account_count,
        warnings: result.warnings,
        discovery: result.discovery,
    })
}
