//! End-to-end ingest through the orchestrator facade

mod helpers;

use follow_indexer::{
    base::{badge::Badge, fingerprint::Fingerprint},
    error::ErrorCode,
    ingest::Indexer,
    store::file::FileStore,
};
use helpers::{setup_new_db_dir, trivial_archive, zip_of};
use pretty_assertions::assert_eq;

fn open_indexer(prefix: &str) -> anyhow::Result<(tempfile::TempDir, Indexer)> {
    let dir = setup_new_db_dir(prefix)?;
    let indexer = Indexer::open(dir.path())?;
    Ok((dir, indexer))
}

#[tokio::test]
async fn test_ingest_round_trip() -> anyhow::Result<()> {
    helpers::init_logging();
    let (_dir, indexer) = open_indexer("ingest-round-trip")?;

    let outcome = indexer.ingest(trivial_archive(), "export.zip").await?;
    assert_eq!(outcome.account_count, 3);

    let fp = &outcome.fingerprint;
    let stats = indexer.stats(fp)?;
    assert_eq!(stats[&Badge::Following], 2);
    assert_eq!(stats[&Badge::Followers], 2);
    assert_eq!(stats[&Badge::Mutuals], 1);
    assert_eq!(stats[&Badge::NotFollowingBack], 1);
    assert_eq!(stats[&Badge::NotFollowedBack], 1);

    // canonical order: alice(0), bob(1), carol(2)
    assert_eq!(indexer.filter(fp, "", &[]).await?, vec![0, 1, 2]);
    assert_eq!(indexer.filter(fp, "", &[Badge::Mutuals]).await?, vec![0]);
    assert_eq!(
        indexer.filter(fp, "bo", &[Badge::Followers]).await?,
        vec![1]
    );

    let accounts = indexer.hydrate(fp, &[2, 0]).await?;
    assert_eq!(accounts[0].username.as_str(), "carol");
    assert_eq!(accounts[1].username.as_str(), "alice");

    Ok(())
}

#[tokio::test]
async fn test_reingest_hits_the_cache() -> anyhow::Result<()> {
    let (_dir, indexer) = open_indexer("ingest-cache-hit")?;

    let first = indexer.ingest(trivial_archive(), "export.zip").await?;
    assert!(!first.discovery.files.is_empty());

    // same bytes, same fingerprint, no re-parse
    let second = indexer.ingest(trivial_archive(), "export-again.zip").await?;
    assert_eq!(second.fingerprint, first.fingerprint);
    assert_eq!(second.account_count, 3);
    assert!(second.warnings.is_empty());
    assert!(second.discovery.files.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_ingest_empty_file() -> anyhow::Result<()> {
    let (_dir, indexer) = open_indexer("ingest-empty")?;

    let err = indexer.ingest(vec![], "empty.zip").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::EmptyFile);

    // no records written
    assert!(indexer.store().get_all_files()?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_ingest_not_a_zip() -> anyhow::Result<()> {
    let (_dir, indexer) = open_indexer("ingest-not-zip")?;

    let err = indexer
        .ingest(b"plain text, no archive".to_vec(), "file.txt")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotZip);
    Ok(())
}

#[tokio::test]
async fn test_ingest_surfaces_nonfatal_warnings() -> anyhow::Result<()> {
    let (_dir, indexer) = open_indexer("ingest-warnings")?;

    let bytes = zip_of(&[(
        "connections/followers_and_following/following.json",
        r#"{"relationships_following": [{"string_list_data": [{"value": "solo"}]}]}"#,
    )]);

    let outcome = indexer.ingest(bytes, "partial.zip").await?;
    assert_eq!(outcome.account_count, 1);
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.code == ErrorCode::MissingFollowers));

    Ok(())
}

#[tokio::test]
async fn test_status_reaches_success_with_indexes() -> anyhow::Result<()> {
    let (_dir, indexer) = open_indexer("ingest-status")?;
    let mut status = indexer.status();

    let outcome = indexer.ingest(trivial_archive(), "export.zip").await?;

    // the background index build flips the job to Success
    for _ in 0..200 {
        if status.borrow().status == follow_indexer::ingest::JobState::Success {
            break;
        }
        if status.changed().await.is_err() {
            break;
        }
    }

    let state = status.borrow().clone();
    assert_eq!(state.status, follow_indexer::ingest::JobState::Success);
    let file = state.file.expect("file metadata");
    assert_eq!(file.fingerprint, outcome.fingerprint);
    assert_eq!(file.account_count, 3);

    use follow_indexer::store::search::SearchIndexStore;
    assert!(indexer.store().has_search_indexes(&outcome.fingerprint)?);

    Ok(())
}

#[tokio::test]
async fn test_clear_forgets_fingerprint() -> anyhow::Result<()> {
    let (_dir, indexer) = open_indexer("ingest-clear")?;

    let outcome = indexer.ingest(trivial_archive(), "export.zip").await?;
    let fp = outcome.fingerprint.clone();

    indexer.clear(&fp).await?;
    assert!(indexer.store().get_file(&fp)?.is_none());
    assert!(indexer.stats(&fp)?.is_empty());

    // a fresh ingest of the same bytes re-parses from scratch
    let again = indexer.ingest(trivial_archive(), "export.zip").await?;
    assert_eq!(again.fingerprint, fp);
    assert!(!again.discovery.files.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_clear_all() -> anyhow::Result<()> {
    let (_dir, indexer) = open_indexer("ingest-clear-all")?;

    indexer.ingest(trivial_archive(), "a.zip").await?;
    indexer
        .ingest(
            zip_of(&[(
                "following.json",
                r#"{"relationships_following": [{"string_list_data": [{"value": "zed"}]}]}"#,
            )]),
            "b.zip",
        )
        .await?;

    assert_eq!(indexer.store().get_all_files()?.len(), 2);

    indexer.clear_all().await?;
    assert!(indexer.store().get_all_files()?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_filter_unknown_fingerprint_errors() -> anyhow::Result<()> {
    let (_dir, indexer) = open_indexer("ingest-unknown-fp")?;

    let err = indexer
        .filter(&Fingerprint::from("never-ingested"), "", &[])
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Unknown);

    Ok(())
}
