mod common;

use common::{gallery_in, set_mtime, write_image, StubBackend};
use screenshot_gallery::error::AppError;
use screenshot_gallery::services::live::LiveEvent;
use std::fs::{self, File};
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast::error::TryRecvError;

#[tokio::test]
async fn test_ingest_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new();
    let gallery = gallery_in(dir.path(), backend.clone());
    let path = write_image(dir.path(), "elden_game.png");

    let first = gallery.ingest(&path).await.unwrap();
    let second = gallery.ingest(&path).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(backend.calls(), 1);
    assert_eq!(gallery.cache().len(), 1);
}

#[tokio::test]
async fn test_mtime_change_forces_reclassification() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new();
    let gallery = gallery_in(dir.path(), backend.clone());
    let path = write_image(dir.path(), "elden_game.png");

    let first = gallery.ingest(&path).await.unwrap();

    let later = SystemTime::now() + Duration::from_secs(60);
    File::options().write(true).open(&path).unwrap().set_modified(later).unwrap();

    let second = gallery.ingest(&path).await.unwrap();
    assert_eq!(backend.calls(), 2);
    assert_ne!(first.id, second.id);
    assert!(second.date_added > first.date_added);
    assert_eq!(gallery.cache().len(), 2);
}

#[tokio::test]
async fn test_concurrent_ingest_classifies_once() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::slow(Duration::from_millis(100));
    let gallery = gallery_in(dir.path(), backend.clone());
    let path = write_image(dir.path(), "halo_game.png");

    let (a, b) = tokio::join!(gallery.ingest(&path), gallery.ingest(&path));
    assert_eq!(a.unwrap().id, b.unwrap().id);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_missing_file_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new();
    let gallery = gallery_in(dir.path(), backend.clone());

    assert!(gallery.ingest(&dir.path().join("gone.png")).await.is_none());
    assert_eq!(backend.calls(), 0);
    assert!(gallery.cache().is_empty());
}

#[tokio::test]
async fn test_created_game_is_indexed_and_announced() {
    let dir = tempfile::tempdir().unwrap();
    let gallery = gallery_in(dir.path(), StubBackend::new());
    let mut events = gallery.subscribe();

    let path = write_image(dir.path(), "Screenshot_racing_game.png");
    let record = gallery.handle_created(&path).await.unwrap();

    assert_eq!(record.category(), "racing");
    assert_eq!(record.url, "/screenshots/Screenshot_racing_game.png");
    assert_eq!(gallery.len(), 1);
    match events.try_recv().unwrap() {
        LiveEvent::Added(added) => assert_eq!(added.id, record.id),
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_files_stay_out_of_index() {
    let dir = tempfile::tempdir().unwrap();
    let gallery = gallery_in(dir.path(), StubBackend::new());
    let mut events = gallery.subscribe();

    for name in ["anime_wallpaper.png", "code_review.png", "holiday.jpg"] {
        let path = write_image(dir.path(), name);
        assert!(gallery.handle_created(&path).await.is_none());
    }

    assert!(gallery.is_empty());
    assert_eq!(gallery.cache().len(), 3);
    assert_eq!(events.try_recv().unwrap_err(), TryRecvError::Empty);
}

#[tokio::test]
async fn test_deletion_emits_one_removed_event() {
    let dir = tempfile::tempdir().unwrap();
    let gallery = gallery_in(dir.path(), StubBackend::new());
    let path = write_image(dir.path(), "doom_game.png");
    let record = gallery.handle_created(&path).await.unwrap();

    let mut events = gallery.subscribe();
    fs::remove_file(&path).unwrap();

    assert_eq!(gallery.handle_deleted(&path).await, Some(record.id.clone()));
    assert_eq!(gallery.handle_deleted(&path).await, None);

    assert_eq!(events.try_recv().unwrap(), LiveEvent::Removed { id: record.id });
    assert_eq!(events.try_recv().unwrap_err(), TryRecvError::Empty);
    assert!(gallery.list(None).iter().all(|r| r.file_name != "doom_game.png"));
    // Deleting never evicts the classification
    assert_eq!(gallery.cache().len(), 1);
}

#[tokio::test]
async fn test_file_removed_before_indexing_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let gallery = gallery_in(dir.path(), StubBackend::new());
    let path = write_image(dir.path(), "quake_game.png");

    gallery.ingest(&path).await.unwrap();
    fs::remove_file(&path).unwrap();

    assert!(gallery.handle_created(&path).await.is_none());
    assert!(gallery.is_empty());
}

#[tokio::test]
async fn test_rescan_builds_sorted_index() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new();
    let gallery = gallery_in(dir.path(), backend.clone());

    let base = SystemTime::now() - Duration::from_secs(3600);
    for (i, name) in ["a_game.png", "b_game.jpg", "c_racing_game.png"].iter().enumerate() {
        let path = write_image(dir.path(), name);
        let mtime = base + Duration::from_secs(60 * i as u64);
        File::options().write(true).open(&path).unwrap().set_modified(mtime).unwrap();
    }
    write_image(dir.path(), "anime_art.png");
    write_image(dir.path(), "notes.txt");

    let report = gallery.rescan().await.unwrap();
    assert_eq!(report.files, 4);
    assert_eq!(report.accepted, 3);
    assert_eq!(report.rejected_anime, 1);

    let names: Vec<_> = gallery.list(None).into_iter().map(|r| r.file_name).collect();
    assert_eq!(names, vec!["c_racing_game.png", "b_game.jpg", "a_game.png"]);
    assert_eq!(gallery.categories(), vec!["racing".to_string(), "rpg".to_string()]);
    assert_eq!(gallery.list(Some("racing")).len(), 1);

    // A second pass is served entirely from the cache
    gallery.rescan().await.unwrap();
    assert_eq!(backend.calls(), 4);
    assert_eq!(gallery.len(), 3);
}

#[tokio::test]
async fn test_clear_cache_reclassifies_everything() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new();
    let gallery = gallery_in(dir.path(), backend.clone());
    for name in ["one_game.png", "two_game.png", "code_diff.png", "cat.jpg"] {
        write_image(dir.path(), name);
    }

    gallery.rescan().await.unwrap();
    assert_eq!(backend.calls(), 4);

    let mut events = gallery.subscribe();
    let report = gallery.clear_cache().await.unwrap();

    assert_eq!(backend.calls(), 8);
    assert_eq!(report.accepted, 2);
    assert_eq!(gallery.len(), 2);
    assert_eq!(gallery.cache().len(), 4);
    assert_eq!(events.try_recv().unwrap(), LiveEvent::Refresh);
}

#[tokio::test]
async fn test_rescan_while_scanning_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let gallery = gallery_in(dir.path(), StubBackend::slow(Duration::from_millis(200)));
    write_image(dir.path(), "slow_game.png");

    let running = {
        let gallery = gallery.clone();
        tokio::spawn(async move { gallery.rescan().await })
    };
    while !gallery.is_scanning() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(matches!(gallery.rescan().await, Err(AppError::ScanInProgress)));
    assert!(matches!(gallery.clear_cache().await, Err(AppError::ScanInProgress)));

    running.await.unwrap().unwrap();
    assert!(!gallery.is_scanning());
    assert_eq!(gallery.len(), 1);
    gallery.rescan().await.unwrap();
}

#[tokio::test]
async fn test_rescan_of_missing_folder_fails() {
    let dir = tempfile::tempdir().unwrap();
    let gallery = gallery_in(&dir.path().join("nope"), StubBackend::new());

    assert!(matches!(gallery.rescan().await, Err(AppError::WatchedFolderMissing(_))));
    assert!(!gallery.is_scanning());
}

#[tokio::test]
async fn test_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "persist_game.png");

    let first = StubBackend::new();
    gallery_in(dir.path(), first.clone()).rescan().await.unwrap();
    assert_eq!(first.calls(), 1);

    let second = StubBackend::new();
    let gallery = gallery_in(dir.path(), second.clone());
    gallery.cache().load().unwrap();
    gallery.rescan().await.unwrap();
    assert_eq!(second.calls(), 0);
    assert_eq!(gallery.len(), 1);
}

#[tokio::test]
async fn test_file_rewritten_during_classification_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::slow(Duration::from_millis(300));
    let gallery = gallery_in(dir.path(), backend.clone());
    let path = write_image(dir.path(), "still_writing_game.png");

    let writer = {
        let path = path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            fs::write(&path, b"the rest of the png").unwrap();
            set_mtime(&path, SystemTime::now() + Duration::from_secs(30));
        })
    };

    let record = gallery.handle_created(&path).await;
    writer.await.unwrap();

    let record = record.expect("rewritten file should still be indexed");
    assert_eq!(record.file_size, b"the rest of the png".len() as u64);
    assert_eq!(backend.calls(), 2);
    assert_eq!(gallery.len(), 1);
    assert_eq!(gallery.cache().len(), 1);
}

#[tokio::test]
async fn test_file_that_keeps_changing_gives_up() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new();
    backend.set_touching(true);
    let gallery = gallery_in(dir.path(), backend.clone());
    let path = write_image(dir.path(), "busy_game.png");

    assert!(gallery.ingest(&path).await.is_none());
    assert_eq!(backend.calls(), 3);
    assert!(gallery.cache().is_empty());
}

#[tokio::test]
async fn test_touched_file_survives_clear_cache() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::slow(Duration::from_millis(200));
    let gallery = gallery_in(dir.path(), backend.clone());
    let path = write_image(dir.path(), "keep_game.png");
    gallery.rescan().await.unwrap();
    assert_eq!(gallery.len(), 1);

    let toucher = {
        let path = path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            set_mtime(&path, SystemTime::now() + Duration::from_secs(90));
        })
    };
    let report = gallery.clear_cache().await.unwrap();
    toucher.await.unwrap();

    assert_eq!(report.accepted, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(gallery.len(), 1);
}

#[tokio::test]
async fn test_unclassifiable_file_keeps_its_old_record() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StubBackend::new();
    let gallery = gallery_in(dir.path(), backend.clone());
    write_image(dir.path(), "keep_game.png");
    gallery.rescan().await.unwrap();
    let before = gallery.list(None);

    backend.set_touching(true);
    let report = gallery.clear_cache().await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.accepted, 0);
    assert_eq!(gallery.list(None), before);
}

#[tokio::test]
async fn test_repeated_create_announces_once() {
    let dir = tempfile::tempdir().unwrap();
    let gallery = gallery_in(dir.path(), StubBackend::new());
    let path = write_image(dir.path(), "twice_game.png");

    let mut events = gallery.subscribe();
    let first = gallery.handle_created(&path).await.unwrap();
    let second = gallery.handle_created(&path).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(gallery.len(), 1);
    assert!(matches!(events.try_recv().unwrap(), LiveEvent::Added(_)));
    assert_eq!(events.try_recv().unwrap_err(), TryRecvError::Empty);
}
