//! Concurrency tests for SkyVault.
//!
//! Concurrent saves of overlapping paths must converge on one folder per
//! name, and the sweeper must not disturb live nodes while requests run.

use std::time::Duration;

use skyvault::{Database, FileMetadataRepository, MetadataService, NodeRepository, SaveRequest};
use tempfile::TempDir;

/// File-backed database so that tasks really use separate connections.
async fn setup_service() -> (TempDir, MetadataService) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path().join("skyvault.db"))
        .await
        .unwrap();
    let service = MetadataService::new(db).await.unwrap();
    (temp_dir, service)
}

/// Many tasks creating the same new folder chain.
#[tokio::test]
async fn test_concurrent_folder_creation() {
    let (_temp_dir, service) = setup_service().await;

    const NUM_TASKS: usize = 10;

    let mut handles = Vec::new();
    for _ in 0..NUM_TASKS {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.save(&SaveRequest::folder("shared/deep/path")).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }

    ids.dedup();
    assert_eq!(ids.len(), 1, "all tasks should resolve to the same folder");

    // root + shared + deep + path
    let count = NodeRepository::count(service.database().pool()).await.unwrap();
    assert_eq!(count, 4);

    let duplicates: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM (SELECT parent_id, name FROM nodes GROUP BY parent_id, name HAVING COUNT(*) > 1)",
    )
    .fetch_one(service.database().pool())
    .await
    .unwrap();
    assert_eq!(duplicates, 0);
}

/// Overlapping paths that share a prefix.
#[tokio::test]
async fn test_concurrent_overlapping_paths() {
    let (_temp_dir, service) = setup_service().await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let path = format!("projects/2024/team{}", i % 4);
            service.save(&SaveRequest::folder(path)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // root + projects + 2024 + team0..team3
    let count = NodeRepository::count(service.database().pool()).await.unwrap();
    assert_eq!(count, 7);
}

/// Parallel file saves into separate folders all commit.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_file_saves() {
    let (_temp_dir, service) = setup_service().await;

    const NUM_TASKS: usize = 8;
    const FILES_PER_TASK: usize = 25;

    let mut handles = Vec::new();
    for i in 0..NUM_TASKS {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            for j in 0..FILES_PER_TASK {
                service
                    .save(&SaveRequest::file(
                        format!("d{i}"),
                        format!("f{j}.bin"),
                        1,
                        vec![format!("h{i}x{j}")],
                    ))
                    .await?;
            }
            Ok::<_, skyvault::SkyvaultError>(())
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let pool = service.database().pool();
    let files = FileMetadataRepository::count(pool).await.unwrap();
    assert_eq!(files, (NUM_TASKS * FILES_PER_TASK) as i64);
    // root + d0..d7 + files
    let count = NodeRepository::count(pool).await.unwrap();
    assert_eq!(count, 1 + NUM_TASKS as i64 + files);
}

/// Parallel subtree deletes of unrelated folders all commit.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_subtree_deletes() {
    let (_temp_dir, service) = setup_service().await;

    const NUM_SUBTREES: usize = 40;

    let mut roots = Vec::new();
    for i in 0..NUM_SUBTREES {
        service
            .save(&SaveRequest::file(
                format!("x{i}/inner"),
                "leaf.txt",
                1,
                vec![format!("h{i}")],
            ))
            .await
            .unwrap();
        let id = service.resolver().resolve(&format!("x{i}")).await.unwrap();
        roots.push(id.folder_id);
    }

    let mut handles = Vec::new();
    for chunk in roots.chunks(NUM_SUBTREES / 8) {
        let service = service.clone();
        let ids = chunk.to_vec();
        handles.push(tokio::spawn(async move {
            let mut deleted = 0;
            for id in ids {
                deleted += service.delete(id).await?.nodes_deleted;
            }
            Ok::<_, skyvault::SkyvaultError>(deleted)
        }));
    }

    let mut deleted = 0;
    for handle in handles {
        deleted += handle.await.unwrap().unwrap();
    }

    // x{i}, inner and leaf.txt per subtree
    assert_eq!(deleted, (NUM_SUBTREES * 3) as u64);
    let pool = service.database().pool();
    assert_eq!(NodeRepository::count(pool).await.unwrap(), 1);
    assert_eq!(FileMetadataRepository::count(pool).await.unwrap(), 0);
}

/// Saves and deletes on different parts of the tree interleave cleanly.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_saves_and_deletes() {
    let (_temp_dir, service) = setup_service().await;

    let mut doomed = Vec::new();
    for i in 0..10 {
        doomed.push(
            service
                .save(&SaveRequest::folder(format!("old/{i}")))
                .await
                .unwrap(),
        );
    }

    let saver = {
        let service = service.clone();
        tokio::spawn(async move {
            for j in 0..30 {
                service
                    .save(&SaveRequest::file("new", format!("n{j}.txt"), 1, vec![format!("n{j}")]))
                    .await?;
            }
            Ok::<_, skyvault::SkyvaultError>(())
        })
    };
    let deleter = {
        let service = service.clone();
        tokio::spawn(async move {
            for id in doomed {
                service.delete(id).await?;
            }
            Ok::<_, skyvault::SkyvaultError>(())
        })
    };

    saver.await.unwrap().unwrap();
    deleter.await.unwrap().unwrap();

    let pool = service.database().pool();
    assert_eq!(FileMetadataRepository::count(pool).await.unwrap(), 30);
    // root + old + new + 30 files
    assert_eq!(NodeRepository::count(pool).await.unwrap(), 33);
}

/// A running sweeper leaves a consistent tree alone.
#[tokio::test]
async fn test_sweeper_runs_alongside_saves() {
    let (_temp_dir, service) = setup_service().await;
    let handle = service.sweeper(Duration::from_millis(10)).unwrap().start();

    for i in 0..20 {
        service
            .save(&SaveRequest::file(
                format!("batch/{}", i % 3),
                format!("file{i}.dat"),
                1,
                vec![format!("h{i}")],
            ))
            .await
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.stop().await;

    // root + batch + 3 folders + 20 files
    let count = NodeRepository::count(service.database().pool()).await.unwrap();
    assert_eq!(count, 25);
}
