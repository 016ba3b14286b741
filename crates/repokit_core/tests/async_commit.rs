mod common;

use common::{memory_context, Invoice, Setting};
use repokit_core::{AuditableRepository, KeyedRepo, KeyedRepository, RepoError};

#[tokio::test]
async fn commit_async_flushes_pending_writes() {
    let repo = KeyedRepository::new(memory_context::<Setting>());
    let scope = repo.write_context();
    repo.add(vec![Setting::new("a", "1"), Setting::new("b", "2")])
        .unwrap();

    let summary = repo.commit_async(scope).await.unwrap();
    assert!(summary.flushed);
    assert_eq!(summary.inserted, vec![1, 2]);
    assert_eq!(repo.all().unwrap().len(), 2);
}

#[tokio::test]
async fn commit_async_respects_nesting() {
    let repo = AuditableRepository::new(memory_context::<Invoice>());
    let outer = repo.write_context();
    let inner = repo.write_context();
    repo.add(vec![Invoice::new("INV-1", 10)]).unwrap();

    assert!(!repo.commit_async(inner).await.unwrap().flushed);
    assert!(repo.all().unwrap().is_empty());
    assert!(repo.commit_async(outer).await.unwrap().flushed);
    assert_eq!(repo.all().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_writes_fail_async_commit() {
    let repo = KeyedRepository::new(memory_context::<Setting>());
    let scope = repo.write_context();
    repo.add(vec![Setting::new("a", "1")]).unwrap();
    repo.cancel_write();

    let err = repo.commit_async(scope).await.unwrap_err();
    assert!(matches!(err, RepoError::InvalidWrite(_)));
}
