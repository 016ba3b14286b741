mod common;

use common::{committed, Invoice, Setting, Tag};
use repokit_core::context::ContextBackend;
use repokit_core::{
    build_container, AuditableRepository, AuditedRepo, ContextDescriptor, EntityDescriptor,
    EntityRepository, IdentifiedRepo, KeyedRepo, KeyedRepository, Persistable,
    PersistenceContext, SqliteBackend, StoreContext, TypeCatalog,
};
use std::path::Path;
use std::sync::Arc;

fn sqlite_context<T: Persistable>(path: &Path) -> Arc<dyn PersistenceContext<T>> {
    let backend: Arc<dyn ContextBackend> = Arc::new(SqliteBackend::open(path).unwrap());
    Arc::new(StoreContext::<T>::open(backend).unwrap())
}

#[test]
fn committed_rows_survive_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");

    let tag = Tag::well_known("tag.inbox", "inbox");
    let guid = tag.identity.guid;
    {
        let repo = EntityRepository::new(sqlite_context::<Tag>(&path));
        committed(&repo, |repo| repo.add(vec![tag, Tag::new("later")]).unwrap());
    }

    let reopened = EntityRepository::new(sqlite_context::<Tag>(&path));
    let all = reopened.all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, 1);
    assert_eq!(reopened.find_by_guid(guid).unwrap().unwrap().label, "inbox");
    assert_eq!(
        reopened
            .find_by_external_id("tag.inbox")
            .unwrap()
            .unwrap()
            .id,
        1
    );
}

#[test]
fn uncommitted_writes_never_reach_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    {
        let repo = KeyedRepository::new(sqlite_context::<Setting>(&path));
        let _scope = repo.write_context();
        repo.add(vec![Setting::new("theme", "dark")]).unwrap();
        repo.cancel_write();
    }

    let reopened = KeyedRepository::new(sqlite_context::<Setting>(&path));
    assert!(reopened.all().unwrap().is_empty());
}

#[test]
fn soft_deletes_and_restores_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    {
        let repo = AuditableRepository::new(sqlite_context::<Invoice>(&path));
        committed(&repo, |repo| {
            repo.add(vec![Invoice::new("INV-1", 100), Invoice::new("INV-2", 200)])
                .unwrap()
        });
        let first = repo.find(1).unwrap().unwrap();
        committed(&repo, |repo| repo.delete(vec![first]).unwrap());
    }

    let reopened = AuditableRepository::new(sqlite_context::<Invoice>(&path));
    assert_eq!(reopened.all().unwrap().len(), 1);
    let tombstoned = reopened.find(1).unwrap().unwrap();
    assert!(tombstoned.audit.date_created.is_some());
    assert!(tombstoned.audit.date_deleted.is_some());

    committed(&reopened, |repo| repo.restore(vec![tombstoned]).unwrap());
    let again = AuditableRepository::new(sqlite_context::<Invoice>(&path));
    assert_eq!(again.all().unwrap().len(), 2);
}

#[test]
fn configured_sqlite_context_becomes_canonical() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bound.db");

    let mut catalog = TypeCatalog::with_builtin_generics();
    catalog
        .add_entity(EntityDescriptor::auditable::<Invoice>())
        .unwrap();
    catalog
        .add_context(ContextDescriptor::sqlite(&path).configured())
        .unwrap();

    let (container, report) = build_container(&catalog, None).unwrap();
    assert_eq!(report.context, "SqliteContext");
    assert_eq!(report.generic, vec!["AuditableRepository<Invoice>"]);

    let invoices = container.audited::<Invoice>().unwrap();
    committed(invoices.as_ref(), |repo| {
        repo.add(vec![Invoice::new("INV-7", 700)]).unwrap()
    });

    let direct = AuditableRepository::new(sqlite_context::<Invoice>(&path));
    assert_eq!(direct.all().unwrap()[0].number, "INV-7");
}
