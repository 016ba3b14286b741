mod common;

use common::{committed, memory_context, Setting};
use repokit_core::messaging::LifecycleEvent;
use repokit_core::{
    of_type, EntityKey, ErasedPredicate, KeyedObject, KeyedRepo, KeyedRepository, RepoError,
    RepoResult, WriteHook,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn seeded(values: &[(&str, &str)]) -> KeyedRepository<Setting> {
    let repo = KeyedRepository::new(memory_context::<Setting>());
    committed(&repo, |repo| {
        repo.add(
            values
                .iter()
                .map(|(key, value)| Setting::new(key, value))
                .collect(),
        )
        .unwrap();
    });
    repo
}

#[test]
fn writes_are_invisible_until_commit() {
    let repo = KeyedRepository::new(memory_context::<Setting>());
    let scope = repo.write_context();
    repo.add(vec![Setting::new("theme", "dark")]).unwrap();
    assert!(repo.all().unwrap().is_empty());

    let summary = repo.commit(scope).unwrap();
    assert!(summary.flushed);
    assert_eq!(summary.inserted, vec![1]);
    assert_eq!(repo.all().unwrap().len(), 1);
}

#[test]
fn find_and_find_range_use_surrogate_keys() {
    let repo = seeded(&[("a", "1"), ("b", "2"), ("c", "3")]);

    assert_eq!(repo.find(2).unwrap().unwrap().key, "b");
    assert!(repo.find(99).unwrap().is_none());

    let found = repo.find_range(&[3, 42, 1]).unwrap();
    let keys: Vec<_> = found.iter().map(|setting| setting.key.as_str()).collect();
    assert_eq!(keys, vec!["c", "a"]);
}

#[test]
fn find_any_coerces_integer_keys() {
    let repo = seeded(&[("a", "1"), ("b", "2")]);

    assert_eq!(repo.find_any(&2_i32).unwrap().unwrap().key, "b");
    assert_eq!(repo.find_any(&1_u8).unwrap().unwrap().key, "a");
    assert_eq!(
        repo.find_key(&EntityKey::Surrogate(2)).unwrap().unwrap().key,
        "b"
    );

    let err = repo.find_any(&1.5_f64).unwrap_err();
    assert!(matches!(err, RepoError::TypeMismatch { .. }));
}

#[test]
fn add_or_update_inserts_new_and_updates_persisted() {
    let repo = seeded(&[("a", "1")]);
    let mut existing = repo.find(1).unwrap().unwrap();
    existing.value = "changed".to_string();

    committed(&repo, |repo| {
        repo.add_or_update(vec![existing.clone(), Setting::new("b", "2")])
            .unwrap();
    });

    let all = repo.all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(repo.find(1).unwrap().unwrap().value, "changed");
    assert_eq!(repo.find(2).unwrap().unwrap().key, "b");
}

#[test]
fn add_copy_inserts_a_new_row() {
    let repo = seeded(&[("a", "1")]);
    let source = repo.find(1).unwrap().unwrap();

    committed(&repo, |repo| repo.add_copy(&source).unwrap());

    let all = repo.all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].id(), 2);
    assert_eq!(all[1].key, "a");
    assert_eq!(source.id, 1);
}

#[test]
fn nested_write_contexts_flush_on_last_release() {
    let repo = KeyedRepository::new(memory_context::<Setting>());
    let outer = repo.write_context();
    let inner = repo.write_context();
    repo.add(vec![Setting::new("a", "1")]).unwrap();

    let deferred = repo.commit(inner).unwrap();
    assert!(!deferred.flushed);
    assert!(repo.all().unwrap().is_empty());

    let flushed = repo.commit(outer).unwrap();
    assert!(flushed.flushed);
    assert_eq!(repo.all().unwrap().len(), 1);
}

#[test]
fn cancel_write_discards_pending_rows() {
    let repo = KeyedRepository::new(memory_context::<Setting>());
    let scope = repo.write_context();
    repo.add(vec![Setting::new("a", "1")]).unwrap();
    repo.cancel_write();

    let err = repo.commit(scope).unwrap_err();
    assert!(matches!(err, RepoError::InvalidWrite(_)));
    assert!(repo.all().unwrap().is_empty());
}

#[test]
fn where_erased_checks_the_predicate_type() {
    let repo = seeded(&[("a", "1"), ("b", "2")]);

    let concrete = ErasedPredicate::concrete(|setting: &Setting| setting.value == "2");
    let matched = repo.where_erased(&concrete).unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].key, "b");

    let keyed = ErasedPredicate::keyed(|row: &dyn KeyedObject| row.id() >= 1);
    assert_eq!(repo.where_erased(&keyed).unwrap().len(), 2);

    let foreign = ErasedPredicate::concrete(|_: &String| true);
    let err = repo.where_erased(&foreign).unwrap_err();
    assert!(matches!(err, RepoError::TypeMismatch { .. }));
}

struct Secret(String);

impl TryFrom<Setting> for Secret {
    type Error = ();

    fn try_from(setting: Setting) -> Result<Self, Self::Error> {
        if setting.key.starts_with("secret.") {
            Ok(Secret(setting.value))
        } else {
            Err(())
        }
    }
}

#[test]
fn of_type_narrows_to_convertible_rows() {
    let repo = seeded(&[("secret.token", "abc"), ("theme", "dark")]);
    let secrets: Vec<Secret> = of_type(&repo).unwrap();
    assert_eq!(secrets.len(), 1);
    assert_eq!(secrets[0].0, "abc");
}

#[test]
fn stages_run_before_every_write() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let stage: Arc<dyn WriteHook<Setting>> = Arc::new(
        move |event: LifecycleEvent, setting: &mut Setting| -> RepoResult<()> {
            seen.fetch_add(1, Ordering::SeqCst);
            if event == LifecycleEvent::Creating {
                setting.value = setting.value.trim().to_string();
            }
            Ok(())
        },
    );
    let repo = KeyedRepository::new(memory_context::<Setting>()).with_stage(stage);

    committed(&repo, |repo| {
        repo.add(vec![Setting::new("a", "  padded  ")]).unwrap();
    });
    let stored = repo.find(1).unwrap().unwrap();
    assert_eq!(stored.value, "padded");

    committed(&repo, |repo| repo.delete(vec![stored.clone()]).unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(repo.find(1).unwrap().is_none());
}
