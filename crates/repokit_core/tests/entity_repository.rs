mod common;

use common::{committed, memory_context, Tag};
use repokit_core::{
    EntityKey, EntityRepository, IdentifiedRepo, KeyedObject, KeyedRepo, RepoError,
};
use uuid::Uuid;

fn seeded(tags: Vec<Tag>) -> EntityRepository<Tag> {
    let repo = EntityRepository::new(memory_context::<Tag>());
    committed(&repo, |repo| repo.add(tags).unwrap());
    repo
}

#[test]
fn finds_by_guid_and_external_id() {
    let tag = Tag::new("urgent");
    let guid = tag.identity.guid;
    let repo = seeded(vec![Tag::well_known("tag.inbox", "inbox"), tag]);

    assert_eq!(repo.find_by_guid(guid).unwrap().unwrap().label, "urgent");
    assert_eq!(
        repo.find_by_external_id("tag.inbox").unwrap().unwrap().label,
        "inbox"
    );
    assert_eq!(
        repo.find_by_external_id(&guid.to_string())
            .unwrap()
            .unwrap()
            .label,
        "urgent"
    );
    assert!(repo.find_by_guid(Uuid::new_v4()).unwrap().is_none());
    assert!(repo.find_by_external_id("tag.missing").unwrap().is_none());
}

#[test]
fn find_any_dispatches_on_runtime_key_type() {
    let tag = Tag::well_known("tag.inbox", "inbox");
    let guid = tag.identity.guid;
    let repo = seeded(vec![tag]);

    assert_eq!(repo.find_any(&guid).unwrap().unwrap().label, "inbox");
    assert_eq!(
        repo.find_any(&"tag.inbox".to_string())
            .unwrap()
            .unwrap()
            .label,
        "inbox"
    );
    assert_eq!(repo.find_any(&"tag.inbox").unwrap().unwrap().label, "inbox");
    assert_eq!(repo.find_any(&1_i64).unwrap().unwrap().label, "inbox");
    assert!(matches!(
        repo.find_any(&true).unwrap_err(),
        RepoError::TypeMismatch { .. }
    ));
}

#[test]
fn find_entity_falls_back_to_guid_for_unpersisted_items() {
    let tag = Tag::new("draft");
    let repo = seeded(vec![tag.clone()]);
    assert_eq!(tag.id(), 0);

    let found = repo.find_entity(&tag).unwrap().unwrap();
    assert_eq!(found.id, 1);
    assert_eq!(found.identity, tag.identity);

    let stranger = Tag::new("stranger");
    assert!(repo.find_entity(&stranger).unwrap().is_none());

    let refreshed = repo.find_entities(&[tag, stranger, found.clone()]).unwrap();
    assert_eq!(refreshed, vec![found.clone(), found]);
}

#[test]
fn range_lookups_skip_unknown_identities() {
    let first = Tag::well_known("tag.one", "one");
    let second = Tag::well_known("tag.two", "two");
    let guids = [second.identity.guid, Uuid::new_v4(), first.identity.guid];
    let repo = seeded(vec![first, second, Tag::new("three")]);

    let by_guid = repo.find_range_by_guids(&guids).unwrap();
    let labels: Vec<_> = by_guid.iter().map(|tag| tag.label.as_str()).collect();
    assert_eq!(labels, vec!["one", "two"]);

    let by_external = repo
        .find_range_by_external_ids(&["tag.two", "tag.none"])
        .unwrap();
    assert_eq!(by_external.len(), 1);
    assert_eq!(by_external[0].label, "two");
}

#[test]
fn duplicate_identities_resolve_to_the_lowest_key() {
    let original = Tag::well_known("tag.dup", "first");
    let mut twin = Tag::new("second");
    twin.identity = original.identity.clone();
    let repo = seeded(vec![original.clone(), twin]);

    let found = repo
        .find_key(&EntityKey::Guid(original.identity.guid))
        .unwrap()
        .unwrap();
    assert_eq!(found.id, 1);
    assert_eq!(found.label, "first");
}

#[test]
fn shallow_clone_regenerates_identity_and_copies_collections() {
    let repo = EntityRepository::new(memory_context::<Tag>());
    let mut source = Tag::well_known("tag.seed", "seed");
    source.id = 7;
    source.aliases.push("origin".to_string());

    let mut copy = repo.shallow_clone(&source);
    assert_eq!(copy.id, 0);
    assert_ne!(copy.identity.guid, source.identity.guid);
    assert_eq!(copy.identity.external_id, copy.identity.guid.to_string());
    assert_eq!(copy.label, "seed");

    copy.aliases.push("copy-only".to_string());
    assert_eq!(source.aliases, vec!["origin".to_string()]);
}

#[test]
fn add_or_update_copy_stores_an_independent_row() {
    let source = Tag::well_known("tag.base", "base");
    let repo = seeded(vec![source.clone()]);
    let stored = repo.find(1).unwrap().unwrap();

    committed(&repo, |repo| repo.add_or_update_copy(&stored).unwrap());

    let all = repo.all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].identity, source.identity);
    assert_ne!(all[1].identity, source.identity);
}
