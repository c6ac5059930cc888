mod common;

use common::{Menu, menu};
use nexus_repo::repo::{self, get_all, get_one};
use nexus_repo::types::FieldValues;
use nexus_repo::{Context, DocumentStore, ErrorKind, MemoryStore, Repository, StoreError};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_create_assigns_id_when_empty() {
    let store = MemoryStore::new();
    let ctx = Context::background();
    let mut m = menu("", 5);
    let id = repo::create(&store, &ctx, &mut m).unwrap();
    assert!(!id.is_empty());
    assert_eq!(m.base.id, id);
}

#[test]
fn test_create_uses_given_id_and_rejects_duplicates() {
    let store = MemoryStore::new();
    let ctx = Context::background();
    let mut m = menu("soup", 5);
    assert_eq!(repo::create(&store, &ctx, &mut m).unwrap(), "soup");
    let err = repo::create(&store, &ctx, &mut menu("soup", 6)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Store);
    assert!(matches!(err.store_error(), Some(StoreError::AlreadyExists(_))));
}

#[test]
fn test_create_then_get_one_round_trip() {
    let store = MemoryStore::new();
    let ctx = Context::background();
    let mut m = menu("", 12);
    m.tags = vec!["hot".into(), "vegan".into()];
    let id = repo::create(&store, &ctx, &mut m).unwrap();
    let mut got = Menu::default();
    get_one(&store, &ctx, &id, &mut got).unwrap();
    assert_eq!(got, m);
    assert!(got.base.active);
}

#[test]
fn test_get_one_missing_is_not_found() {
    let store = MemoryStore::new();
    let ctx = Context::background();
    let mut got = Menu::default();
    let err = get_one(&store, &ctx, "nope", &mut got).unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("nope"));
}

#[test]
fn test_update_changes_only_given_fields() {
    let store = MemoryStore::new();
    let ctx = Context::background();
    let mut m = menu("m1", 10);
    repo::create(&store, &ctx, &mut m).unwrap();
    let fv = FieldValues::from([
        ("price".to_string(), bson::Bson::Int64(11)),
        ("extra.note".to_string(), "spicy".into()),
    ]);
    repo::update(&store, &ctx, "menus", "m1", &fv).unwrap();

    let col = store.collection("menus").unwrap();
    let data = store.get(&ctx, &col.doc("m1")).unwrap().into_data().unwrap();
    assert_eq!(data.get_i64("price").unwrap(), 11);
    assert_eq!(data.get_document("extra").unwrap().get_str("note").unwrap(), "spicy");
    assert_eq!(data.get_str("name").unwrap(), m.name);
    assert!(data.get_bool("active").unwrap());
}

#[test]
fn test_update_missing_document_is_not_found() {
    let store = MemoryStore::new();
    let ctx = Context::background();
    let fv = FieldValues::from([("price".to_string(), 1.into())]);
    assert!(repo::update(&store, &ctx, "menus", "ghost", &fv).unwrap_err().is_not_found());
}

#[test]
fn test_update_unresolvable_collection() {
    let store = MemoryStore::with_options(nexus_repo::config::StoreOptions {
        auto_create_collections: false,
        ..Default::default()
    });
    let ctx = Context::background();
    let fv = FieldValues::new();
    let err = repo::update(&store, &ctx, "menus", "m1", &fv).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoParentCollection);
}

#[test]
fn test_delete_and_soft_delete() {
    let store = MemoryStore::new();
    let ctx = Context::background();
    repo::create(&store, &ctx, &mut menu("a", 1)).unwrap();
    repo::create(&store, &ctx, &mut menu("b", 2)).unwrap();

    repo::soft_delete(&store, &ctx, "menus", "a").unwrap();
    let mut a = Menu::default();
    get_one(&store, &ctx, "a", &mut a).unwrap();
    assert!(!a.base.active);

    repo::delete(&store, &ctx, "menus", "b").unwrap();
    repo::delete(&store, &ctx, "menus", "b").unwrap();
    assert!(get_one(&store, &ctx, "b", &mut Menu::default()).unwrap_err().is_not_found());
    assert!(repo::soft_delete(&store, &ctx, "menus", "b").unwrap_err().is_not_found());
}

#[test]
fn test_get_all_is_not_capped_at_query_limit() {
    let n = nexus_repo::store::MAX_LIMIT as i64 + 5;
    let store = common::seeded_menus(n);
    let ctx = Context::background();
    let all: Vec<Menu> = get_all(&store, &ctx).unwrap();
    assert_eq!(all.len() as i64, n);
    let col = store.collection("menus").unwrap();
    let q = nexus_repo::store::Query::new(&col);
    assert_eq!(store.count(&ctx, &q).unwrap(), all.len());
}

#[test]
fn test_get_all_natural_order() {
    let store = common::seeded_menus(4);
    let ctx = Context::background();
    let all: Vec<Menu> = get_all(&store, &ctx).unwrap();
    assert_eq!(common::ids(&all), vec!["m0", "m1", "m2", "m3"]);
}

#[test]
fn test_cancelled_context_fails_calls() {
    let store = MemoryStore::new();
    let ctx = Context::background();
    ctx.cancel();
    let err = repo::create(&store, &ctx, &mut menu("x", 1)).unwrap_err();
    assert!(matches!(err.store_error(), Some(StoreError::Cancelled)));

    let expired = Context::with_timeout(Duration::from_millis(0));
    std::thread::sleep(Duration::from_millis(2));
    let err = repo::create(&store, &expired, &mut menu("y", 1)).unwrap_err();
    assert!(matches!(err.store_error(), Some(StoreError::DeadlineExceeded)));
}

#[test]
fn test_repository_is_bound_to_its_collection() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let specials = Repository::new(store.clone(), "specials");
    let ctx = Context::background();
    let mut m = menu("s1", 3);
    specials.create(&ctx, &mut m).unwrap();

    let mut got = Menu::default();
    specials.get_one(&ctx, "s1", &mut got).unwrap();
    assert_eq!(got.price, 3);
    assert!(get_one(store.as_ref(), &ctx, "s1", &mut Menu::default()).unwrap_err().is_not_found());

    m.price = 4;
    specials.set(&ctx, &mut m).unwrap();
    let all: Vec<Menu> = specials.get_all(&ctx).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].price, 4);
}
