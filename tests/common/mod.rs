#![allow(dead_code)]

use fake::Fake;
use fake::faker::lorem::en::Word;
use fake::faker::name::en::Name;
use nexus_repo::entity::BaseEntity;
use nexus_repo::impl_entity;
use nexus_repo::{Context, DocumentStore, MemoryStore};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Menu {
    #[serde(flatten)]
    pub base: BaseEntity,
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}
impl_entity!(Menu, "menus");

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Order {
    #[serde(flatten)]
    pub base: BaseEntity,
    pub customer: String,
    pub total: i64,
}
impl_entity!(Order, "orders");

pub fn menu(id: &str, price: i64) -> Menu {
    Menu {
        base: BaseEntity { id: id.to_string(), active: false },
        name: Word().fake(),
        price,
        tags: Vec::new(),
    }
}

pub fn order(id: &str, total: i64) -> Order {
    Order { base: BaseEntity { id: id.to_string(), active: false }, customer: Name().fake(), total }
}

/// Store holding menus `m0`..`m{n-1}` with `price = i`.
pub fn seeded_menus(n: i64) -> MemoryStore {
    let store = MemoryStore::new();
    let ctx = Context::background();
    for i in 0..n {
        let mut m = menu(&format!("m{i}"), i);
        nexus_repo::repo::create(&store, &ctx, &mut m).unwrap();
    }
    assert_eq!(store.get_collection("menus").map_or(0, |c| c.len()), n as usize);
    store
}

pub fn ids<E: nexus_repo::Entity>(items: &[E]) -> Vec<String> {
    items.iter().map(|e| e.id().to_string()).collect()
}

pub fn collection_len(store: &MemoryStore, name: &str) -> usize {
    store.collection(name).and_then(|c| store.get_collection(&c.name)).map_or(0, |c| c.len())
}
