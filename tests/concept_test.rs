//! Integration tests for concept identity and hierarchy traversal
//!
//! Runs the typed wrappers against the embedded engine.

use std::collections::HashSet;
use std::sync::Arc;
use typegraph::{
    ConceptError, Database, Deletable, HasFilter, Hierarchical, InstanceContainer, Labeled,
    MemoryDatabase, SessionType, Thing, ThingOps, ThingType, ThingTypeOps, Transaction,
    TransactionOptions, TransactionType, ValueType,
};

fn schema_write(db: &Database) -> Transaction {
    db.transaction(SessionType::Schema, TransactionType::Write, TransactionOptions::default())
        .unwrap()
}

fn database(name: &str) -> Database {
    Database::new(Arc::new(MemoryDatabase::new(name)))
}

#[test]
fn test_things_compare_by_iid() {
    let db = database("identity");
    let tx = schema_write(&db);
    let person = tx.concepts().put_entity_type("person").unwrap();
    let alice = person.create(&tx).unwrap();
    let bob = person.create(&tx).unwrap();

    // The same instance reached through a separate lookup
    let fetched = tx
        .concepts()
        .get_entity(alice.get_iid().as_str())
        .unwrap()
        .unwrap();
    assert_eq!(fetched, alice);
    assert_ne!(alice, bob);

    let set: HashSet<_> = [alice.clone(), fetched, bob].into_iter().collect();
    assert_eq!(set.len(), 2);

    let as_thing = alice.as_thing().unwrap();
    assert_eq!(as_thing.get_iid(), alice.get_iid());
    assert_eq!(as_thing.as_entity(), Some(&alice));
}

#[test]
fn test_root_attribute_type_equal_across_views() {
    let db = database("attribute-root");
    let tx = schema_write(&db);
    let root = tx.concepts().get_root_attribute_type().unwrap();
    let name = tx.concepts().put_attribute_type("name", ValueType::String).unwrap();

    let via_supertype = name.get_supertype(&tx).unwrap().unwrap();
    assert_eq!(via_supertype, root);

    let mut set = HashSet::new();
    set.insert(root);
    set.insert(via_supertype);
    assert_eq!(set.len(), 1);
    assert_eq!(name.value_type(), ValueType::String);
}

#[test]
fn test_explicit_subtypes_are_a_stable_subset() {
    let db = database("hierarchy");
    let tx = schema_write(&db);
    let concepts = tx.concepts();
    let person = concepts.put_entity_type("person").unwrap();
    let student = concepts.put_entity_type("student").unwrap();
    let lecturer = concepts.put_entity_type("lecturer").unwrap();
    let phd = concepts.put_entity_type("phd-student").unwrap();
    student.set_supertype(&tx, &person).unwrap();
    lecturer.set_supertype(&tx, &person).unwrap();
    phd.set_supertype(&tx, &student).unwrap();

    let explicit = person.get_subtypes_explicit(&tx).unwrap().collect_all().unwrap();
    let again = person.get_subtypes_explicit(&tx).unwrap().collect_all().unwrap();
    let transitive = person.get_subtypes(&tx).unwrap().collect_all().unwrap();

    assert_eq!(explicit, again);
    assert_eq!(explicit, vec![student.clone(), lecturer.clone()]);
    assert!(explicit.iter().all(|t| transitive.contains(t)));
    assert_eq!(transitive, vec![person.clone(), student.clone(), phd.clone(), lecturer]);

    let supertypes = phd.get_supertypes(&tx).unwrap().collect_all().unwrap();
    let labels: Vec<String> = supertypes.iter().map(|t| t.label().to_string()).collect();
    assert_eq!(labels, vec!["phd-student", "student", "person", "entity"]);
}

#[test]
fn test_attribute_put_is_content_addressed() {
    let db = database("put");
    let tx = schema_write(&db);
    let name = tx.concepts().put_attribute_type("name", ValueType::String).unwrap();

    let first = name.put(&tx, "alice").unwrap();
    let second = name.put(&tx, "alice").unwrap();
    assert_eq!(first.get_iid(), second.get_iid());
    assert_eq!(first, second);

    assert_eq!(name.get(&tx, "alice").unwrap(), Some(first));
    assert_eq!(name.get(&tx, "bob").unwrap(), None);
    assert_eq!(name.get_instances(&tx).unwrap().count(), 1);
}

#[test]
fn test_multiple_has_filters_rejected_before_engine() {
    let db = database("filters");
    let tx = schema_write(&db);
    let person = tx.concepts().put_entity_type("person").unwrap();
    let name = tx.concepts().put_attribute_type("name", ValueType::String).unwrap();
    let email = tx.concepts().put_attribute_type("email", ValueType::String).unwrap();
    let alice = person.create(&tx).unwrap();
    tx.close();

    // Filter validation wins over the closed transaction
    let filter = HasFilter::of_type(&name).attribute_types(&[email]);
    assert_eq!(alice.get_has(&tx, &filter).unwrap_err(), ConceptError::MultipleFilters);

    // A valid filter reaches the transaction and fails there
    let err = alice.get_has(&tx, &HasFilter::of_type(&name)).unwrap_err();
    assert!(err.is_illegal_state());
}

#[test]
fn test_root_thing_type_subtypes() {
    let db = database("root");
    let tx = schema_write(&db);
    let concepts = tx.concepts();
    let person = concepts.put_entity_type("person").unwrap();
    let friendship = concepts.put_relation_type("friendship").unwrap();
    let age = concepts.put_attribute_type("age", ValueType::Long).unwrap();
    let root = concepts.get_root_thing_type();

    let subtypes = root.get_subtypes(&tx).unwrap().collect_all().unwrap();
    assert_eq!(subtypes[0], ThingType::Root(root));
    let unique: HashSet<_> = subtypes.iter().cloned().collect();
    assert_eq!(unique.len(), subtypes.len());

    let labels: Vec<String> = subtypes.iter().map(|t| t.label().to_string()).collect();
    assert_eq!(
        labels,
        vec!["thing", "entity", "person", "relation", "friendship", "attribute", "age"]
    );
    assert!(subtypes.contains(&ThingType::from(person)));
    assert!(subtypes.contains(&ThingType::from(friendship)));
    assert!(subtypes.contains(&ThingType::from(age)));

    let explicit = root.get_subtypes_explicit(&tx).unwrap().collect_all().unwrap();
    assert_eq!(
        explicit,
        vec![
            ThingType::from(concepts.get_root_entity_type().unwrap()),
            ThingType::from(concepts.get_root_relation_type().unwrap()),
            ThingType::from(concepts.get_root_attribute_type().unwrap()),
        ]
    );
    assert!(root.get_supertype(&tx).unwrap().is_none());
}

#[test]
fn test_root_thing_type_instances() {
    let db = database("root-instances");
    let tx = schema_write(&db);
    let person = tx.concepts().put_entity_type("person").unwrap();
    let age = tx.concepts().put_attribute_type("age", ValueType::Long).unwrap();
    let alice = person.create(&tx).unwrap();
    let thirty = age.put(&tx, 30i64).unwrap();
    let root = tx.concepts().get_root_thing_type();

    assert_eq!(root.get_instances_explicit(&tx).unwrap().count(), 0);

    let instances = root.get_instances(&tx).unwrap().collect_all().unwrap();
    assert_eq!(instances, vec![Thing::from(alice), Thing::from(thirty)]);
}

#[test]
fn test_root_thing_type_is_immutable() {
    let db = database("root-mutations");
    let tx = schema_write(&db);
    let root = tx.concepts().get_root_thing_type();
    let name = tx.concepts().put_attribute_type("name", ValueType::String).unwrap();

    assert_eq!(root.set_label(&tx, "anything").unwrap_err().code(), "CLI08");
    assert_eq!(root.delete(&tx).unwrap_err().code(), "CLI08");
    assert_eq!(root.set_abstract(&tx).unwrap_err().code(), "CLI08");
    assert_eq!(root.set_owns(&tx, &name, None, &[]).unwrap_err().code(), "CLI08");
    assert!(!root.is_deleted(&tx).unwrap());
    assert_eq!(root.get_owns_explicit(&tx).unwrap().count(), 0);
    assert_eq!(root.get_label(&tx).unwrap().name(), "thing");
}

#[test]
fn test_get_type_of_thing() {
    let db = database("get-type");
    let tx = schema_write(&db);
    let person = tx.concepts().put_entity_type("person").unwrap();
    let alice = person.create(&tx).unwrap();

    assert_eq!(alice.get_type().unwrap(), ThingType::from(person));
    assert!(!alice.is_inferred());
    assert!(alice.to_string().starts_with("Entity[person:"));
}
