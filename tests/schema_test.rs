//! Integration tests for schema definition
//!
//! Covers types, ownership, role declaration and the constraints the
//! embedded engine enforces on them.

use std::sync::Arc;
use typegraph::{
    Annotation, ConceptError, Database, Deletable, Hierarchical, InstanceContainer, Label,
    Labeled, MemoryDatabase, SessionType, ThingOps, ThingType, ThingTypeOps, Transaction,
    TransactionOptions, TransactionType, Transitivity, ValueType,
};

fn schema_write(db: &Database) -> Transaction {
    db.transaction(SessionType::Schema, TransactionType::Write, TransactionOptions::default())
        .unwrap()
}

fn database(name: &str) -> Database {
    Database::new(Arc::new(MemoryDatabase::new(name)))
}

#[test]
fn test_entity_lifecycle() {
    let db = database("lifecycle");
    let tx = schema_write(&db);
    let person = tx.concepts().put_entity_type("person").unwrap();
    assert!(!person.is_abstract());

    let alice = person.create(&tx).unwrap();
    assert!(!alice.get_iid().is_empty());
    assert!(!alice.is_deleted(&tx).unwrap());

    alice.delete(&tx).unwrap();
    assert!(alice.is_deleted(&tx).unwrap());
    assert_eq!(person.get_instances(&tx).unwrap().count(), 0);
}

#[test]
fn test_relates_override_within_relation() {
    let db = database("employment");
    let tx = schema_write(&db);
    let employment = tx.concepts().put_relation_type("employment").unwrap();
    employment.set_relates(&tx, "employee", None).unwrap();
    employment.set_relates(&tx, "employer", Some("employee")).unwrap();

    let overridden = employment
        .get_relates_overridden(&tx, "employer")
        .unwrap()
        .unwrap();
    assert_eq!(overridden.label(), &Label::scoped("employment", "employee"));
    assert!(employment.get_relates_overridden(&tx, "employee").unwrap().is_none());

    let employer = employment.get_relates_for(&tx, "employer").unwrap().unwrap();
    assert_eq!(employer.get_supertype(&tx).unwrap(), Some(overridden));
    assert_eq!(employer.get_relation_type(&tx).unwrap(), employment);
    assert_eq!(employment.get_relates_explicit(&tx).unwrap().count(), 2);
}

#[test]
fn test_inherited_roles_are_hidden_by_overrides() {
    let db = database("inherited-roles");
    let tx = schema_write(&db);
    let concepts = tx.concepts();
    let employment = concepts.put_relation_type("employment").unwrap();
    employment.set_relates(&tx, "employee", None).unwrap();
    employment.set_relates(&tx, "employer", None).unwrap();

    let contract = concepts.put_relation_type("contract").unwrap();
    contract.set_supertype(&tx, &employment).unwrap();
    contract.set_relates(&tx, "contractor", Some("employee")).unwrap();

    let labels: Vec<String> = contract
        .get_relates(&tx)
        .unwrap()
        .map(|r| r.unwrap().label().to_string())
        .collect();
    assert_eq!(labels, vec!["contract:contractor", "employment:employer"]);

    let employee = employment.get_relates_for(&tx, "employee").unwrap().unwrap();
    let relation_types = employee.get_relation_types(&tx).unwrap().collect_all().unwrap();
    assert_eq!(relation_types, vec![employment]);
}

#[test]
fn test_abstract_type_cannot_be_instantiated() {
    let db = database("abstract");
    let tx = schema_write(&db);
    let animal = tx.concepts().put_entity_type("animal").unwrap();
    animal.set_abstract(&tx).unwrap();

    // The wrapper keeps its snapshot; a fresh lookup sees the change
    let animal = tx.concepts().get_entity_type("animal").unwrap().unwrap();
    assert!(animal.is_abstract());

    let err = animal.create(&tx).unwrap_err();
    assert_eq!(err, ConceptError::AbstractType(Label::new("animal")));

    animal.unset_abstract(&tx).unwrap();
    assert!(animal.create(&tx).is_ok());
}

#[test]
fn test_regex_only_on_string_attribute_types() {
    let db = database("regex");
    let tx = schema_write(&db);
    let age = tx.concepts().put_attribute_type("age", ValueType::Long).unwrap();
    let err = age.set_regex(&tx, "^[0-9]+$").unwrap_err();
    assert_eq!(err.code(), "TYW11");
    assert!(matches!(err, ConceptError::Engine { .. }));

    let email = tx.concepts().put_attribute_type("email", ValueType::String).unwrap();
    email.set_regex(&tx, "^.+@.+$").unwrap();
    assert_eq!(email.get_regex(&tx).unwrap().as_deref(), Some("^.+@.+$"));
    assert_eq!(email.put(&tx, "not-an-email").unwrap_err().code(), "THW04");
    assert!(email.put(&tx, "alice@example.com").is_ok());

    email.unset_regex(&tx).unwrap();
    assert_eq!(email.get_regex(&tx).unwrap(), None);
    assert!(email.put(&tx, "anything").is_ok());
}

#[test]
fn test_owns_with_annotations_and_overrides() {
    let db = database("owns");
    let tx = schema_write(&db);
    let concepts = tx.concepts();
    let person = concepts.put_entity_type("person").unwrap();
    let employee = concepts.put_entity_type("employee").unwrap();
    employee.set_supertype(&tx, &person).unwrap();

    let name = concepts.put_attribute_type("name", ValueType::String).unwrap();
    let email = concepts.put_attribute_type("email", ValueType::String).unwrap();
    let identifier = concepts.put_attribute_type("identifier", ValueType::String).unwrap();
    identifier.set_abstract(&tx).unwrap();
    let staff_id = concepts.put_attribute_type("staff-id", ValueType::String).unwrap();
    staff_id.set_supertype(&tx, &identifier).unwrap();

    person.set_owns(&tx, &name, None, &[]).unwrap();
    person.set_owns(&tx, &email, None, &[Annotation::Key]).unwrap();
    person.set_owns(&tx, &identifier, None, &[]).unwrap();
    employee.set_owns(&tx, &staff_id, Some(&identifier), &[Annotation::Unique]).unwrap();

    let owned = employee
        .get_owns(&tx, None, Transitivity::Transitive, &[])
        .unwrap()
        .collect_all()
        .unwrap();
    assert_eq!(owned, vec![staff_id.clone(), name.clone(), email.clone()]);

    let keys = person
        .get_owns(&tx, None, Transitivity::Transitive, &[Annotation::Key])
        .unwrap()
        .collect_all()
        .unwrap();
    assert_eq!(keys, vec![email.clone()]);

    assert_eq!(employee.get_owns_explicit(&tx).unwrap().collect_all().unwrap(), vec![staff_id.clone()]);
    assert_eq!(employee.get_owns_overridden(&tx, &staff_id).unwrap(), Some(identifier));

    let owners = email.get_owners(&tx, Transitivity::Transitive, &[]).unwrap().collect_all().unwrap();
    assert_eq!(owners, vec![ThingType::from(person.clone()), ThingType::from(employee.clone())]);
    assert_eq!(email.get_owners_explicit(&tx).unwrap().collect_all().unwrap(), vec![ThingType::from(person.clone())]);

    // Keys need a keyable value type
    let score = concepts.put_attribute_type("score", ValueType::Double).unwrap();
    assert_eq!(person.set_owns(&tx, &score, None, &[Annotation::Key]).unwrap_err().code(), "TYW17");

    person.unset_owns(&tx, &name).unwrap();
    assert!(!employee
        .get_owns(&tx, None, Transitivity::Transitive, &[])
        .unwrap()
        .map(Result::unwrap)
        .any(|t| t == name));
}

#[test]
fn test_plays_and_player_types() {
    let db = database("plays");
    let tx = schema_write(&db);
    let concepts = tx.concepts();
    let employment = concepts.put_relation_type("employment").unwrap();
    employment.set_relates(&tx, "employee", None).unwrap();
    let role = employment.get_relates_for(&tx, "employee").unwrap().unwrap();

    let person = concepts.put_entity_type("person").unwrap();
    let intern = concepts.put_entity_type("intern").unwrap();
    intern.set_supertype(&tx, &person).unwrap();
    person.set_plays(&tx, &role, None).unwrap();

    assert_eq!(person.get_plays_explicit(&tx).unwrap().collect_all().unwrap(), vec![role.clone()]);
    assert_eq!(intern.get_plays(&tx, Transitivity::Transitive).unwrap().count(), 1);
    assert_eq!(intern.get_plays_explicit(&tx).unwrap().count(), 0);

    let players = role.get_player_types(&tx).unwrap().collect_all().unwrap();
    assert_eq!(players, vec![ThingType::from(person.clone()), ThingType::from(intern)]);
    assert_eq!(role.get_player_types_explicit(&tx).unwrap().count(), 1);

    person.unset_plays(&tx, &role).unwrap();
    assert_eq!(role.get_player_types(&tx).unwrap().count(), 0);
}

#[test]
fn test_labels_are_snapshots_until_requeried() {
    let db = database("labels");
    let tx = schema_write(&db);
    let employment = tx.concepts().put_relation_type("employment").unwrap();
    employment.set_relates(&tx, "employee", None).unwrap();
    let role = employment.get_relates_for(&tx, "employee").unwrap().unwrap();

    employment.set_label(&tx, "job").unwrap();
    assert_eq!(employment.label(), &Label::new("employment"));
    assert_eq!(employment.get_label(&tx).unwrap(), Label::new("job"));
    assert_eq!(role.get_label(&tx).unwrap(), Label::scoped("job", "employee"));

    role.set_label(&tx, "worker").unwrap();
    assert_eq!(role.get_label(&tx).unwrap(), Label::scoped("job", "worker"));
    assert!(tx.concepts().get_relation_type("employment").unwrap().is_none());
}

#[test]
fn test_type_deletion_constraints() {
    let db = database("deletion");
    let tx = schema_write(&db);
    let person = tx.concepts().put_entity_type("person").unwrap();
    let student = tx.concepts().put_entity_type("student").unwrap();
    student.set_supertype(&tx, &person).unwrap();

    assert_eq!(person.delete(&tx).unwrap_err().code(), "TYW14");

    let alice = student.create(&tx).unwrap();
    assert_eq!(student.delete(&tx).unwrap_err().code(), "TYW15");

    alice.delete(&tx).unwrap();
    student.delete(&tx).unwrap();
    assert!(student.is_deleted(&tx).unwrap());
    person.delete(&tx).unwrap();
    assert!(tx.concepts().get_entity_type("person").unwrap().is_none());

    let root = tx.concepts().get_root_entity_type().unwrap();
    assert!(root.is_root());
    assert_eq!(root.delete(&tx).unwrap_err().code(), "TYW02");
}

#[test]
fn test_syntax_and_schema_export() {
    let db = database("syntax");
    let tx = schema_write(&db);
    let concepts = tx.concepts();
    let person = concepts.put_entity_type("person").unwrap();
    let email = concepts.put_attribute_type("email", ValueType::String).unwrap();
    let employment = concepts.put_relation_type("employment").unwrap();
    employment.set_relates(&tx, "employee", None).unwrap();
    let employee = employment.get_relates_for(&tx, "employee").unwrap().unwrap();
    person.set_owns(&tx, &email, None, &[Annotation::Key]).unwrap();
    person.set_plays(&tx, &employee, None).unwrap();

    assert_eq!(
        person.get_syntax(&tx).unwrap(),
        "define person sub entity, owns email @key, plays employment:employee;"
    );
    assert_eq!(
        tx.concepts().get_root_thing_type().get_syntax(&tx).unwrap_err().code(),
        "CLI08"
    );
    tx.commit().unwrap();

    let schema = db.type_schema().unwrap();
    assert_eq!(schema.lines().count(), 3);
    assert!(schema.contains("define employment sub relation, relates employee;"));
    assert_eq!(db.schema().unwrap(), schema);
    assert_eq!(db.rule_schema().unwrap(), "");
}

#[test]
fn test_attribute_subtypes_by_value_type() {
    let db = database("value-types");
    let tx = schema_write(&db);
    let root = tx.concepts().get_root_attribute_type().unwrap();
    let name = tx.concepts().put_attribute_type("name", ValueType::String).unwrap();
    let age = tx.concepts().put_attribute_type("age", ValueType::Long).unwrap();

    let strings = root
        .get_subtypes_with_value_type(&tx, ValueType::String)
        .unwrap()
        .collect_all()
        .unwrap();
    assert_eq!(strings, vec![name.clone()]);

    assert_eq!(root.get_subtypes(&tx).unwrap().count(), 3);
    assert_eq!(
        tx.concepts().put_attribute_type("age", ValueType::String).unwrap_err().code(),
        "TYW04"
    );
    assert_eq!(tx.concepts().put_attribute_type("age", ValueType::Long).unwrap(), age);
}
