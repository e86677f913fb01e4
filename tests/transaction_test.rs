//! Integration tests for transaction and database lifecycles
//!
//! Verifies that wrappers fail fast once their transaction is gone, and that
//! commit, rollback and session permissions behave as documented.

use std::io::Write;
use std::sync::Arc;
use typegraph::{
    init_logging, ClientConfig, ConceptError, Database, Deletable, Hierarchical,
    InstanceContainer, Labeled, MemoryDatabase, SessionType, ThingOps, ThingTypeOps,
    TransactionOptions, TransactionType, ValueType,
};

fn database(name: &str) -> Database {
    Database::new(Arc::new(MemoryDatabase::new(name)))
}

fn open(db: &Database, session: SessionType, kind: TransactionType) -> typegraph::Transaction {
    db.transaction(session, kind, TransactionOptions::default()).unwrap()
}

#[test]
fn test_closed_transaction_is_illegal_state() {
    let db = database("closed");
    let tx = open(&db, SessionType::Schema, TransactionType::Write);
    let person = tx.concepts().put_entity_type("person").unwrap();
    let name = tx.concepts().put_attribute_type("name", ValueType::String).unwrap();
    let alice = person.create(&tx).unwrap();
    let root = tx.concepts().get_root_thing_type();
    tx.close();
    assert!(!tx.is_open());

    let failures = vec![
        person.get_label(&tx).err(),
        person.create(&tx).err(),
        person.get_subtypes(&tx).err(),
        person.get_instances(&tx).err(),
        person.is_deleted(&tx).err(),
        person.set_owns(&tx, &name, None, &[]).err(),
        name.put(&tx, "alice").err(),
        alice.is_deleted(&tx).err(),
        alice.delete(&tx).err(),
        root.get_subtypes(&tx).err(),
        root.get_instances_explicit(&tx).err(),
        root.get_supertype(&tx).err(),
        root.get_owns_explicit(&tx).err(),
        root.delete(&tx).err(),
        root.set_abstract(&tx).err(),
        root.set_label(&tx, "anything").err(),
        root.set_owns(&tx, &name, None, &[]).err(),
        root.get_syntax(&tx).err(),
        tx.concepts().get_entity_type("person").err(),
        tx.commit().err(),
        tx.rollback().err(),
    ];
    for failure in failures {
        let err = failure.expect("operation on a closed transaction succeeded");
        assert!(matches!(err, ConceptError::IllegalState(_)), "unexpected error {:?}", err);
        assert_eq!(err.code(), "CLI02");
    }

    // Snapshots stay readable without the transaction
    assert_eq!(person.label().name(), "person");
    assert!(!alice.get_iid().is_empty());
}

#[test]
fn test_wrappers_do_not_cross_transactions() {
    let db = database("foreign");
    let tx = open(&db, SessionType::Schema, TransactionType::Write);
    let person = tx.concepts().put_entity_type("person").unwrap();
    tx.commit().unwrap();
    assert!(!tx.is_open());

    let next = open(&db, SessionType::Schema, TransactionType::Write);
    assert!(person.get_label(&next).unwrap_err().is_illegal_state());

    // A wrapper fetched through the new transaction works
    let person = next.concepts().get_entity_type("person").unwrap().unwrap();
    assert_eq!(person.get_label(&next).unwrap().name(), "person");
}

#[test]
fn test_commit_publishes_and_rollback_discards() {
    let db = database("commit");
    let tx = open(&db, SessionType::Schema, TransactionType::Write);
    tx.concepts().put_entity_type("person").unwrap();
    tx.commit().unwrap();

    let tx = open(&db, SessionType::Data, TransactionType::Write);
    let person = tx.concepts().get_entity_type("person").unwrap().unwrap();
    person.create(&tx).unwrap();
    tx.rollback().unwrap();
    assert!(tx.is_open());
    assert_eq!(person.get_instances(&tx).unwrap().count(), 0);

    let alice = person.create(&tx).unwrap();
    tx.commit().unwrap();

    let read = open(&db, SessionType::Data, TransactionType::Read);
    let fetched = read.concepts().get_entity(alice.get_iid().as_str()).unwrap();
    assert_eq!(fetched, Some(alice));
}

#[test]
fn test_iids_are_not_reused_after_rollback() {
    let db = database("rollback-iids");
    let tx = open(&db, SessionType::Schema, TransactionType::Write);
    tx.concepts().put_entity_type("person").unwrap();
    tx.commit().unwrap();

    let tx = open(&db, SessionType::Data, TransactionType::Write);
    let person = tx.concepts().get_entity_type("person").unwrap().unwrap();
    let discarded = person.create(&tx).unwrap();
    tx.rollback().unwrap();
    assert!(discarded.is_deleted(&tx).unwrap());

    let kept = person.create(&tx).unwrap();
    assert_ne!(kept.get_iid(), discarded.get_iid());
    assert_ne!(kept, discarded);
    assert!(discarded.is_deleted(&tx).unwrap());
    assert!(!kept.is_deleted(&tx).unwrap());
    assert_eq!(person.get_instances(&tx).unwrap().collect_all().unwrap(), vec![kept]);
}

#[test]
fn test_concurrent_commits_do_not_lose_writes() {
    let db = database("concurrent");
    let tx = open(&db, SessionType::Schema, TransactionType::Write);
    tx.concepts().put_entity_type("person").unwrap();
    tx.commit().unwrap();

    let first = open(&db, SessionType::Data, TransactionType::Write);
    let second = open(&db, SessionType::Data, TransactionType::Write);
    let alice = first
        .concepts()
        .get_entity_type("person")
        .unwrap()
        .unwrap()
        .create(&first)
        .unwrap();
    let bob = second
        .concepts()
        .get_entity_type("person")
        .unwrap()
        .unwrap()
        .create(&second)
        .unwrap();
    assert_ne!(alice.get_iid(), bob.get_iid());

    first.commit().unwrap();
    let err = second.commit().unwrap_err();
    assert_eq!(err.code(), "TXN05");
    assert!(!second.is_open());

    let read = open(&db, SessionType::Data, TransactionType::Read);
    let person = read.concepts().get_entity_type("person").unwrap().unwrap();
    assert_eq!(
        person.get_instances(&read).unwrap().collect_all().unwrap(),
        vec![alice.clone()]
    );
    assert!(read.concepts().get_entity(bob.get_iid().as_str()).unwrap().is_none());

    // Retrying on a fresh transaction keeps both writes
    let retry = open(&db, SessionType::Data, TransactionType::Write);
    let person = retry.concepts().get_entity_type("person").unwrap().unwrap();
    let carol = person.create(&retry).unwrap();
    assert_ne!(carol.get_iid(), alice.get_iid());
    assert_ne!(carol.get_iid(), bob.get_iid());
    retry.commit().unwrap();

    let read = open(&db, SessionType::Data, TransactionType::Read);
    let person = read.concepts().get_entity_type("person").unwrap().unwrap();
    assert_eq!(person.get_instances(&read).unwrap().count(), 2);
}

#[test]
fn test_session_and_transaction_permissions() {
    let db = database("permissions");
    let schema = open(&db, SessionType::Schema, TransactionType::Write);
    schema.concepts().put_entity_type("person").unwrap();
    schema.commit().unwrap();

    let read = open(&db, SessionType::Data, TransactionType::Read);
    let person = read.concepts().get_entity_type("person").unwrap().unwrap();
    assert_eq!(person.create(&read).unwrap_err().code(), "TXN03");
    assert_eq!(read.commit().unwrap_err().code(), "TXN03");

    let data = open(&db, SessionType::Data, TransactionType::Write);
    let person = data.concepts().get_entity_type("person").unwrap().unwrap();
    assert_eq!(person.set_abstract(&data).unwrap_err().code(), "TXN04");
    assert_eq!(data.concepts().put_entity_type("company").unwrap_err().code(), "TXN04");
    assert!(person.create(&data).is_ok());
}

#[test]
fn test_close_invalidates_open_streams() {
    let db = database("streams");
    let tx = db
        .transaction(
            SessionType::Schema,
            TransactionType::Write,
            TransactionOptions::default().with_prefetch_size(2),
        )
        .unwrap();
    let person = tx.concepts().put_entity_type("person").unwrap();
    for _ in 0..5 {
        person.create(&tx).unwrap();
    }

    let mut instances = person.get_instances(&tx).unwrap();
    assert!(instances.next().unwrap().is_ok());
    tx.close();

    let err = instances.next().unwrap().unwrap_err();
    assert!(err.is_illegal_state());
    assert!(instances.next().is_none());
}

#[test]
fn test_invalid_options_rejected_before_opening() {
    let db = database("options");
    let err = db
        .transaction(
            SessionType::Data,
            TransactionType::Read,
            TransactionOptions::default().with_prefetch_size(0),
        )
        .unwrap_err();
    assert_eq!(err.code(), "CLI09");

    let err = db
        .transaction(
            SessionType::Data,
            TransactionType::Read,
            TransactionOptions::default().with_explain(true),
        )
        .unwrap_err();
    assert!(matches!(err, ConceptError::Config(_)));

    let tx = db
        .transaction(
            SessionType::Data,
            TransactionType::Read,
            TransactionOptions::default().with_infer(true).with_explain(true),
        )
        .unwrap();
    assert!(tx.options().explain);
}

#[test]
fn test_deleted_database_rejects_calls() {
    let db = database("ephemeral");
    assert_eq!(db.name(), "ephemeral");
    assert_eq!(db.to_string(), "ephemeral");
    db.delete().unwrap();

    assert_eq!(db.name(), "ephemeral");
    let err = db.schema().unwrap_err();
    assert_eq!(err, ConceptError::DatabaseDeleted("ephemeral".to_string()));
    assert!(err.is_illegal_state());
    assert!(db
        .transaction(SessionType::Data, TransactionType::Read, TransactionOptions::default())
        .is_err());
    assert!(db.delete().is_err());
}

#[test]
fn test_client_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "transaction:\n  infer: true\n  prefetch_size: 8\nlogging:\n  level: \"typegraph=debug\"\n  ansi: false"
    )
    .unwrap();

    let config = ClientConfig::load(file.path()).unwrap();
    assert!(config.transaction.infer);
    assert_eq!(config.transaction.prefetch_size, 8);
    assert_eq!(config.transaction.transaction_timeout_ms, 300_000);
    assert!(!config.logging.ansi);
    init_logging(&config.logging).unwrap();

    let db = database("configured");
    let tx = db
        .transaction(SessionType::Data, TransactionType::Read, config.transaction.clone())
        .unwrap();
    assert_eq!(tx.options(), &config.transaction);
}
