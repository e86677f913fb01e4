//! Canonical renderings produced by the embedded engine

use super::store::{Store, ThingRecord, TypeKind, TypeRecord};
use crate::engine::{ConceptId, EngineResult, ROOT_THING};

pub fn type_tag(kind: TypeKind) -> &'static str {
    match kind {
        TypeKind::Entity => "entity_type",
        TypeKind::Relation => "relation_type",
        TypeKind::Attribute => "attribute_type",
        TypeKind::Role => "role_type",
    }
}

pub fn thing_tag(kind: TypeKind) -> &'static str {
    match kind {
        TypeKind::Entity => "entity",
        TypeKind::Relation => "relation",
        // role types have no instances; attributes are the remaining case
        TypeKind::Attribute | TypeKind::Role => "attribute",
    }
}

/// `EntityType[person]`
pub fn type_rendering(record: &TypeRecord) -> String {
    let name = match record.kind {
        TypeKind::Entity => "EntityType",
        TypeKind::Relation => "RelationType",
        TypeKind::Attribute => "AttributeType",
        TypeKind::Role => "RoleType",
    };
    format!("{}[{}]", name, record.label)
}

/// `Entity[person:0x0005000000000009]`
pub fn thing_rendering(store: &Store, record: &ThingRecord) -> EngineResult<String> {
    let thing_type = store.type_record(record.type_id)?;
    let name = match thing_type.kind {
        TypeKind::Entity => "Entity",
        TypeKind::Relation => "Relation",
        TypeKind::Attribute | TypeKind::Role => "Attribute",
    };
    Ok(format!("{}[{}:{}]", name, thing_type.label, record.iid))
}

fn label_of(store: &Store, id: ConceptId) -> EngineResult<String> {
    Ok(store.type_record(id)?.label.to_string())
}

/// Schema definition of one type, e.g.
/// `define person sub entity, owns name @key, plays employment:employee;`
pub fn syntax(store: &Store, id: ConceptId) -> EngineResult<String> {
    let record = store.type_record(id)?;
    let supertype = match record.supertype {
        Some(sup) => label_of(store, sup)?,
        None => ROOT_THING.to_string(),
    };
    let mut clauses = vec![format!("{} sub {}", record.label, supertype)];
    if record.is_abstract && !record.is_root {
        clauses.push("abstract".to_string());
    }
    if let Some(value_type) = record.value_type {
        clauses.push(format!("value {}", value_type));
    }
    if let Some(regex) = &record.regex {
        clauses.push(format!("regex {:?}", regex));
    }
    for (attribute_type, edge) in &record.owns {
        let mut clause = format!("owns {}", label_of(store, *attribute_type)?);
        if let Some(overridden) = edge.overridden {
            clause.push_str(&format!(" as {}", label_of(store, overridden)?));
        }
        for annotation in &edge.annotations {
            clause.push_str(&format!(" {}", annotation));
        }
        clauses.push(clause);
    }
    for (role_type, overridden) in &record.plays {
        let mut clause = format!("plays {}", label_of(store, *role_type)?);
        if let Some(overridden) = overridden {
            clause.push_str(&format!(" as {}", label_of(store, *overridden)?));
        }
        clauses.push(clause);
    }
    for (role_type, overridden) in &record.relates {
        let mut clause = format!("relates {}", store.type_record(*role_type)?.label.name());
        if let Some(overridden) = overridden {
            clause.push_str(&format!(" as {}", store.type_record(*overridden)?.label.name()));
        }
        clauses.push(clause);
    }
    Ok(format!("define {};", clauses.join(", ")))
}

/// Every user-defined thing type, one definition per line.
/// Roles are covered by the `relates` clauses of their relation types.
pub fn type_schema(store: &Store) -> EngineResult<String> {
    let mut lines = Vec::new();
    for record in store.all_types() {
        if record.is_root || record.kind == TypeKind::Role {
            continue;
        }
        lines.push(syntax(store, record.id)?);
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Annotation, Label, ValueType};

    #[test]
    fn test_syntax_clauses() {
        let mut store = Store::new();
        let person = store.put_type(TypeKind::Entity, Label::new("person"), None).unwrap();
        let email = store
            .put_type(TypeKind::Attribute, Label::new("email"), Some(ValueType::String))
            .unwrap();
        let employment = store.put_type(TypeKind::Relation, Label::new("employment"), None).unwrap();
        store.set_relates(employment, "employee", None).unwrap();
        let employee = store.relates_by_name(employment, "employee").unwrap().unwrap();
        store.set_owns(person, email, None, &[Annotation::Key]).unwrap();
        store.set_plays(person, employee, None).unwrap();
        store.set_regex(email, "^.+@.+$").unwrap();

        assert_eq!(
            syntax(&store, person).unwrap(),
            "define person sub entity, owns email @key, plays employment:employee;"
        );
        assert_eq!(
            syntax(&store, email).unwrap(),
            "define email sub attribute, value string, regex \"^.+@.+$\";"
        );
        assert_eq!(
            syntax(&store, employment).unwrap(),
            "define employment sub relation, relates employee;"
        );
        assert_eq!(type_schema(&store).unwrap().lines().count(), 3);
    }
}
