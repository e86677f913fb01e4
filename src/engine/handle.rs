//! Opaque references to engine-side concepts

use crate::common::{Iid, Label, Value, ValueType};
use crate::error::{ConceptError, ConceptResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Engine-assigned identifier of a concept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ConceptId(pub u64);

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Engine-assigned identifier of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// Runtime kind of a concept.
///
/// Each kind owns exactly one wire tag, registered in [`KIND_REGISTRY`].
/// Adding a kind here forces every exhaustive match over it (most
/// importantly the concept factory) to be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConceptKind {
    EntityType,
    RelationType,
    AttributeType,
    RoleType,
    Entity,
    Relation,
    Attribute,
}

/// Process-wide tag registry, read-only after compilation
pub const KIND_REGISTRY: [(&str, ConceptKind); 7] = [
    ("entity_type", ConceptKind::EntityType),
    ("relation_type", ConceptKind::RelationType),
    ("attribute_type", ConceptKind::AttributeType),
    ("role_type", ConceptKind::RoleType),
    ("entity", ConceptKind::Entity),
    ("relation", ConceptKind::Relation),
    ("attribute", ConceptKind::Attribute),
];

impl ConceptKind {
    pub fn from_tag(tag: &str) -> ConceptResult<Self> {
        KIND_REGISTRY
            .iter()
            .find(|(registered, _)| *registered == tag)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| ConceptError::UnexpectedKind(tag.to_string()))
    }

    pub fn tag(self) -> &'static str {
        match self {
            ConceptKind::EntityType => "entity_type",
            ConceptKind::RelationType => "relation_type",
            ConceptKind::AttributeType => "attribute_type",
            ConceptKind::RoleType => "role_type",
            ConceptKind::Entity => "entity",
            ConceptKind::Relation => "relation",
            ConceptKind::Attribute => "attribute",
        }
    }

    pub fn is_type(self) -> bool {
        matches!(
            self,
            ConceptKind::EntityType
                | ConceptKind::RelationType
                | ConceptKind::AttributeType
                | ConceptKind::RoleType
        )
    }

    pub fn is_thing(self) -> bool {
        !self.is_type()
    }
}

/// Kind-specific snapshot carried by a raw concept
#[derive(Debug, Clone)]
pub enum RawPayload {
    Type {
        label: Label,
        is_root: bool,
        is_abstract: bool,
        value_type: Option<ValueType>,
    },
    Thing {
        iid: Iid,
        type_: ConceptHandle,
        inferred: bool,
        value: Option<Value>,
    },
}

/// A concept as the engine hands it over, before it is wrapped
#[derive(Debug, Clone)]
pub struct RawConcept {
    pub id: ConceptId,
    /// Kind tag, resolved through [`ConceptKind::from_tag`]
    pub kind: String,
    pub owner: TransactionId,
    /// Canonical rendering owned by the engine; never parsed here
    pub rendering: String,
    pub payload: RawPayload,
}

/// Immutable reference to one engine-side concept.
///
/// Cloning is cheap. Equality and hashing follow the engine identifier only.
#[derive(Clone)]
pub struct ConceptHandle(Arc<RawConcept>);

impl ConceptHandle {
    /// Take ownership of an engine reference; an absent one is rejected
    pub fn new(raw: Option<RawConcept>) -> ConceptResult<Self> {
        raw.map(|raw| ConceptHandle(Arc::new(raw)))
            .ok_or(ConceptError::NullHandle)
    }

    pub fn id(&self) -> ConceptId {
        self.0.id
    }

    pub fn tag(&self) -> &str {
        &self.0.kind
    }

    pub fn kind(&self) -> ConceptResult<ConceptKind> {
        ConceptKind::from_tag(&self.0.kind)
    }

    pub fn owner(&self) -> TransactionId {
        self.0.owner
    }

    pub fn rendering(&self) -> &str {
        &self.0.rendering
    }

    pub fn payload(&self) -> &RawPayload {
        &self.0.payload
    }

    pub fn label(&self) -> Option<&Label> {
        match &self.0.payload {
            RawPayload::Type { label, .. } => Some(label),
            RawPayload::Thing { .. } => None,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self.0.payload, RawPayload::Type { is_root: true, .. })
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.0.payload, RawPayload::Type { is_abstract: true, .. })
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match &self.0.payload {
            RawPayload::Type { value_type, .. } => *value_type,
            RawPayload::Thing { value, .. } => value.as_ref().map(Value::value_type),
        }
    }

    pub fn iid(&self) -> Option<&Iid> {
        match &self.0.payload {
            RawPayload::Thing { iid, .. } => Some(iid),
            RawPayload::Type { .. } => None,
        }
    }

    pub fn thing_type(&self) -> Option<&ConceptHandle> {
        match &self.0.payload {
            RawPayload::Thing { type_, .. } => Some(type_),
            RawPayload::Type { .. } => None,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.0.payload {
            RawPayload::Thing { value, .. } => value.as_ref(),
            RawPayload::Type { .. } => None,
        }
    }

    pub fn is_inferred(&self) -> bool {
        matches!(self.0.payload, RawPayload::Thing { inferred: true, .. })
    }
}

impl From<RawConcept> for ConceptHandle {
    fn from(raw: RawConcept) -> Self {
        ConceptHandle(Arc::new(raw))
    }
}

impl PartialEq for ConceptHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ConceptHandle {}

impl Hash for ConceptHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for ConceptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConceptHandle({}{})", self.0.kind, self.0.id)
    }
}

impl fmt::Display for ConceptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.rendering)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_type(id: u64, kind: &str, label: &str) -> RawConcept {
        RawConcept {
            id: ConceptId(id),
            kind: kind.to_string(),
            owner: TransactionId(1),
            rendering: label.to_string(),
            payload: RawPayload::Type {
                label: Label::parse(label),
                is_root: false,
                is_abstract: false,
                value_type: None,
            },
        }
    }

    #[test]
    fn test_null_handle_rejected() {
        assert_eq!(ConceptHandle::new(None).unwrap_err(), ConceptError::NullHandle);
    }

    #[test]
    fn test_handle_equality_by_id() {
        let a = ConceptHandle::new(Some(raw_type(7, "entity_type", "person"))).unwrap();
        let b = ConceptHandle::new(Some(raw_type(7, "entity_type", "person"))).unwrap();
        let c = ConceptHandle::new(Some(raw_type(8, "entity_type", "person"))).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_kind_registry_is_consistent() {
        for (tag, kind) in KIND_REGISTRY {
            assert_eq!(kind.tag(), tag);
            assert_eq!(ConceptKind::from_tag(tag).unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind_tag() {
        let handle = ConceptHandle::new(Some(raw_type(1, "function", "f"))).unwrap();
        assert_eq!(
            handle.kind().unwrap_err(),
            ConceptError::UnexpectedKind("function".to_string())
        );
    }
}
