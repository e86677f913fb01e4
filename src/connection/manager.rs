use super::Transaction;
use crate::common::{Iid, Label, ValueType};
use crate::concept::{
    Attribute, AttributeType, Entity, EntityType, FromConcept, Relation, RelationType,
    RootThingType,
};
use crate::engine::{ConceptKind, ConceptRequest, ROOT_ATTRIBUTE, ROOT_ENTITY, ROOT_RELATION};
use crate::error::ConceptResult;

/// Entry point for schema roots and lookups, scoped to one transaction
pub struct ConceptManager<'tx> {
    tx: &'tx Transaction,
}

impl<'tx> ConceptManager<'tx> {
    pub(crate) fn new(tx: &'tx Transaction) -> Self {
        Self { tx }
    }

    /// The synthesized `thing` type above the three roots
    pub fn get_root_thing_type(&self) -> RootThingType {
        RootThingType
    }

    pub fn get_root_entity_type(&self) -> ConceptResult<EntityType> {
        self.root(ConceptKind::EntityType, ROOT_ENTITY)
    }

    pub fn get_root_relation_type(&self) -> ConceptResult<RelationType> {
        self.root(ConceptKind::RelationType, ROOT_RELATION)
    }

    pub fn get_root_attribute_type(&self) -> ConceptResult<AttributeType> {
        self.root(ConceptKind::AttributeType, ROOT_ATTRIBUTE)
    }

    fn root<T: FromConcept>(&self, kind: ConceptKind, label: &str) -> ConceptResult<T> {
        self.tx.single(ConceptRequest::GetThingType {
            kind,
            label: Label::new(label),
        })
    }

    fn thing_type<T: FromConcept>(&self, kind: ConceptKind, label: &str) -> ConceptResult<Option<T>> {
        self.tx.optional(ConceptRequest::GetThingType {
            kind,
            label: Label::new(label),
        })
    }

    pub fn get_entity_type(&self, label: &str) -> ConceptResult<Option<EntityType>> {
        self.thing_type(ConceptKind::EntityType, label)
    }

    pub fn get_relation_type(&self, label: &str) -> ConceptResult<Option<RelationType>> {
        self.thing_type(ConceptKind::RelationType, label)
    }

    pub fn get_attribute_type(&self, label: &str) -> ConceptResult<Option<AttributeType>> {
        self.thing_type(ConceptKind::AttributeType, label)
    }

    /// Get or define an entity type
    pub fn put_entity_type(&self, label: &str) -> ConceptResult<EntityType> {
        self.tx.single(ConceptRequest::PutEntityType {
            label: Label::new(label),
        })
    }

    pub fn put_relation_type(&self, label: &str) -> ConceptResult<RelationType> {
        self.tx.single(ConceptRequest::PutRelationType {
            label: Label::new(label),
        })
    }

    /// Get or define an attribute type; the value type of an existing type must match
    pub fn put_attribute_type(&self, label: &str, value_type: ValueType) -> ConceptResult<AttributeType> {
        self.tx.single(ConceptRequest::PutAttributeType {
            label: Label::new(label),
            value_type,
        })
    }

    fn thing<T: FromConcept>(&self, kind: ConceptKind, iid: &str) -> ConceptResult<Option<T>> {
        self.tx.optional(ConceptRequest::GetThing {
            kind,
            iid: Iid::new(iid),
        })
    }

    pub fn get_entity(&self, iid: &str) -> ConceptResult<Option<Entity>> {
        self.thing(ConceptKind::Entity, iid)
    }

    pub fn get_relation(&self, iid: &str) -> ConceptResult<Option<Relation>> {
        self.thing(ConceptKind::Relation, iid)
    }

    pub fn get_attribute(&self, iid: &str) -> ConceptResult<Option<Attribute>> {
        self.thing(ConceptKind::Attribute, iid)
    }
}
