//! Schema types
//!
//! Each concrete type wraps a [`TypeCore`], which owns the engine handle and
//! the label captured when the wrapper was created. [`ThingType`] is the
//! union over every thing type, including the synthesized root.

mod attribute_type;
mod entity_type;
mod relation_type;
mod role_type;
mod root;

pub use attribute_type::AttributeType;
pub use entity_type::EntityType;
pub use relation_type::RelationType;
pub use role_type::RoleType;
pub use root::RootThingType;

use super::{
    ConceptStream, Deletable, FromConcept, Hierarchical, InstanceContainer, Labeled, Thing,
    ThingTypeOps,
};
use crate::common::{Label, Transitivity, ValueType};
use crate::connection::Transaction;
use crate::engine::{ConceptHandle, ConceptRequest};
use crate::error::{ConceptError, ConceptResult};
use std::fmt;

/// Handle plus label snapshot, shared by every handle-backed type
#[derive(Debug, Clone)]
pub(crate) struct TypeCore {
    handle: ConceptHandle,
    label: Label,
}

impl TypeCore {
    pub(crate) fn new(handle: ConceptHandle) -> ConceptResult<Self> {
        let label = handle
            .label()
            .cloned()
            .ok_or(ConceptError::UnexpectedResponse {
                expected: "type",
                actual: "thing",
            })?;
        Ok(Self { handle, label })
    }

    pub(crate) fn handle(&self) -> &ConceptHandle {
        &self.handle
    }

    pub(crate) fn label(&self) -> &Label {
        &self.label
    }

    pub(crate) fn get_label(&self, tx: &Transaction) -> ConceptResult<Label> {
        tx.text(ConceptRequest::GetLabel {
            type_: self.handle.clone(),
        })?
        .as_deref()
        .map(Label::parse)
        .ok_or(ConceptError::UnexpectedResponse {
            expected: "label",
            actual: "nothing",
        })
    }

    pub(crate) fn set_label(&self, tx: &Transaction, label: &str) -> ConceptResult<()> {
        tx.done(ConceptRequest::SetLabel {
            type_: self.handle.clone(),
            label: Label::new(label),
        })
    }

    pub(crate) fn delete(&self, tx: &Transaction) -> ConceptResult<()> {
        tx.done(ConceptRequest::Delete {
            concept: self.handle.clone(),
        })
    }

    pub(crate) fn is_deleted(&self, tx: &Transaction) -> ConceptResult<bool> {
        tx.flag(ConceptRequest::IsDeleted {
            concept: self.handle.clone(),
        })
    }

    pub(crate) fn set_supertype(&self, tx: &Transaction, supertype: &ConceptHandle) -> ConceptResult<()> {
        tx.done(ConceptRequest::SetSupertype {
            type_: self.handle.clone(),
            supertype: supertype.clone(),
        })
    }

    pub(crate) fn supertype<T: FromConcept>(&self, tx: &Transaction) -> ConceptResult<Option<T>> {
        tx.optional(ConceptRequest::GetSupertype {
            type_: self.handle.clone(),
        })
    }

    pub(crate) fn supertypes<T: FromConcept>(&self, tx: &Transaction) -> ConceptResult<ConceptStream<T>> {
        tx.stream(ConceptRequest::GetSupertypes {
            type_: self.handle.clone(),
        })
    }

    pub(crate) fn subtypes<T: FromConcept>(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
        value_type: Option<ValueType>,
    ) -> ConceptResult<ConceptStream<T>> {
        tx.stream(ConceptRequest::GetSubtypes {
            type_: self.handle.clone(),
            transitivity,
            value_type,
        })
    }

    pub(crate) fn instances<T: FromConcept>(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
    ) -> ConceptResult<ConceptStream<T>> {
        tx.stream(ConceptRequest::GetInstances {
            type_: self.handle.clone(),
            transitivity,
        })
    }
}

/// Any thing type, including the synthesized root `thing`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ThingType {
    Root(RootThingType),
    Entity(EntityType),
    Relation(RelationType),
    Attribute(AttributeType),
}

impl ThingType {
    fn ops(&self) -> &dyn ThingTypeOps {
        match self {
            ThingType::Root(t) => t,
            ThingType::Entity(t) => t,
            ThingType::Relation(t) => t,
            ThingType::Attribute(t) => t,
        }
    }
}

impl From<RootThingType> for ThingType {
    fn from(t: RootThingType) -> Self {
        ThingType::Root(t)
    }
}

impl From<EntityType> for ThingType {
    fn from(t: EntityType) -> Self {
        ThingType::Entity(t)
    }
}

impl From<RelationType> for ThingType {
    fn from(t: RelationType) -> Self {
        ThingType::Relation(t)
    }
}

impl From<AttributeType> for ThingType {
    fn from(t: AttributeType) -> Self {
        ThingType::Attribute(t)
    }
}

/// Lift a typed stream into the `ThingType` union
fn widen<T: Into<ThingType> + Send + 'static>(stream: ConceptStream<T>) -> ConceptStream<ThingType> {
    stream.map_ok(|t| Ok(t.into()))
}

impl Labeled for ThingType {
    fn label(&self) -> &Label {
        self.ops().label()
    }

    fn get_label(&self, tx: &Transaction) -> ConceptResult<Label> {
        self.ops().get_label(tx)
    }

    fn set_label(&self, tx: &Transaction, label: &str) -> ConceptResult<()> {
        self.ops().set_label(tx, label)
    }
}

impl Deletable for ThingType {
    fn delete(&self, tx: &Transaction) -> ConceptResult<()> {
        self.ops().delete(tx)
    }

    fn is_deleted(&self, tx: &Transaction) -> ConceptResult<bool> {
        self.ops().is_deleted(tx)
    }
}

impl Hierarchical for ThingType {
    type Kin = ThingType;

    fn get_supertype(&self, tx: &Transaction) -> ConceptResult<Option<ThingType>> {
        Ok(match self {
            ThingType::Root(t) => t.get_supertype(tx)?,
            ThingType::Entity(t) => t.get_supertype(tx)?.map(ThingType::from),
            ThingType::Relation(t) => t.get_supertype(tx)?.map(ThingType::from),
            ThingType::Attribute(t) => t.get_supertype(tx)?.map(ThingType::from),
        })
    }

    fn get_supertypes(&self, tx: &Transaction) -> ConceptResult<ConceptStream<ThingType>> {
        Ok(match self {
            ThingType::Root(t) => t.get_supertypes(tx)?,
            ThingType::Entity(t) => widen(t.get_supertypes(tx)?),
            ThingType::Relation(t) => widen(t.get_supertypes(tx)?),
            ThingType::Attribute(t) => widen(t.get_supertypes(tx)?),
        })
    }

    fn get_subtypes_with(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
    ) -> ConceptResult<ConceptStream<ThingType>> {
        Ok(match self {
            ThingType::Root(t) => t.get_subtypes_with(tx, transitivity)?,
            ThingType::Entity(t) => widen(t.get_subtypes_with(tx, transitivity)?),
            ThingType::Relation(t) => widen(t.get_subtypes_with(tx, transitivity)?),
            ThingType::Attribute(t) => widen(t.get_subtypes_with(tx, transitivity)?),
        })
    }
}

impl InstanceContainer for ThingType {
    type Instance = Thing;

    fn get_instances_with(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
    ) -> ConceptResult<ConceptStream<Thing>> {
        match self {
            ThingType::Root(t) => t.get_instances_with(tx, transitivity),
            ThingType::Entity(t) => Ok(t.get_instances_with(tx, transitivity)?.map_ok(|e| Ok(e.into()))),
            ThingType::Relation(t) => Ok(t.get_instances_with(tx, transitivity)?.map_ok(|r| Ok(r.into()))),
            ThingType::Attribute(t) => Ok(t.get_instances_with(tx, transitivity)?.map_ok(|a| Ok(a.into()))),
        }
    }
}

impl ThingTypeOps for ThingType {
    fn type_handle(&self) -> Option<&ConceptHandle> {
        self.ops().type_handle()
    }
}

impl fmt::Display for ThingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThingType::Root(t) => fmt::Display::fmt(t, f),
            ThingType::Entity(t) => fmt::Display::fmt(t, f),
            ThingType::Relation(t) => fmt::Display::fmt(t, f),
            ThingType::Attribute(t) => fmt::Display::fmt(t, f),
        }
    }
}
