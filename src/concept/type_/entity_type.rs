use super::TypeCore;
use crate::common::{Label, Transitivity};
use crate::concept::{
    ConceptStream, Deletable, Entity, Hierarchical, InstanceContainer, Labeled, ThingTypeOps,
};
use crate::connection::Transaction;
use crate::engine::{ConceptHandle, ConceptRequest};
use crate::error::ConceptResult;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A type whose instances are entities
#[derive(Debug, Clone)]
pub struct EntityType {
    core: TypeCore,
}

impl EntityType {
    pub(crate) fn from_handle(handle: ConceptHandle) -> ConceptResult<Self> {
        Ok(Self {
            core: TypeCore::new(handle)?,
        })
    }

    pub fn handle(&self) -> &ConceptHandle {
        self.core.handle()
    }

    /// Create a new entity; fails with `AbstractType` if this type is abstract
    pub fn create(&self, tx: &Transaction) -> ConceptResult<Entity> {
        tx.single(ConceptRequest::Create {
            type_: self.handle().clone(),
        })
    }

    pub fn set_supertype(&self, tx: &Transaction, supertype: &EntityType) -> ConceptResult<()> {
        self.core.set_supertype(tx, supertype.handle())
    }
}

impl Labeled for EntityType {
    fn label(&self) -> &Label {
        self.core.label()
    }

    fn get_label(&self, tx: &Transaction) -> ConceptResult<Label> {
        self.core.get_label(tx)
    }

    fn set_label(&self, tx: &Transaction, label: &str) -> ConceptResult<()> {
        self.core.set_label(tx, label)
    }
}

impl Deletable for EntityType {
    fn delete(&self, tx: &Transaction) -> ConceptResult<()> {
        self.core.delete(tx)
    }

    fn is_deleted(&self, tx: &Transaction) -> ConceptResult<bool> {
        self.core.is_deleted(tx)
    }
}

impl Hierarchical for EntityType {
    type Kin = EntityType;

    fn get_supertype(&self, tx: &Transaction) -> ConceptResult<Option<EntityType>> {
        self.core.supertype(tx)
    }

    fn get_supertypes(&self, tx: &Transaction) -> ConceptResult<ConceptStream<EntityType>> {
        self.core.supertypes(tx)
    }

    fn get_subtypes_with(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
    ) -> ConceptResult<ConceptStream<EntityType>> {
        self.core.subtypes(tx, transitivity, None)
    }
}

impl InstanceContainer for EntityType {
    type Instance = Entity;

    fn get_instances_with(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
    ) -> ConceptResult<ConceptStream<Entity>> {
        self.core.instances(tx, transitivity)
    }
}

impl ThingTypeOps for EntityType {
    fn type_handle(&self) -> Option<&ConceptHandle> {
        Some(self.handle())
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.handle() == other.handle()
    }
}

impl Eq for EntityType {}

impl Hash for EntityType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle().hash(state);
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handle().rendering())
    }
}
