use super::TypeCore;
use crate::common::{Label, Transitivity};
use crate::concept::{
    ConceptStream, Deletable, Hierarchical, Labeled, Relation, RelationType, Thing, ThingType,
};
use crate::connection::Transaction;
use crate::engine::{ConceptHandle, ConceptKind, ConceptRequest};
use crate::error::{ConceptError, ConceptResult};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A role, scoped by the relation type that declares it (`employment:employee`)
#[derive(Debug, Clone)]
pub struct RoleType {
    core: TypeCore,
}

impl RoleType {
    pub(crate) fn from_handle(handle: ConceptHandle) -> ConceptResult<Self> {
        Ok(Self {
            core: TypeCore::new(handle)?,
        })
    }

    pub fn handle(&self) -> &ConceptHandle {
        self.core.handle()
    }

    pub fn is_root(&self) -> bool {
        self.handle().is_root()
    }

    /// The relation type named by this role's scope
    pub fn get_relation_type(&self, tx: &Transaction) -> ConceptResult<RelationType> {
        let scope = self
            .label()
            .scope()
            .ok_or_else(|| ConceptError::UnexpectedKind(format!("unscoped role '{}'", self.label())))?;
        tx.single(ConceptRequest::GetThingType {
            kind: ConceptKind::RelationType,
            label: Label::new(scope),
        })
    }

    /// Every relation type relating this role, inheriting types included
    pub fn get_relation_types(&self, tx: &Transaction) -> ConceptResult<ConceptStream<RelationType>> {
        tx.stream(ConceptRequest::GetRoleRelationTypes {
            role_type: self.handle().clone(),
        })
    }

    pub fn get_player_types(&self, tx: &Transaction) -> ConceptResult<ConceptStream<ThingType>> {
        self.player_types(tx, Transitivity::Transitive)
    }

    pub fn get_player_types_explicit(&self, tx: &Transaction) -> ConceptResult<ConceptStream<ThingType>> {
        self.player_types(tx, Transitivity::Explicit)
    }

    fn player_types(&self, tx: &Transaction, transitivity: Transitivity) -> ConceptResult<ConceptStream<ThingType>> {
        tx.stream(ConceptRequest::GetPlayerTypes {
            role_type: self.handle().clone(),
            transitivity,
        })
    }

    /// Relations in which this role, or a role overriding it, is played
    pub fn get_relation_instances(&self, tx: &Transaction) -> ConceptResult<ConceptStream<Relation>> {
        self.relation_instances(tx, Transitivity::Transitive)
    }

    pub fn get_relation_instances_explicit(&self, tx: &Transaction) -> ConceptResult<ConceptStream<Relation>> {
        self.relation_instances(tx, Transitivity::Explicit)
    }

    fn relation_instances(&self, tx: &Transaction, transitivity: Transitivity) -> ConceptResult<ConceptStream<Relation>> {
        tx.stream(ConceptRequest::GetRelationInstances {
            role_type: self.handle().clone(),
            transitivity,
        })
    }

    pub fn get_player_instances(&self, tx: &Transaction) -> ConceptResult<ConceptStream<Thing>> {
        self.player_instances(tx, Transitivity::Transitive)
    }

    pub fn get_player_instances_explicit(&self, tx: &Transaction) -> ConceptResult<ConceptStream<Thing>> {
        self.player_instances(tx, Transitivity::Explicit)
    }

    fn player_instances(&self, tx: &Transaction, transitivity: Transitivity) -> ConceptResult<ConceptStream<Thing>> {
        tx.stream(ConceptRequest::GetPlayerInstances {
            role_type: self.handle().clone(),
            transitivity,
        })
    }
}

impl Labeled for RoleType {
    fn label(&self) -> &Label {
        self.core.label()
    }

    fn get_label(&self, tx: &Transaction) -> ConceptResult<Label> {
        self.core.get_label(tx)
    }

    /// Renames the role; the scope stays that of its relation type
    fn set_label(&self, tx: &Transaction, label: &str) -> ConceptResult<()> {
        self.core.set_label(tx, label)
    }
}

impl Deletable for RoleType {
    fn delete(&self, tx: &Transaction) -> ConceptResult<()> {
        self.core.delete(tx)
    }

    fn is_deleted(&self, tx: &Transaction) -> ConceptResult<bool> {
        self.core.is_deleted(tx)
    }
}

impl Hierarchical for RoleType {
    type Kin = RoleType;

    fn get_supertype(&self, tx: &Transaction) -> ConceptResult<Option<RoleType>> {
        self.core.supertype(tx)
    }

    fn get_supertypes(&self, tx: &Transaction) -> ConceptResult<ConceptStream<RoleType>> {
        self.core.supertypes(tx)
    }

    fn get_subtypes_with(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
    ) -> ConceptResult<ConceptStream<RoleType>> {
        self.core.subtypes(tx, transitivity, None)
    }
}

impl PartialEq for RoleType {
    fn eq(&self, other: &Self) -> bool {
        self.handle() == other.handle()
    }
}

impl Eq for RoleType {}

impl Hash for RoleType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle().hash(state);
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handle().rendering())
    }
}
