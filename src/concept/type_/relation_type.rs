use super::TypeCore;
use crate::common::{Label, Transitivity};
use crate::concept::{
    ConceptStream, Deletable, Hierarchical, InstanceContainer, Labeled, Relation, RoleType,
    ThingTypeOps,
};
use crate::connection::Transaction;
use crate::engine::{ConceptHandle, ConceptRequest};
use crate::error::ConceptResult;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A type whose instances are relations between role players
#[derive(Debug, Clone)]
pub struct RelationType {
    core: TypeCore,
}

impl RelationType {
    pub(crate) fn from_handle(handle: ConceptHandle) -> ConceptResult<Self> {
        Ok(Self {
            core: TypeCore::new(handle)?,
        })
    }

    pub fn handle(&self) -> &ConceptHandle {
        self.core.handle()
    }

    pub fn create(&self, tx: &Transaction) -> ConceptResult<Relation> {
        tx.single(ConceptRequest::Create {
            type_: self.handle().clone(),
        })
    }

    pub fn set_supertype(&self, tx: &Transaction, supertype: &RelationType) -> ConceptResult<()> {
        self.core.set_supertype(tx, supertype.handle())
    }

    /// Declare the role `role_label`, optionally narrowing the role named
    /// `overridden_label` that this type already relates
    pub fn set_relates(
        &self,
        tx: &Transaction,
        role_label: &str,
        overridden_label: Option<&str>,
    ) -> ConceptResult<()> {
        tx.done(ConceptRequest::SetRelates {
            relation_type: self.handle().clone(),
            role_label: role_label.to_string(),
            overridden_label: overridden_label.map(str::to_string),
        })
    }

    pub fn unset_relates(&self, tx: &Transaction, role_label: &str) -> ConceptResult<()> {
        tx.done(ConceptRequest::UnsetRelates {
            relation_type: self.handle().clone(),
            role_label: role_label.to_string(),
        })
    }

    /// Every role this type relates, inherited ones included
    pub fn get_relates(&self, tx: &Transaction) -> ConceptResult<ConceptStream<RoleType>> {
        self.relates(tx, Transitivity::Transitive)
    }

    /// Roles declared by this type itself
    pub fn get_relates_explicit(&self, tx: &Transaction) -> ConceptResult<ConceptStream<RoleType>> {
        self.relates(tx, Transitivity::Explicit)
    }

    fn relates(&self, tx: &Transaction, transitivity: Transitivity) -> ConceptResult<ConceptStream<RoleType>> {
        tx.stream(ConceptRequest::GetRelates {
            relation_type: self.handle().clone(),
            role_label: None,
            transitivity,
        })
    }

    /// The role named `role_label`, declared or inherited
    pub fn get_relates_for(&self, tx: &Transaction, role_label: &str) -> ConceptResult<Option<RoleType>> {
        tx.optional(ConceptRequest::GetRelates {
            relation_type: self.handle().clone(),
            role_label: Some(role_label.to_string()),
            transitivity: Transitivity::Transitive,
        })
    }

    /// The role that `role_label` overrides, if any
    pub fn get_relates_overridden(
        &self,
        tx: &Transaction,
        role_label: &str,
    ) -> ConceptResult<Option<RoleType>> {
        tx.optional(ConceptRequest::GetRelatesOverridden {
            relation_type: self.handle().clone(),
            role_label: role_label.to_string(),
        })
    }
}

impl Labeled for RelationType {
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

impl Deletable for RelationType {
    fn delete(&self, tx: &Transaction) -> ConceptResult<()> {
        self.core.delete(tx)
    }

    fn is_deleted(&self, tx: &Transaction) -> ConceptResult<bool> {
        self.core.is_deleted(tx)
    }
}

impl Hierarchical for RelationType {
    type Kin = RelationType;

    fn get_supertype(&self, tx: &Transaction) -> ConceptResult<Option<RelationType>> {
        self.core.supertype(tx)
    }

    fn get_supertypes(&self, tx: &Transaction) -> ConceptResult<ConceptStream<RelationType>> {
        self.core.supertypes(tx)
    }

    fn get_subtypes_with(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
    ) -> ConceptResult<ConceptStream<RelationType>> {
        self.core.subtypes(tx, transitivity, None)
    }
}

impl InstanceContainer for RelationType {
    type Instance = Relation;

    fn get_instances_with(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
    ) -> ConceptResult<ConceptStream<Relation>> {
        self.core.instances(tx, transitivity)
    }
}

impl ThingTypeOps for RelationType {
    fn type_handle(&self) -> Option<&ConceptHandle> {
        Some(self.handle())
    }
}

impl PartialEq for RelationType {
    fn eq(&self, other: &Self) -> bool {
        self.handle() == other.handle()
    }
}

impl Eq for RelationType {}

impl Hash for RelationType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle().hash(state);
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handle().rendering())
    }
}
