//! Capability traits shared by the concrete wrappers

use super::{
    Attribute, AttributeType, ConceptFactory, ConceptStream, HasFilter, Relation, RoleType, Thing,
    ThingType,
};
use crate::common::{Annotation, Iid, Label, Transitivity, ValueType};
use crate::connection::Transaction;
use crate::engine::{ConceptHandle, ConceptRequest};
use crate::error::{ConceptError, ConceptResult};

/// Types that carry a label
pub trait Labeled {
    /// The label as it was when this wrapper was created.
    ///
    /// Labels can be renamed within a transaction; use
    /// [`Labeled::get_label`] for the current one.
    fn label(&self) -> &Label;

    /// The current label, always re-queried
    fn get_label(&self, tx: &Transaction) -> ConceptResult<Label>;

    fn set_label(&self, tx: &Transaction, label: &str) -> ConceptResult<()>;
}

pub trait Deletable {
    fn delete(&self, tx: &Transaction) -> ConceptResult<()>;

    /// Deletion state local to `tx`; re-check after a rollback
    fn is_deleted(&self, tx: &Transaction) -> ConceptResult<bool>;
}

/// Types with a supertype chain
pub trait Hierarchical {
    /// What the hierarchy is made of
    type Kin;

    fn get_supertype(&self, tx: &Transaction) -> ConceptResult<Option<Self::Kin>>;

    /// This type followed by its ancestors, nearest first
    fn get_supertypes(&self, tx: &Transaction) -> ConceptResult<ConceptStream<Self::Kin>>;

    fn get_subtypes_with(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
    ) -> ConceptResult<ConceptStream<Self::Kin>>;

    /// This type and every descendant
    fn get_subtypes(&self, tx: &Transaction) -> ConceptResult<ConceptStream<Self::Kin>> {
        self.get_subtypes_with(tx, Transitivity::Transitive)
    }

    /// Direct children only
    fn get_subtypes_explicit(&self, tx: &Transaction) -> ConceptResult<ConceptStream<Self::Kin>> {
        self.get_subtypes_with(tx, Transitivity::Explicit)
    }
}

/// Types whose instances can be enumerated
pub trait InstanceContainer {
    type Instance;

    fn get_instances_with(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
    ) -> ConceptResult<ConceptStream<Self::Instance>>;

    /// Instances of this type and of every subtype
    fn get_instances(&self, tx: &Transaction) -> ConceptResult<ConceptStream<Self::Instance>> {
        self.get_instances_with(tx, Transitivity::Transitive)
    }

    fn get_instances_explicit(
        &self,
        tx: &Transaction,
    ) -> ConceptResult<ConceptStream<Self::Instance>> {
        self.get_instances_with(tx, Transitivity::Explicit)
    }
}

/// The ownership and role-playing surface of a thing type.
///
/// Implementors only expose their engine handle. The root `thing` type has
/// none: its queries answer with nothing and its mutations fail with
/// [`ConceptError::RootThingType`].
pub trait ThingTypeOps: Labeled + Deletable {
    /// Engine handle, absent for the synthesized root
    fn type_handle(&self) -> Option<&ConceptHandle>;

    fn is_root(&self) -> bool {
        self.type_handle().map(ConceptHandle::is_root).unwrap_or(true)
    }

    /// Abstractness as of when the wrapper was created
    fn is_abstract(&self) -> bool {
        self.type_handle().map(ConceptHandle::is_abstract).unwrap_or(true)
    }

    fn set_abstract(&self, tx: &Transaction) -> ConceptResult<()> {
        let type_ = owned_handle(self, tx, "set_abstract")?;
        tx.done(ConceptRequest::SetAbstract { type_ })
    }

    fn unset_abstract(&self, tx: &Transaction) -> ConceptResult<()> {
        let type_ = owned_handle(self, tx, "unset_abstract")?;
        tx.done(ConceptRequest::UnsetAbstract { type_ })
    }

    /// Declare that instances may own attributes of `attribute_type`.
    ///
    /// `overridden` narrows an inherited ownership; annotations are passed
    /// to the engine as given.
    fn set_owns(
        &self,
        tx: &Transaction,
        attribute_type: &AttributeType,
        overridden: Option<&AttributeType>,
        annotations: &[Annotation],
    ) -> ConceptResult<()> {
        let owner = owned_handle(self, tx, "set_owns")?;
        tx.done(ConceptRequest::SetOwns {
            owner,
            attribute_type: attribute_type.handle().clone(),
            overridden: overridden.map(|t| t.handle().clone()),
            annotations: annotations.to_vec(),
        })
    }

    fn unset_owns(&self, tx: &Transaction, attribute_type: &AttributeType) -> ConceptResult<()> {
        let owner = owned_handle(self, tx, "unset_owns")?;
        tx.done(ConceptRequest::UnsetOwns {
            owner,
            attribute_type: attribute_type.handle().clone(),
        })
    }

    /// Owned attribute types; all supplied filters must hold
    fn get_owns(
        &self,
        tx: &Transaction,
        value_type: Option<ValueType>,
        transitivity: Transitivity,
        annotations: &[Annotation],
    ) -> ConceptResult<ConceptStream<AttributeType>> {
        match self.type_handle() {
            Some(owner) => tx.stream(ConceptRequest::GetOwns {
                owner: owner.clone(),
                value_type,
                transitivity,
                annotations: annotations.to_vec(),
            }),
            None => tx.ensure_open().map(|_| ConceptStream::empty()),
        }
    }

    fn get_owns_explicit(&self, tx: &Transaction) -> ConceptResult<ConceptStream<AttributeType>> {
        self.get_owns(tx, None, Transitivity::Explicit, &[])
    }

    fn get_owns_overridden(
        &self,
        tx: &Transaction,
        attribute_type: &AttributeType,
    ) -> ConceptResult<Option<AttributeType>> {
        match self.type_handle() {
            Some(owner) => tx.optional(ConceptRequest::GetOwnsOverridden {
                owner: owner.clone(),
                attribute_type: attribute_type.handle().clone(),
            }),
            None => tx.ensure_open().map(|_| None),
        }
    }

    fn set_plays(
        &self,
        tx: &Transaction,
        role_type: &RoleType,
        overridden: Option<&RoleType>,
    ) -> ConceptResult<()> {
        let player = owned_handle(self, tx, "set_plays")?;
        tx.done(ConceptRequest::SetPlays {
            player,
            role_type: role_type.handle().clone(),
            overridden: overridden.map(|r| r.handle().clone()),
        })
    }

    fn unset_plays(&self, tx: &Transaction, role_type: &RoleType) -> ConceptResult<()> {
        let player = owned_handle(self, tx, "unset_plays")?;
        tx.done(ConceptRequest::UnsetPlays {
            player,
            role_type: role_type.handle().clone(),
        })
    }

    fn get_plays(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
    ) -> ConceptResult<ConceptStream<RoleType>> {
        match self.type_handle() {
            Some(player) => tx.stream(ConceptRequest::GetPlays {
                player: player.clone(),
                transitivity,
            }),
            None => tx.ensure_open().map(|_| ConceptStream::empty()),
        }
    }

    fn get_plays_explicit(&self, tx: &Transaction) -> ConceptResult<ConceptStream<RoleType>> {
        self.get_plays(tx, Transitivity::Explicit)
    }

    fn get_plays_overridden(&self, tx: &Transaction, role_type: &RoleType) -> ConceptResult<Option<RoleType>> {
        match self.type_handle() {
            Some(player) => tx.optional(ConceptRequest::GetPlaysOverridden {
                player: player.clone(),
                role_type: role_type.handle().clone(),
            }),
            None => tx.ensure_open().map(|_| None),
        }
    }

    /// Schema definition of this type, as rendered by the engine
    fn get_syntax(&self, tx: &Transaction) -> ConceptResult<String> {
        let type_ = owned_handle(self, tx, "get_syntax")?;
        tx.text(ConceptRequest::GetSyntax { type_ })?
            .ok_or(ConceptError::UnexpectedResponse {
                expected: "syntax",
                actual: "nothing",
            })
    }
}

/// A closed transaction is reported before the root's immutability
fn owned_handle<T: ThingTypeOps + ?Sized>(
    type_: &T,
    tx: &Transaction,
    operation: &'static str,
) -> ConceptResult<ConceptHandle> {
    match type_.type_handle() {
        Some(handle) => Ok(handle.clone()),
        None => {
            tx.ensure_open()?;
            Err(ConceptError::RootThingType(operation))
        }
    }
}

/// Behaviour shared by every instance
pub trait ThingOps: Deletable {
    fn thing_handle(&self) -> &ConceptHandle;

    fn get_iid(&self) -> &Iid;

    /// The type this thing was created as
    fn get_type(&self) -> ConceptResult<ThingType> {
        let type_ = self
            .thing_handle()
            .thing_type()
            .cloned()
            .ok_or(ConceptError::NullHandle)?;
        ConceptFactory::wrap_as(type_)
    }

    fn is_inferred(&self) -> bool {
        self.thing_handle().is_inferred()
    }

    /// Owned attributes, optionally restricted by exactly one filter form
    fn get_has(&self, tx: &Transaction, filter: &HasFilter) -> ConceptResult<ConceptStream<Attribute>> {
        let (attribute_types, annotations) = filter.resolve()?;
        tx.stream(ConceptRequest::GetHas {
            thing: self.thing_handle().clone(),
            attribute_types,
            annotations,
        })
    }

    /// Relations in which this thing plays any of `role_types` (any role if empty)
    fn get_relations(&self, tx: &Transaction, role_types: &[RoleType]) -> ConceptResult<ConceptStream<Relation>> {
        tx.stream(ConceptRequest::GetRelations {
            thing: self.thing_handle().clone(),
            role_types: role_types.iter().map(|r| r.handle().clone()).collect(),
        })
    }

    fn get_playing(&self, tx: &Transaction) -> ConceptResult<ConceptStream<RoleType>> {
        tx.stream(ConceptRequest::GetPlaying {
            thing: self.thing_handle().clone(),
        })
    }

    fn set_has(&self, tx: &Transaction, attribute: &Attribute) -> ConceptResult<()> {
        tx.done(ConceptRequest::SetHas {
            thing: self.thing_handle().clone(),
            attribute: attribute.handle().clone(),
        })
    }

    fn unset_has(&self, tx: &Transaction, attribute: &Attribute) -> ConceptResult<()> {
        tx.done(ConceptRequest::UnsetHas {
            thing: self.thing_handle().clone(),
            attribute: attribute.handle().clone(),
        })
    }

    /// This instance as the [`Thing`] union
    fn as_thing(&self) -> ConceptResult<Thing> {
        Thing::of(self.thing_handle().clone())
    }
}
