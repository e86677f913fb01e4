//! Typed concept model
//!
//! Every concept the engine hands back is wrapped exactly once, by
//! [`ConceptFactory::wrap`], into one variant of the closed [`Concept`] union.
//! Shared behaviour is expressed as capability traits ([`Labeled`],
//! [`Deletable`], [`Hierarchical`], [`InstanceContainer`], [`ThingTypeOps`],
//! [`ThingOps`]) implemented per concrete wrapper rather than through a chain
//! of base types.
//!
//! The universal `thing` type has no engine counterpart and is modelled
//! separately as [`RootThingType`].

mod capability;
mod stream;
pub mod thing;
pub mod type_;

pub use capability::{Deletable, Hierarchical, InstanceContainer, Labeled, ThingOps, ThingTypeOps};
pub use stream::ConceptStream;
pub use thing::{Attribute, Entity, HasFilter, Relation, Thing};
pub use type_::{AttributeType, EntityType, RelationType, RoleType, RootThingType, ThingType};

use crate::engine::{ConceptHandle, ConceptKind};
use crate::error::{ConceptError, ConceptResult};
use std::fmt;

/// Any schema or instance concept
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Concept {
    EntityType(EntityType),
    RelationType(RelationType),
    AttributeType(AttributeType),
    RoleType(RoleType),
    Entity(Entity),
    Relation(Relation),
    Attribute(Attribute),
}

impl Concept {
    pub fn kind(&self) -> ConceptKind {
        match self {
            Concept::EntityType(_) => ConceptKind::EntityType,
            Concept::RelationType(_) => ConceptKind::RelationType,
            Concept::AttributeType(_) => ConceptKind::AttributeType,
            Concept::RoleType(_) => ConceptKind::RoleType,
            Concept::Entity(_) => ConceptKind::Entity,
            Concept::Relation(_) => ConceptKind::Relation,
            Concept::Attribute(_) => ConceptKind::Attribute,
        }
    }

    pub fn handle(&self) -> &ConceptHandle {
        match self {
            Concept::EntityType(t) => t.handle(),
            Concept::RelationType(t) => t.handle(),
            Concept::AttributeType(t) => t.handle(),
            Concept::RoleType(t) => t.handle(),
            Concept::Entity(t) => t.handle(),
            Concept::Relation(t) => t.handle(),
            Concept::Attribute(t) => t.handle(),
        }
    }

    /// The engine's canonical rendering, passed through untouched
    pub fn to_display_string(&self) -> String {
        self.handle().rendering().to_string()
    }

    fn mismatch(self, expected: ConceptKind) -> ConceptError {
        ConceptError::UnexpectedKind(format!("{} (expected {})", self.kind().tag(), expected.tag()))
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handle().rendering())
    }
}

/// The single point of kind dispatch
pub struct ConceptFactory;

impl ConceptFactory {
    /// Wrap a handle into the variant matching its kind tag
    pub fn wrap(handle: ConceptHandle) -> ConceptResult<Concept> {
        let concept = match handle.kind()? {
            ConceptKind::EntityType => Concept::EntityType(EntityType::from_handle(handle)?),
            ConceptKind::RelationType => Concept::RelationType(RelationType::from_handle(handle)?),
            ConceptKind::AttributeType => {
                Concept::AttributeType(AttributeType::from_handle(handle)?)
            }
            ConceptKind::RoleType => Concept::RoleType(RoleType::from_handle(handle)?),
            ConceptKind::Entity => Concept::Entity(Entity::from_handle(handle)?),
            ConceptKind::Relation => Concept::Relation(Relation::from_handle(handle)?),
            ConceptKind::Attribute => Concept::Attribute(Attribute::from_handle(handle)?),
        };
        Ok(concept)
    }

    /// Wrap and downcast in one step
    pub fn wrap_as<T: FromConcept>(handle: ConceptHandle) -> ConceptResult<T> {
        Self::wrap(handle).and_then(T::from_concept)
    }
}

/// Downcast from the [`Concept`] union to one typed wrapper
pub trait FromConcept: Sized + Send + 'static {
    fn from_concept(concept: Concept) -> ConceptResult<Self>;
}

impl FromConcept for Concept {
    fn from_concept(concept: Concept) -> ConceptResult<Self> {
        Ok(concept)
    }
}

macro_rules! downcast {
    ($wrapper:ident, $variant:ident) => {
        impl FromConcept for $wrapper {
            fn from_concept(concept: Concept) -> ConceptResult<Self> {
                match concept {
                    Concept::$variant(inner) => Ok(inner),
                    other => Err(other.mismatch(ConceptKind::$variant)),
                }
            }
        }

        impl From<$wrapper> for Concept {
            fn from(inner: $wrapper) -> Self {
                Concept::$variant(inner)
            }
        }
    };
}

downcast!(EntityType, EntityType);
downcast!(RelationType, RelationType);
downcast!(AttributeType, AttributeType);
downcast!(RoleType, RoleType);
downcast!(Entity, Entity);
downcast!(Relation, Relation);
downcast!(Attribute, Attribute);

impl FromConcept for ThingType {
    fn from_concept(concept: Concept) -> ConceptResult<Self> {
        match concept {
            Concept::EntityType(t) => Ok(ThingType::Entity(t)),
            Concept::RelationType(t) => Ok(ThingType::Relation(t)),
            Concept::AttributeType(t) => Ok(ThingType::Attribute(t)),
            other => Err(ConceptError::UnexpectedKind(format!(
                "{} (expected a thing type)",
                other.kind().tag()
            ))),
        }
    }
}

impl FromConcept for Thing {
    fn from_concept(concept: Concept) -> ConceptResult<Self> {
        match concept {
            Concept::Entity(t) => Ok(Thing::Entity(t)),
            Concept::Relation(t) => Ok(Thing::Relation(t)),
            Concept::Attribute(t) => Ok(Thing::Attribute(t)),
            other => Err(ConceptError::UnexpectedKind(format!(
                "{} (expected a thing)",
                other.kind().tag()
            ))),
        }
    }
}
