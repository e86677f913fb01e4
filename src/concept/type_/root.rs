use super::ThingType;
use crate::common::{Label, Transitivity};
use crate::concept::{
    ConceptStream, Deletable, Hierarchical, InstanceContainer, Labeled, Thing, ThingTypeOps,
};
use crate::connection::Transaction;
use crate::engine::{ConceptHandle, ROOT_THING};
use crate::error::{ConceptError, ConceptResult};
use std::fmt;
use std::sync::OnceLock;

static ROOT_LABEL: OnceLock<Label> = OnceLock::new();

/// The universal `thing` type.
///
/// The engine has no concept for it: the three kind roots (`entity`,
/// `relation`, `attribute`) have no supertype there. Reads are answered by
/// combining those roots; every mutation fails with
/// [`ConceptError::RootThingType`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RootThingType;

impl RootThingType {
    fn roots(tx: &Transaction) -> ConceptResult<[ThingType; 3]> {
        let concepts = tx.concepts();
        Ok([
            concepts.get_root_entity_type()?.into(),
            concepts.get_root_relation_type()?.into(),
            concepts.get_root_attribute_type()?.into(),
        ])
    }
}

impl Labeled for RootThingType {
    fn label(&self) -> &Label {
        ROOT_LABEL.get_or_init(|| Label::new(ROOT_THING))
    }

    fn get_label(&self, tx: &Transaction) -> ConceptResult<Label> {
        tx.ensure_open()?;
        Ok(self.label().clone())
    }

    fn set_label(&self, tx: &Transaction, _label: &str) -> ConceptResult<()> {
        tx.ensure_open()?;
        Err(ConceptError::RootThingType("set_label"))
    }
}

impl Deletable for RootThingType {
    fn delete(&self, tx: &Transaction) -> ConceptResult<()> {
        tx.ensure_open()?;
        Err(ConceptError::RootThingType("delete"))
    }

    fn is_deleted(&self, tx: &Transaction) -> ConceptResult<bool> {
        tx.ensure_open()?;
        Ok(false)
    }
}

impl Hierarchical for RootThingType {
    type Kin = ThingType;

    fn get_supertype(&self, tx: &Transaction) -> ConceptResult<Option<ThingType>> {
        tx.ensure_open()?;
        Ok(None)
    }

    fn get_supertypes(&self, tx: &Transaction) -> ConceptResult<ConceptStream<ThingType>> {
        tx.ensure_open()?;
        Ok(ConceptStream::once(ThingType::Root(*self)))
    }

    /// Transitively: `thing` itself, then every entity, relation and
    /// attribute type in that order. Explicitly: the three kind roots.
    fn get_subtypes_with(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
    ) -> ConceptResult<ConceptStream<ThingType>> {
        let [entity, relation, attribute] = Self::roots(tx)?;
        match transitivity {
            Transitivity::Explicit => Ok(ConceptStream::new(
                vec![Ok(entity), Ok(relation), Ok(attribute)].into_iter(),
            )),
            Transitivity::Transitive => {
                let mut stream = ConceptStream::once(ThingType::Root(*self));
                for root in [entity, relation, attribute] {
                    stream = stream.chain(root.get_subtypes(tx)?);
                }
                Ok(stream)
            }
        }
    }
}

impl InstanceContainer for RootThingType {
    type Instance = Thing;

    /// No thing is a direct instance of `thing`, so the explicit form is empty.
    /// The transitive form holds things only; `thing` itself is a type and is
    /// listed by `get_subtypes` instead.
    fn get_instances_with(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
    ) -> ConceptResult<ConceptStream<Thing>> {
        match transitivity {
            Transitivity::Explicit => tx.ensure_open().map(|_| ConceptStream::empty()),
            Transitivity::Transitive => {
                let [entity, relation, attribute] = Self::roots(tx)?;
                Ok(entity
                    .get_instances(tx)?
                    .chain(relation.get_instances(tx)?)
                    .chain(attribute.get_instances(tx)?))
            }
        }
    }
}

impl ThingTypeOps for RootThingType {
    fn type_handle(&self) -> Option<&ConceptHandle> {
        None
    }
}

impl fmt::Display for RootThingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThingType[{}]", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_identity() {
        let root = RootThingType;
        assert_eq!(root.label(), &Label::new("thing"));
        assert!(root.is_root());
        assert!(root.is_abstract());
        assert_eq!(ThingType::from(root), ThingType::Root(RootThingType::default()));
        assert_eq!(root.to_string(), "ThingType[thing]");
    }
}
