//! Instances: entities, relations and attributes
//!
//! Things are identified by their iid. Two wrappers for the same instance
//! compare equal however they were obtained.

mod attribute;
mod entity;
mod relation;

pub use attribute::Attribute;
pub use entity::Entity;
pub use relation::Relation;

use super::{AttributeType, ConceptFactory, Deletable, ThingOps};
use crate::common::{Annotation, Iid};
use crate::connection::Transaction;
use crate::engine::{ConceptHandle, ConceptRequest};
use crate::error::{ConceptError, ConceptResult};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Handle plus iid, shared by every instance wrapper
#[derive(Debug, Clone)]
pub(crate) struct ThingCore {
    handle: ConceptHandle,
    iid: Iid,
}

impl ThingCore {
    pub(crate) fn new(handle: ConceptHandle) -> ConceptResult<Self> {
        let iid = handle.iid().cloned().ok_or(ConceptError::UnexpectedResponse {
            expected: "thing",
            actual: "type",
        })?;
        Ok(Self { handle, iid })
    }

    pub(crate) fn handle(&self) -> &ConceptHandle {
        &self.handle
    }

    pub(crate) fn iid(&self) -> &Iid {
        &self.iid
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
}

/// Any instance
#[derive(Debug, Clone)]
pub enum Thing {
    Entity(Entity),
    Relation(Relation),
    Attribute(Attribute),
}

impl Thing {
    /// Wrap a handle known to reference an instance
    pub fn of(handle: ConceptHandle) -> ConceptResult<Thing> {
        ConceptFactory::wrap_as(handle)
    }

    pub fn handle(&self) -> &ConceptHandle {
        self.ops().thing_handle()
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Thing::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_relation(&self) -> Option<&Relation> {
        match self {
            Thing::Relation(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&Attribute> {
        match self {
            Thing::Attribute(a) => Some(a),
            _ => None,
        }
    }

    fn ops(&self) -> &dyn ThingOps {
        match self {
            Thing::Entity(t) => t,
            Thing::Relation(t) => t,
            Thing::Attribute(t) => t,
        }
    }
}

impl From<Entity> for Thing {
    fn from(e: Entity) -> Self {
        Thing::Entity(e)
    }
}

impl From<Relation> for Thing {
    fn from(r: Relation) -> Self {
        Thing::Relation(r)
    }
}

impl From<Attribute> for Thing {
    fn from(a: Attribute) -> Self {
        Thing::Attribute(a)
    }
}

impl Deletable for Thing {
    fn delete(&self, tx: &Transaction) -> ConceptResult<()> {
        self.ops().delete(tx)
    }

    fn is_deleted(&self, tx: &Transaction) -> ConceptResult<bool> {
        self.ops().is_deleted(tx)
    }
}

impl ThingOps for Thing {
    fn thing_handle(&self) -> &ConceptHandle {
        self.ops().thing_handle()
    }

    fn get_iid(&self) -> &Iid {
        self.ops().get_iid()
    }
}

impl PartialEq for Thing {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
            && self.get_iid() == other.get_iid()
    }
}

impl Eq for Thing {}

impl Hash for Thing {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.get_iid().hash(state);
    }
}

impl fmt::Display for Thing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handle().rendering())
    }
}

/// Restriction for [`ThingOps::get_has`].
///
/// At most one of the three forms may be set. Combining them is rejected
/// with [`ConceptError::MultipleFilters`] before any engine call.
#[derive(Debug, Clone, Default)]
pub struct HasFilter {
    attribute_type: Option<AttributeType>,
    attribute_types: Vec<AttributeType>,
    annotations: BTreeSet<Annotation>,
}

impl HasFilter {
    /// No restriction: every owned attribute
    pub fn all() -> Self {
        Self::default()
    }

    pub fn of_type(attribute_type: &AttributeType) -> Self {
        Self::default().attribute_type(attribute_type)
    }

    pub fn of_types(attribute_types: &[AttributeType]) -> Self {
        Self::default().attribute_types(attribute_types)
    }

    pub fn with_annotations(annotations: impl IntoIterator<Item = Annotation>) -> Self {
        Self::default().annotations(annotations)
    }

    pub fn attribute_type(mut self, attribute_type: &AttributeType) -> Self {
        self.attribute_type = Some(attribute_type.clone());
        self
    }

    pub fn attribute_types(mut self, attribute_types: &[AttributeType]) -> Self {
        self.attribute_types.extend(attribute_types.iter().cloned());
        self
    }

    pub fn annotations(mut self, annotations: impl IntoIterator<Item = Annotation>) -> Self {
        self.annotations.extend(annotations);
        self
    }

    /// Engine arguments for this filter, or `MultipleFilters`
    pub(crate) fn resolve(&self) -> ConceptResult<(Vec<ConceptHandle>, Vec<Annotation>)> {
        let forms = [
            self.attribute_type.is_some(),
            !self.attribute_types.is_empty(),
            !self.annotations.is_empty(),
        ];
        if forms.iter().filter(|set| **set).count() > 1 {
            return Err(ConceptError::MultipleFilters);
        }
        let types = match &self.attribute_type {
            Some(t) => vec![t.handle().clone()],
            None => self.attribute_types.iter().map(|t| t.handle().clone()).collect(),
        };
        Ok((types, self.annotations.iter().copied().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Label, ValueType};
    use crate::engine::{ConceptId, RawConcept, RawPayload, TransactionId};

    fn attribute_type(id: u64, label: &str) -> AttributeType {
        let handle = ConceptHandle::from(RawConcept {
            id: ConceptId(id),
            kind: "attribute_type".to_string(),
            owner: TransactionId(1),
            rendering: format!("AttributeType[{}]", label),
            payload: RawPayload::Type {
                label: Label::new(label),
                is_root: false,
                is_abstract: false,
                value_type: Some(ValueType::String),
            },
        });
        ConceptFactory::wrap_as(handle).unwrap()
    }

    #[test]
    fn test_single_filter_forms_resolve() {
        let name = attribute_type(1, "name");
        let email = attribute_type(2, "email");

        let (types, annotations) = HasFilter::all().resolve().unwrap();
        assert!(types.is_empty() && annotations.is_empty());

        let (types, _) = HasFilter::of_type(&name).resolve().unwrap();
        assert_eq!(types, vec![name.handle().clone()]);

        let (types, _) = HasFilter::of_types(&[name.clone(), email.clone()]).resolve().unwrap();
        assert_eq!(types.len(), 2);

        let (_, annotations) = HasFilter::with_annotations([Annotation::Key, Annotation::Key])
            .resolve()
            .unwrap();
        assert_eq!(annotations, vec![Annotation::Key]);
    }

    #[test]
    fn test_combined_filters_rejected() {
        let name = attribute_type(1, "name");
        let err = HasFilter::of_type(&name)
            .annotations([Annotation::Unique])
            .resolve()
            .unwrap_err();
        assert_eq!(err, ConceptError::MultipleFilters);

        let err = HasFilter::of_type(&name)
            .attribute_types(&[name.clone()])
            .resolve()
            .unwrap_err();
        assert_eq!(err, ConceptError::MultipleFilters);
    }
}
