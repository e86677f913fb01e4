use super::TypeCore;
use crate::common::{Annotation, Label, Transitivity, Value, ValueType};
use crate::concept::{
    Attribute, ConceptStream, Deletable, Hierarchical, InstanceContainer, Labeled, ThingType,
    ThingTypeOps,
};
use crate::connection::Transaction;
use crate::engine::{ConceptHandle, ConceptRequest};
use crate::error::ConceptResult;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A type whose instances are attribute values.
///
/// Equality and hashing use the label only. The root `attribute` type is
/// therefore one identity however it was reached, whatever value type the
/// view carries.
#[derive(Debug, Clone)]
pub struct AttributeType {
    core: TypeCore,
}

impl AttributeType {
    pub(crate) fn from_handle(handle: ConceptHandle) -> ConceptResult<Self> {
        Ok(Self {
            core: TypeCore::new(handle)?,
        })
    }

    pub fn handle(&self) -> &ConceptHandle {
        self.core.handle()
    }

    /// Fixed when the type was defined; `Object` for the root
    pub fn value_type(&self) -> ValueType {
        self.handle().value_type().unwrap_or(ValueType::Object)
    }

    pub fn set_supertype(&self, tx: &Transaction, supertype: &AttributeType) -> ConceptResult<()> {
        self.core.set_supertype(tx, supertype.handle())
    }

    /// Insert-or-fetch: an equal value yields the existing attribute
    pub fn put(&self, tx: &Transaction, value: impl Into<Value>) -> ConceptResult<Attribute> {
        tx.single(ConceptRequest::Put {
            attribute_type: self.handle().clone(),
            value: value.into(),
        })
    }

    /// Fetch without inserting
    pub fn get(&self, tx: &Transaction, value: impl Into<Value>) -> ConceptResult<Option<Attribute>> {
        tx.optional(ConceptRequest::GetByValue {
            attribute_type: self.handle().clone(),
            value: value.into(),
        })
    }

    pub fn get_regex(&self, tx: &Transaction) -> ConceptResult<Option<String>> {
        tx.text(ConceptRequest::GetRegex {
            attribute_type: self.handle().clone(),
        })
    }

    /// Only string attribute types accept a regex; the engine rejects others
    pub fn set_regex(&self, tx: &Transaction, regex: &str) -> ConceptResult<()> {
        tx.done(ConceptRequest::SetRegex {
            attribute_type: self.handle().clone(),
            regex: regex.to_string(),
        })
    }

    pub fn unset_regex(&self, tx: &Transaction) -> ConceptResult<()> {
        tx.done(ConceptRequest::UnsetRegex {
            attribute_type: self.handle().clone(),
        })
    }

    /// Thing types owning this attribute type, with every given annotation
    pub fn get_owners(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
        annotations: &[Annotation],
    ) -> ConceptResult<ConceptStream<ThingType>> {
        tx.stream(ConceptRequest::GetOwnerTypes {
            attribute_type: self.handle().clone(),
            transitivity,
            annotations: annotations.to_vec(),
        })
    }

    pub fn get_owners_explicit(&self, tx: &Transaction) -> ConceptResult<ConceptStream<ThingType>> {
        self.get_owners(tx, Transitivity::Explicit, &[])
    }

    /// Transitive subtypes carrying `value_type`
    pub fn get_subtypes_with_value_type(
        &self,
        tx: &Transaction,
        value_type: ValueType,
    ) -> ConceptResult<ConceptStream<AttributeType>> {
        self.core.subtypes(tx, Transitivity::Transitive, Some(value_type))
    }
}

impl Labeled for AttributeType {
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

impl Deletable for AttributeType {
    fn delete(&self, tx: &Transaction) -> ConceptResult<()> {
        self.core.delete(tx)
    }

    fn is_deleted(&self, tx: &Transaction) -> ConceptResult<bool> {
        self.core.is_deleted(tx)
    }
}

impl Hierarchical for AttributeType {
    type Kin = AttributeType;

    fn get_supertype(&self, tx: &Transaction) -> ConceptResult<Option<AttributeType>> {
        self.core.supertype(tx)
    }

    fn get_supertypes(&self, tx: &Transaction) -> ConceptResult<ConceptStream<AttributeType>> {
        self.core.supertypes(tx)
    }

    fn get_subtypes_with(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
    ) -> ConceptResult<ConceptStream<AttributeType>> {
        self.core.subtypes(tx, transitivity, None)
    }
}

impl InstanceContainer for AttributeType {
    type Instance = Attribute;

    fn get_instances_with(
        &self,
        tx: &Transaction,
        transitivity: Transitivity,
    ) -> ConceptResult<ConceptStream<Attribute>> {
        self.core.instances(tx, transitivity)
    }
}

impl ThingTypeOps for AttributeType {
    fn type_handle(&self) -> Option<&ConceptHandle> {
        Some(self.handle())
    }
}

impl PartialEq for AttributeType {
    fn eq(&self, other: &Self) -> bool {
        self.label() == other.label()
    }
}

impl Eq for AttributeType {}

impl Hash for AttributeType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label().hash(state);
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handle().rendering())
    }
}
