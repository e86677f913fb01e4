use super::{Thing, ThingCore};
use crate::common::{Iid, Value, ValueType};
use crate::concept::{ConceptStream, Deletable, ThingOps, ThingType, ThingTypeOps};
use crate::connection::Transaction;
use crate::engine::{ConceptHandle, ConceptRequest};
use crate::error::{ConceptError, ConceptResult};
use std::fmt;
use std::hash::{Hash, Hasher};

/// An attribute instance.
///
/// Attributes are content-addressed: within one attribute type, an equal
/// value always names the same instance.
#[derive(Debug, Clone)]
pub struct Attribute {
    core: ThingCore,
    value: Value,
}

impl Attribute {
    pub(crate) fn from_handle(handle: ConceptHandle) -> ConceptResult<Self> {
        let value = handle.value().cloned().ok_or(ConceptError::UnexpectedResponse {
            expected: "attribute value",
            actual: "nothing",
        })?;
        Ok(Self {
            core: ThingCore::new(handle)?,
            value,
        })
    }

    pub fn handle(&self) -> &ConceptHandle {
        self.core.handle()
    }

    pub fn get_value(&self) -> &Value {
        &self.value
    }

    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }

    /// Things owning this attribute, restricted to instances of `owner_type`
    /// and its subtypes when given. The root `thing` type restricts nothing.
    pub fn get_owners(
        &self,
        tx: &Transaction,
        owner_type: Option<&ThingType>,
    ) -> ConceptResult<ConceptStream<Thing>> {
        tx.stream(ConceptRequest::GetAttributeOwners {
            attribute: self.handle().clone(),
            owner_type: owner_type.and_then(|t| t.type_handle()).cloned(),
        })
    }
}

impl ThingOps for Attribute {
    fn thing_handle(&self) -> &ConceptHandle {
        self.core.handle()
    }

    fn get_iid(&self) -> &Iid {
        self.core.iid()
    }
}

impl Deletable for Attribute {
    fn delete(&self, tx: &Transaction) -> ConceptResult<()> {
        self.core.delete(tx)
    }

    fn is_deleted(&self, tx: &Transaction) -> ConceptResult<bool> {
        self.core.is_deleted(tx)
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.get_iid() == other.get_iid()
    }
}

impl Eq for Attribute {}

impl Hash for Attribute {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.get_iid().hash(state);
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handle().rendering())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Label;
    use crate::concept::Labeled;
    use crate::engine::{ConceptId, RawConcept, RawPayload, TransactionId};
    use std::collections::HashSet;

    fn raw_attribute(id: u64, iid: &str, value: Value) -> ConceptHandle {
        let type_ = ConceptHandle::from(RawConcept {
            id: ConceptId(1),
            kind: "attribute_type".to_string(),
            owner: TransactionId(1),
            rendering: "AttributeType[age]".to_string(),
            payload: RawPayload::Type {
                label: Label::new("age"),
                is_root: false,
                is_abstract: false,
                value_type: Some(ValueType::Long),
            },
        });
        ConceptHandle::from(RawConcept {
            id: ConceptId(id),
            kind: "attribute".to_string(),
            owner: TransactionId(1),
            rendering: format!("Attribute[age:{}]", iid),
            payload: RawPayload::Thing {
                iid: Iid::new(iid),
                type_,
                inferred: false,
                value: Some(value),
            },
        })
    }

    #[test]
    fn test_equality_follows_iid() {
        let a = Attribute::from_handle(raw_attribute(10, "0x0a", Value::Long(30))).unwrap();
        let b = Attribute::from_handle(raw_attribute(11, "0x0a", Value::Long(30))).unwrap();
        let c = Attribute::from_handle(raw_attribute(12, "0x0c", Value::Long(31))).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(a.get_value(), &Value::Long(30));
        assert_eq!(a.value_type(), ValueType::Long);
        assert_eq!(a.get_type().unwrap().label(), &Label::new("age"));
    }

    #[test]
    fn test_missing_value_rejected() {
        let handle = raw_attribute(10, "0x0a", Value::Long(1));
        let mut raw = handle_raw(&handle);
        if let RawPayload::Thing { value, .. } = &mut raw.payload {
            *value = None;
        }
        assert_eq!(Attribute::from_handle(ConceptHandle::from(raw)).unwrap_err().code(), "CLI06");
    }

    fn handle_raw(handle: &ConceptHandle) -> RawConcept {
        RawConcept {
            id: handle.id(),
            kind: handle.tag().to_string(),
            owner: handle.owner(),
            rendering: handle.rendering().to_string(),
            payload: handle.payload().clone(),
        }
    }
}
