use super::ThingCore;
use crate::common::Iid;
use crate::concept::{Deletable, ThingOps};
use crate::connection::Transaction;
use crate::engine::ConceptHandle;
use crate::error::ConceptResult;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An instance of an entity type
#[derive(Debug, Clone)]
pub struct Entity {
    core: ThingCore,
}

impl Entity {
    pub(crate) fn from_handle(handle: ConceptHandle) -> ConceptResult<Self> {
        Ok(Self {
            core: ThingCore::new(handle)?,
        })
    }

    pub fn handle(&self) -> &ConceptHandle {
        self.core.handle()
    }
}

impl ThingOps for Entity {
    fn thing_handle(&self) -> &ConceptHandle {
        self.core.handle()
    }

    fn get_iid(&self) -> &Iid {
        self.core.iid()
    }
}

impl Deletable for Entity {
    fn delete(&self, tx: &Transaction) -> ConceptResult<()> {
        self.core.delete(tx)
    }

    fn is_deleted(&self, tx: &Transaction) -> ConceptResult<bool> {
        self.core.is_deleted(tx)
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.get_iid() == other.get_iid()
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.get_iid().hash(state);
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handle().rendering())
    }
}
