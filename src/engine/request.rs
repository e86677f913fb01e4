//! Opcodes and responses exchanged with a transaction
//!
//! Every typed operation in the concept layer becomes exactly one
//! [`ConceptRequest`]. Arguments that refer to concepts are passed as
//! [`ConceptHandle`]s unwrapped from the calling wrappers.

use super::error::EngineResult;
use super::handle::{ConceptHandle, ConceptKind, RawConcept};
use crate::common::{Annotation, Iid, Label, Transitivity, Value, ValueType};
use crate::error::{ConceptError, ConceptResult};
use std::fmt;

/// Single-pass producer of engine results.
///
/// A cursor is not restartable. Once its transaction closes every further
/// call fails with [`super::EngineError::TransactionClosed`].
pub trait Cursor<T>: Send {
    fn next(&mut self) -> EngineResult<Option<T>>;
}

/// One engine operation
#[derive(Debug, Clone)]
pub enum ConceptRequest {
    // Concept manager
    GetThingType { kind: ConceptKind, label: Label },
    PutEntityType { label: Label },
    PutRelationType { label: Label },
    PutAttributeType { label: Label, value_type: ValueType },
    GetThing { kind: ConceptKind, iid: Iid },

    // Any type
    GetLabel { type_: ConceptHandle },
    SetLabel { type_: ConceptHandle, label: Label },
    SetAbstract { type_: ConceptHandle },
    UnsetAbstract { type_: ConceptHandle },
    GetSyntax { type_: ConceptHandle },
    SetSupertype { type_: ConceptHandle, supertype: ConceptHandle },
    GetSupertype { type_: ConceptHandle },
    GetSupertypes { type_: ConceptHandle },
    GetSubtypes {
        type_: ConceptHandle,
        transitivity: Transitivity,
        value_type: Option<ValueType>,
    },
    GetInstances { type_: ConceptHandle, transitivity: Transitivity },

    // Types and things alike
    Delete { concept: ConceptHandle },
    IsDeleted { concept: ConceptHandle },

    // Thing type capabilities
    SetOwns {
        owner: ConceptHandle,
        attribute_type: ConceptHandle,
        overridden: Option<ConceptHandle>,
        annotations: Vec<Annotation>,
    },
    UnsetOwns { owner: ConceptHandle, attribute_type: ConceptHandle },
    GetOwns {
        owner: ConceptHandle,
        value_type: Option<ValueType>,
        transitivity: Transitivity,
        annotations: Vec<Annotation>,
    },
    GetOwnsOverridden { owner: ConceptHandle, attribute_type: ConceptHandle },
    SetPlays {
        player: ConceptHandle,
        role_type: ConceptHandle,
        overridden: Option<ConceptHandle>,
    },
    UnsetPlays { player: ConceptHandle, role_type: ConceptHandle },
    GetPlays { player: ConceptHandle, transitivity: Transitivity },
    GetPlaysOverridden { player: ConceptHandle, role_type: ConceptHandle },
    Create { type_: ConceptHandle },

    // Relation types
    GetRelates {
        relation_type: ConceptHandle,
        role_label: Option<String>,
        transitivity: Transitivity,
    },
    GetRelatesOverridden { relation_type: ConceptHandle, role_label: String },
    SetRelates {
        relation_type: ConceptHandle,
        role_label: String,
        overridden_label: Option<String>,
    },
    UnsetRelates { relation_type: ConceptHandle, role_label: String },

    // Attribute types
    Put { attribute_type: ConceptHandle, value: Value },
    GetByValue { attribute_type: ConceptHandle, value: Value },
    GetRegex { attribute_type: ConceptHandle },
    SetRegex { attribute_type: ConceptHandle, regex: String },
    UnsetRegex { attribute_type: ConceptHandle },
    GetOwnerTypes {
        attribute_type: ConceptHandle,
        transitivity: Transitivity,
        annotations: Vec<Annotation>,
    },

    // Role types
    GetRoleRelationTypes { role_type: ConceptHandle },
    GetPlayerTypes { role_type: ConceptHandle, transitivity: Transitivity },
    GetRelationInstances { role_type: ConceptHandle, transitivity: Transitivity },
    GetPlayerInstances { role_type: ConceptHandle, transitivity: Transitivity },

    // Things
    GetHas {
        thing: ConceptHandle,
        attribute_types: Vec<ConceptHandle>,
        annotations: Vec<Annotation>,
    },
    GetRelations { thing: ConceptHandle, role_types: Vec<ConceptHandle> },
    GetPlaying { thing: ConceptHandle },
    SetHas { thing: ConceptHandle, attribute: ConceptHandle },
    UnsetHas { thing: ConceptHandle, attribute: ConceptHandle },

    // Relations
    AddRolePlayer {
        relation: ConceptHandle,
        role_type: ConceptHandle,
        player: ConceptHandle,
    },
    RemoveRolePlayer {
        relation: ConceptHandle,
        role_type: ConceptHandle,
        player: ConceptHandle,
    },
    GetPlayersByRoleType { relation: ConceptHandle, role_types: Vec<ConceptHandle> },
    GetRolePlayers { relation: ConceptHandle },
    GetRelating { relation: ConceptHandle },

    // Attributes
    GetAttributeOwners { attribute: ConceptHandle, owner_type: Option<ConceptHandle> },
}

impl ConceptRequest {
    /// Whether the request changes the schema
    pub fn is_schema_write(&self) -> bool {
        matches!(
            self,
            ConceptRequest::PutEntityType { .. }
                | ConceptRequest::PutRelationType { .. }
                | ConceptRequest::PutAttributeType { .. }
                | ConceptRequest::SetLabel { .. }
                | ConceptRequest::SetAbstract { .. }
                | ConceptRequest::UnsetAbstract { .. }
                | ConceptRequest::SetSupertype { .. }
                | ConceptRequest::SetOwns { .. }
                | ConceptRequest::UnsetOwns { .. }
                | ConceptRequest::SetPlays { .. }
                | ConceptRequest::UnsetPlays { .. }
                | ConceptRequest::SetRelates { .. }
                | ConceptRequest::UnsetRelates { .. }
                | ConceptRequest::SetRegex { .. }
                | ConceptRequest::UnsetRegex { .. }
        ) || matches!(self, ConceptRequest::Delete { concept } if concept.label().is_some())
    }

    /// Whether the request changes instance data
    pub fn is_data_write(&self) -> bool {
        matches!(
            self,
            ConceptRequest::Create { .. }
                | ConceptRequest::Put { .. }
                | ConceptRequest::SetHas { .. }
                | ConceptRequest::UnsetHas { .. }
                | ConceptRequest::AddRolePlayer { .. }
                | ConceptRequest::RemoveRolePlayer { .. }
        ) || matches!(self, ConceptRequest::Delete { concept } if concept.iid().is_some())
    }

    pub fn is_write(&self) -> bool {
        self.is_schema_write() || self.is_data_write()
    }
}

/// The engine's answer to one [`ConceptRequest`]
pub enum ConceptResponse {
    Done,
    Bool(bool),
    Concept(Option<RawConcept>),
    Text(Option<String>),
    Stream(Box<dyn Cursor<RawConcept>>),
    RolePlayers(Box<dyn Cursor<(RawConcept, RawConcept)>>),
}

impl ConceptResponse {
    fn shape(&self) -> &'static str {
        match self {
            ConceptResponse::Done => "done",
            ConceptResponse::Bool(_) => "bool",
            ConceptResponse::Concept(_) => "concept",
            ConceptResponse::Text(_) => "text",
            ConceptResponse::Stream(_) => "stream",
            ConceptResponse::RolePlayers(_) => "role players",
        }
    }

    fn unexpected(self, expected: &'static str) -> ConceptError {
        ConceptError::UnexpectedResponse {
            expected,
            actual: self.shape(),
        }
    }

    pub fn into_done(self) -> ConceptResult<()> {
        match self {
            ConceptResponse::Done => Ok(()),
            other => Err(other.unexpected("done")),
        }
    }

    pub fn into_bool(self) -> ConceptResult<bool> {
        match self {
            ConceptResponse::Bool(b) => Ok(b),
            other => Err(other.unexpected("bool")),
        }
    }

    /// A concept that may legitimately be absent
    pub fn into_optional_handle(self) -> ConceptResult<Option<ConceptHandle>> {
        match self {
            ConceptResponse::Concept(None) => Ok(None),
            ConceptResponse::Concept(raw) => ConceptHandle::new(raw).map(Some),
            other => Err(other.unexpected("concept")),
        }
    }

    /// A concept that must be present; absence is a null engine reference
    pub fn into_handle(self) -> ConceptResult<ConceptHandle> {
        match self {
            ConceptResponse::Concept(raw) => ConceptHandle::new(raw),
            other => Err(other.unexpected("concept")),
        }
    }

    pub fn into_text(self) -> ConceptResult<Option<String>> {
        match self {
            ConceptResponse::Text(text) => Ok(text),
            other => Err(other.unexpected("text")),
        }
    }

    pub fn into_stream(self) -> ConceptResult<Box<dyn Cursor<RawConcept>>> {
        match self {
            ConceptResponse::Stream(cursor) => Ok(cursor),
            other => Err(other.unexpected("stream")),
        }
    }

    pub fn into_role_players(self) -> ConceptResult<Box<dyn Cursor<(RawConcept, RawConcept)>>> {
        match self {
            ConceptResponse::RolePlayers(cursor) => Ok(cursor),
            other => Err(other.unexpected("role players")),
        }
    }
}

impl fmt::Debug for ConceptResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConceptResponse::{}", self.shape())
    }
}
