//! In-memory schema and instance storage
//!
//! Uses insertion-ordered maps so traversal order is deterministic:
//! - types: ConceptId -> TypeRecord (with declared owns/plays/relates edges)
//! - things: ConceptId -> ThingRecord (with owned attributes and role players)
//! - label_index: Label -> ConceptId
//! - iid_index: Iid -> ConceptId
//! - value_index: (attribute type, value key) -> ConceptId, so `put` is content-addressed

use crate::common::{Annotation, Iid, Label, Transitivity, Value, ValueType};
use crate::engine::{
    ConceptId, EngineError, EngineResult, ROOT_ATTRIBUTE, ROOT_ENTITY, ROOT_RELATION, ROOT_ROLE,
};
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Schema-side kind of a stored type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Entity,
    Relation,
    Attribute,
    Role,
}

/// A declared `owns` edge
#[derive(Debug, Clone, PartialEq)]
pub struct OwnsEdge {
    pub overridden: Option<ConceptId>,
    pub annotations: BTreeSet<Annotation>,
}

#[derive(Debug, Clone)]
pub struct TypeRecord {
    pub id: ConceptId,
    pub kind: TypeKind,
    pub label: Label,
    pub supertype: Option<ConceptId>,
    pub is_root: bool,
    pub is_abstract: bool,
    pub value_type: Option<ValueType>,
    pub regex: Option<String>,
    /// attribute type -> edge
    pub owns: IndexMap<ConceptId, OwnsEdge>,
    /// role type -> overridden role type
    pub plays: IndexMap<ConceptId, Option<ConceptId>>,
    /// role type -> overridden role type (relation types only)
    pub relates: IndexMap<ConceptId, Option<ConceptId>>,
}

impl TypeRecord {
    fn new(id: ConceptId, kind: TypeKind, label: Label, supertype: Option<ConceptId>) -> Self {
        TypeRecord {
            id,
            kind,
            label,
            supertype,
            is_root: false,
            is_abstract: false,
            value_type: None,
            regex: None,
            owns: IndexMap::new(),
            plays: IndexMap::new(),
            relates: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThingRecord {
    pub id: ConceptId,
    pub iid: Iid,
    pub type_id: ConceptId,
    pub value: Option<Value>,
    /// owned attributes
    pub has: IndexSet<ConceptId>,
    /// (role type, player) pairs, relations only
    pub role_players: Vec<(ConceptId, ConceptId)>,
}

/// Content key for attribute deduplication; doubles compare by bit pattern
fn value_key(value: &Value) -> String {
    match value {
        Value::Double(d) => format!("double:{}", d.to_bits()),
        other => format!("{}:{}", other.value_type(), other),
    }
}

/// Working copy of a database's schema and data
#[derive(Debug, Clone)]
pub struct Store {
    types: IndexMap<ConceptId, TypeRecord>,
    things: IndexMap<ConceptId, ThingRecord>,
    label_index: FxHashMap<Label, ConceptId>,
    iid_index: FxHashMap<Iid, ConceptId>,
    value_index: FxHashMap<(ConceptId, String), ConceptId>,
    /// Shared by every copy of a database's store, so ids are never reissued
    next_id: Arc<AtomicU64>,
}

impl Store {
    /// Create a store seeded with the engine's root types
    pub fn new() -> Self {
        let mut store = Store {
            types: IndexMap::new(),
            things: IndexMap::new(),
            label_index: FxHashMap::default(),
            iid_index: FxHashMap::default(),
            value_index: FxHashMap::default(),
            next_id: Arc::new(AtomicU64::new(1)),
        };
        store.insert_root(TypeKind::Entity, Label::new(ROOT_ENTITY), None);
        store.insert_root(TypeKind::Relation, Label::new(ROOT_RELATION), None);
        store.insert_root(
            TypeKind::Attribute,
            Label::new(ROOT_ATTRIBUTE),
            Some(ValueType::Object),
        );
        store.insert_root(
            TypeKind::Role,
            Label::scoped(ROOT_RELATION, ROOT_ROLE),
            None,
        );
        store
    }

    fn insert_root(&mut self, kind: TypeKind, label: Label, value_type: Option<ValueType>) {
        let id = self.allocate_id();
        let mut record = TypeRecord::new(id, kind, label.clone(), None);
        record.is_root = true;
        record.is_abstract = true;
        record.value_type = value_type;
        self.label_index.insert(label, id);
        self.types.insert(id, record);
    }

    fn allocate_id(&mut self) -> ConceptId {
        ConceptId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn type_record(&self, id: ConceptId) -> EngineResult<&TypeRecord> {
        self.types
            .get(&id)
            .ok_or_else(|| EngineError::ConceptNotFound(format!("type {}", id)))
    }

    fn type_record_mut(&mut self, id: ConceptId) -> EngineResult<&mut TypeRecord> {
        self.types
            .get_mut(&id)
            .ok_or_else(|| EngineError::ConceptNotFound(format!("type {}", id)))
    }

    pub fn thing_record(&self, id: ConceptId) -> EngineResult<&ThingRecord> {
        self.things
            .get(&id)
            .ok_or_else(|| EngineError::ConceptNotFound(format!("thing {}", id)))
    }

    fn thing_record_mut(&mut self, id: ConceptId) -> EngineResult<&mut ThingRecord> {
        self.things
            .get_mut(&id)
            .ok_or_else(|| EngineError::ConceptNotFound(format!("thing {}", id)))
    }

    pub fn contains(&self, id: ConceptId) -> bool {
        self.types.contains_key(&id) || self.things.contains_key(&id)
    }

    pub fn type_by_label(&self, label: &Label) -> Option<&TypeRecord> {
        self.label_index.get(label).and_then(|id| self.types.get(id))
    }

    pub fn thing_by_iid(&self, iid: &Iid) -> Option<&ThingRecord> {
        self.iid_index.get(iid).and_then(|id| self.things.get(id))
    }

    pub fn root_of(&self, kind: TypeKind) -> EngineResult<ConceptId> {
        let label = match kind {
            TypeKind::Entity => Label::new(ROOT_ENTITY),
            TypeKind::Relation => Label::new(ROOT_RELATION),
            TypeKind::Attribute => Label::new(ROOT_ATTRIBUTE),
            TypeKind::Role => Label::scoped(ROOT_RELATION, ROOT_ROLE),
        };
        self.label_index
            .get(&label)
            .copied()
            .ok_or_else(|| EngineError::Internal(format!("missing root type {}", label)))
    }

    pub fn all_types(&self) -> impl Iterator<Item = &TypeRecord> {
        self.types.values()
    }

    fn expect_kind(&self, id: ConceptId, kind: TypeKind) -> EngineResult<&TypeRecord> {
        let record = self.type_record(id)?;
        if record.kind != kind {
            return Err(EngineError::constraint(
                "TYW01",
                format!("'{}' is not a {:?} type", record.label, kind),
            ));
        }
        Ok(record)
    }

    // ------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------

    /// The type itself followed by its ancestors, nearest first
    pub fn supertypes(&self, id: ConceptId) -> EngineResult<Vec<ConceptId>> {
        let mut chain = vec![id];
        let mut current = self.type_record(id)?.supertype;
        while let Some(sup) = current {
            chain.push(sup);
            current = self.type_record(sup)?.supertype;
        }
        Ok(chain)
    }

    fn direct_subtypes(&self, id: ConceptId) -> Vec<ConceptId> {
        self.types
            .values()
            .filter(|t| t.supertype == Some(id))
            .map(|t| t.id)
            .collect()
    }

    /// Transitive: the type and all its descendants, pre-order.
    /// Explicit: direct children only.
    pub fn subtypes(&self, id: ConceptId, transitivity: Transitivity) -> EngineResult<Vec<ConceptId>> {
        self.type_record(id)?;
        if !transitivity.is_transitive() {
            return Ok(self.direct_subtypes(id));
        }
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            result.push(next);
            let mut children = self.direct_subtypes(next);
            children.reverse();
            stack.extend(children);
        }
        Ok(result)
    }

    pub fn is_subtype_of(&self, id: ConceptId, ancestor: ConceptId) -> bool {
        self.supertypes(id)
            .map(|chain| chain.contains(&ancestor))
            .unwrap_or(false)
    }

    pub fn instances(&self, id: ConceptId, transitivity: Transitivity) -> EngineResult<Vec<ConceptId>> {
        let types: Vec<ConceptId> = match transitivity {
            Transitivity::Transitive => self.subtypes(id, Transitivity::Transitive)?,
            Transitivity::Explicit => {
                self.type_record(id)?;
                vec![id]
            }
        };
        Ok(self
            .things
            .values()
            .filter(|t| types.contains(&t.type_id))
            .map(|t| t.id)
            .collect())
    }

    // ------------------------------------------------------------------
    // Capabilities with override-aware inheritance
    // ------------------------------------------------------------------

    /// Collect an edge map along the supertype chain. Edges declared lower in
    /// the hierarchy hide the edges they override further up.
    fn inherited<E: Clone>(
        &self,
        id: ConceptId,
        transitivity: Transitivity,
        edges: impl Fn(&TypeRecord) -> &IndexMap<ConceptId, E>,
        overridden: impl Fn(&E) -> Option<ConceptId>,
    ) -> EngineResult<Vec<(ConceptId, E)>> {
        let chain = match transitivity {
            Transitivity::Transitive => self.supertypes(id)?,
            Transitivity::Explicit => vec![id],
        };
        let mut result: Vec<(ConceptId, E)> = Vec::new();
        let mut hidden: BTreeSet<ConceptId> = BTreeSet::new();
        for type_id in chain {
            let declared = edges(self.type_record(type_id)?);
            for (target, edge) in declared {
                if hidden.contains(target) || result.iter().any(|(seen, _)| seen == target) {
                    continue;
                }
                result.push((*target, edge.clone()));
            }
            hidden.extend(declared.values().filter_map(&overridden));
        }
        Ok(result)
    }

    pub fn owns(&self, owner: ConceptId, transitivity: Transitivity) -> EngineResult<Vec<(ConceptId, OwnsEdge)>> {
        self.inherited(owner, transitivity, |t| &t.owns, |e| e.overridden)
    }

    pub fn owns_filtered(
        &self,
        owner: ConceptId,
        value_type: Option<ValueType>,
        transitivity: Transitivity,
        annotations: &[Annotation],
    ) -> EngineResult<Vec<ConceptId>> {
        let mut result = Vec::new();
        for (attribute_type, edge) in self.owns(owner, transitivity)? {
            if let Some(vt) = value_type {
                if self.type_record(attribute_type)?.value_type != Some(vt) {
                    continue;
                }
            }
            if annotations.iter().all(|a| edge.annotations.contains(a)) {
                result.push(attribute_type);
            }
        }
        Ok(result)
    }

    pub fn owns_overridden(&self, owner: ConceptId, attribute_type: ConceptId) -> EngineResult<Option<ConceptId>> {
        for type_id in self.supertypes(owner)? {
            if let Some(edge) = self.type_record(type_id)?.owns.get(&attribute_type) {
                return Ok(edge.overridden);
            }
        }
        Ok(None)
    }

    pub fn plays(&self, player: ConceptId, transitivity: Transitivity) -> EngineResult<Vec<ConceptId>> {
        Ok(self
            .inherited(player, transitivity, |t| &t.plays, |o| *o)?
            .into_iter()
            .map(|(role, _)| role)
            .collect())
    }

    pub fn plays_overridden(&self, player: ConceptId, role_type: ConceptId) -> EngineResult<Option<ConceptId>> {
        for type_id in self.supertypes(player)? {
            if let Some(overridden) = self.type_record(type_id)?.plays.get(&role_type) {
                return Ok(*overridden);
            }
        }
        Ok(None)
    }

    pub fn relates(&self, relation_type: ConceptId, transitivity: Transitivity) -> EngineResult<Vec<ConceptId>> {
        Ok(self
            .inherited(relation_type, transitivity, |t| &t.relates, |o| *o)?
            .into_iter()
            .map(|(role, _)| role)
            .collect())
    }

    pub fn relates_by_name(&self, relation_type: ConceptId, name: &str) -> EngineResult<Option<ConceptId>> {
        for role in self.relates(relation_type, Transitivity::Transitive)? {
            if self.type_record(role)?.label.name() == name {
                return Ok(Some(role));
            }
        }
        Ok(None)
    }

    fn declared_role_by_name(&self, relation_type: ConceptId, name: &str) -> EngineResult<Option<ConceptId>> {
        for role in self.type_record(relation_type)?.relates.keys() {
            if self.type_record(*role)?.label.name() == name {
                return Ok(Some(*role));
            }
        }
        Ok(None)
    }

    pub fn relates_overridden(&self, relation_type: ConceptId, name: &str) -> EngineResult<Option<ConceptId>> {
        let record = self.type_record(relation_type)?;
        match self.declared_role_by_name(relation_type, name)? {
            Some(role) => Ok(record.relates.get(&role).copied().flatten()),
            None => Ok(None),
        }
    }

    /// Types whose capability set (explicit or inherited) contains `target`
    fn capable_types(
        &self,
        target: ConceptId,
        transitivity: Transitivity,
        kinds: &[TypeKind],
        capabilities: impl Fn(ConceptId, Transitivity) -> EngineResult<Vec<ConceptId>>,
    ) -> EngineResult<Vec<ConceptId>> {
        let mut result = Vec::new();
        for record in self.types.values().filter(|t| kinds.contains(&t.kind)) {
            if capabilities(record.id, transitivity)?.contains(&target) {
                result.push(record.id);
            }
        }
        Ok(result)
    }

    pub fn owner_types(
        &self,
        attribute_type: ConceptId,
        transitivity: Transitivity,
        annotations: &[Annotation],
    ) -> EngineResult<Vec<ConceptId>> {
        self.capable_types(
            attribute_type,
            transitivity,
            &[TypeKind::Entity, TypeKind::Relation, TypeKind::Attribute],
            |owner, t| self.owns_filtered(owner, None, t, annotations),
        )
    }

    pub fn player_types(&self, role_type: ConceptId, transitivity: Transitivity) -> EngineResult<Vec<ConceptId>> {
        self.capable_types(
            role_type,
            transitivity,
            &[TypeKind::Entity, TypeKind::Relation, TypeKind::Attribute],
            |player, t| self.plays(player, t),
        )
    }

    pub fn role_relation_types(&self, role_type: ConceptId) -> EngineResult<Vec<ConceptId>> {
        self.capable_types(
            role_type,
            Transitivity::Transitive,
            &[TypeKind::Relation],
            |relation, t| self.relates(relation, t),
        )
    }

    fn role_matches(&self, role: ConceptId, wanted: ConceptId, transitivity: Transitivity) -> bool {
        match transitivity {
            Transitivity::Transitive => self.is_subtype_of(role, wanted),
            Transitivity::Explicit => role == wanted,
        }
    }

    pub fn relation_instances(&self, role_type: ConceptId, transitivity: Transitivity) -> Vec<ConceptId> {
        self.things
            .values()
            .filter(|t| {
                t.role_players
                    .iter()
                    .any(|(role, _)| self.role_matches(*role, role_type, transitivity))
            })
            .map(|t| t.id)
            .collect()
    }

    pub fn player_instances(&self, role_type: ConceptId, transitivity: Transitivity) -> Vec<ConceptId> {
        let mut players: IndexSet<ConceptId> = IndexSet::new();
        for relation in self.things.values() {
            for (role, player) in &relation.role_players {
                if self.role_matches(*role, role_type, transitivity) {
                    players.insert(*player);
                }
            }
        }
        players.into_iter().collect()
    }

    // ------------------------------------------------------------------
    // Schema writes
    // ------------------------------------------------------------------

    fn ensure_not_root(&self, id: ConceptId, operation: &str) -> EngineResult<()> {
        let record = self.type_record(id)?;
        if record.is_root {
            return Err(EngineError::constraint(
                "TYW02",
                format!("Cannot {} the root type '{}'", operation, record.label),
            ));
        }
        Ok(())
    }

    /// Get-or-create a thing type by label
    pub fn put_type(&mut self, kind: TypeKind, label: Label, value_type: Option<ValueType>) -> EngineResult<ConceptId> {
        if let Some(existing) = self.type_by_label(&label) {
            if existing.kind != kind {
                return Err(EngineError::constraint(
                    "TYW03",
                    format!("The label '{}' is already used by a {:?} type", label, existing.kind),
                ));
            }
            if value_type.is_some() && existing.value_type != value_type {
                return Err(EngineError::constraint(
                    "TYW04",
                    format!("The attribute type '{}' already exists with a different value type", label),
                ));
            }
            return Ok(existing.id);
        }
        if let Some(vt) = value_type {
            if !vt.is_writable() {
                return Err(EngineError::constraint(
                    "TYW05",
                    format!("Attribute types cannot be defined with value type '{}'", vt),
                ));
            }
        }
        let root = self.root_of(kind)?;
        let id = self.allocate_id();
        let mut record = TypeRecord::new(id, kind, label.clone(), Some(root));
        record.value_type = value_type;
        self.label_index.insert(label.clone(), id);
        self.types.insert(id, record);
        debug!("Defined {:?} type {}", kind, label);
        Ok(id)
    }

    pub fn set_label(&mut self, id: ConceptId, name: &str) -> EngineResult<()> {
        self.ensure_not_root(id, "rename")?;
        let record = self.type_record(id)?;
        let label = match record.label.scope() {
            Some(scope) => Label::scoped(scope, name),
            None => Label::new(name),
        };
        if self.label_index.contains_key(&label) {
            return Err(EngineError::constraint(
                "TYW06",
                format!("The label '{}' is already in use", label),
            ));
        }
        let old = record.label.clone();
        let declared_roles: Vec<ConceptId> = record.relates.keys().copied().collect();
        self.relabel(id, label.clone())?;
        // roles are scoped by their relation type
        for role in declared_roles {
            let scoped = self.type_record(role)?.label.with_scope(name);
            self.relabel(role, scoped)?;
        }
        debug!("Renamed type {} to {}", old, label);
        Ok(())
    }

    fn relabel(&mut self, id: ConceptId, label: Label) -> EngineResult<()> {
        let record = self.type_record_mut(id)?;
        let old = std::mem::replace(&mut record.label, label.clone());
        self.label_index.remove(&old);
        self.label_index.insert(label, id);
        Ok(())
    }

    pub fn set_abstract(&mut self, id: ConceptId) -> EngineResult<()> {
        self.ensure_not_root(id, "change abstractness of")?;
        if !self.instances(id, Transitivity::Explicit)?.is_empty() {
            let label = self.type_record(id)?.label.clone();
            return Err(EngineError::constraint(
                "TYW07",
                format!("The type '{}' has instances and cannot be set abstract", label),
            ));
        }
        self.type_record_mut(id)?.is_abstract = true;
        Ok(())
    }

    pub fn unset_abstract(&mut self, id: ConceptId) -> EngineResult<()> {
        self.ensure_not_root(id, "change abstractness of")?;
        self.type_record_mut(id)?.is_abstract = false;
        Ok(())
    }

    pub fn set_supertype(&mut self, id: ConceptId, supertype: ConceptId) -> EngineResult<()> {
        self.ensure_not_root(id, "change the supertype of")?;
        let record = self.type_record(id)?;
        let sup = self.type_record(supertype)?;
        if record.kind != sup.kind || record.kind == TypeKind::Role {
            return Err(EngineError::constraint(
                "TYW08",
                format!("'{}' cannot be a subtype of '{}'", record.label, sup.label),
            ));
        }
        if self.is_subtype_of(supertype, id) {
            return Err(EngineError::constraint(
                "TYW09",
                format!("Setting '{}' as supertype of '{}' creates a cycle", sup.label, record.label),
            ));
        }
        if record.kind == TypeKind::Attribute && !sup.is_root {
            if !sup.is_abstract {
                return Err(EngineError::constraint(
                    "TYW12",
                    format!("The attribute supertype '{}' must be abstract", sup.label),
                ));
            }
            if sup.value_type != record.value_type {
                return Err(EngineError::constraint(
                    "TYW13",
                    format!("'{}' and '{}' have different value types", record.label, sup.label),
                ));
            }
        }
        self.type_record_mut(id)?.supertype = Some(supertype);
        Ok(())
    }

    pub fn delete_type(&mut self, id: ConceptId) -> EngineResult<()> {
        self.ensure_not_root(id, "delete")?;
        let record = self.type_record(id)?;
        let label = record.label.clone();
        if !self.direct_subtypes(id).is_empty() {
            return Err(EngineError::constraint(
                "TYW14",
                format!("The type '{}' has subtypes and cannot be deleted", label),
            ));
        }
        let has_instances = if record.kind == TypeKind::Role {
            !self.relation_instances(id, Transitivity::Explicit).is_empty()
        } else {
            !self.instances(id, Transitivity::Explicit)?.is_empty()
        };
        if has_instances {
            return Err(EngineError::constraint(
                "TYW15",
                format!("The type '{}' has instances and cannot be deleted", label),
            ));
        }
        let declared_roles: Vec<ConceptId> = record.relates.keys().copied().collect();
        for role in declared_roles {
            self.delete_type(role)?;
        }
        for other in self.types.values_mut() {
            other.owns.shift_remove(&id);
            other.plays.shift_remove(&id);
            other.relates.shift_remove(&id);
        }
        self.types.shift_remove(&id);
        self.label_index.remove(&label);
        debug!("Deleted type {}", label);
        Ok(())
    }

    pub fn set_owns(
        &mut self,
        owner: ConceptId,
        attribute_type: ConceptId,
        overridden: Option<ConceptId>,
        annotations: &[Annotation],
    ) -> EngineResult<()> {
        self.ensure_not_root(owner, "add ownerships to")?;
        let owner_record = self.type_record(owner)?;
        if owner_record.kind == TypeKind::Role {
            return Err(EngineError::constraint("TYW16", "Role types cannot own attributes"));
        }
        let attribute = self.expect_kind(attribute_type, TypeKind::Attribute)?;
        let keyed = annotations.iter().any(|a| matches!(a, Annotation::Key | Annotation::Unique));
        if keyed && !attribute.value_type.map(ValueType::is_keyable).unwrap_or(false) {
            return Err(EngineError::constraint(
                "TYW17",
                format!(
                    "'{}' has a value type that cannot be annotated with {:?}",
                    attribute.label, annotations
                ),
            ));
        }
        if let Some(overridden) = overridden {
            self.expect_kind(overridden, TypeKind::Attribute)?;
            let inherited = match owner_record.supertype {
                Some(sup) => self.owns(sup, Transitivity::Transitive)?,
                None => Vec::new(),
            };
            if overridden == attribute_type
                || !self.is_subtype_of(attribute_type, overridden)
                || !inherited.iter().any(|(a, _)| *a == overridden)
            {
                let overridden_label = self.type_record(overridden)?.label.clone();
                return Err(EngineError::constraint(
                    "TYW18",
                    format!(
                        "'{}' cannot override '{}': it must be an inherited ownership of a supertype of the attribute",
                        attribute.label, overridden_label
                    ),
                ));
            }
        }
        let edge = OwnsEdge {
            overridden,
            annotations: annotations.iter().copied().collect(),
        };
        self.type_record_mut(owner)?.owns.insert(attribute_type, edge);
        Ok(())
    }

    pub fn unset_owns(&mut self, owner: ConceptId, attribute_type: ConceptId) -> EngineResult<()> {
        let record = self.type_record_mut(owner)?;
        if record.owns.shift_remove(&attribute_type).is_none() {
            let label = record.label.clone();
            return Err(EngineError::constraint(
                "TYW19",
                format!("'{}' does not declare ownership of that attribute type", label),
            ));
        }
        Ok(())
    }

    pub fn set_plays(
        &mut self,
        player: ConceptId,
        role_type: ConceptId,
        overridden: Option<ConceptId>,
    ) -> EngineResult<()> {
        self.ensure_not_root(player, "add roles to")?;
        let record = self.type_record(player)?;
        if record.kind == TypeKind::Role {
            return Err(EngineError::constraint("TYW20", "Role types cannot play roles"));
        }
        self.expect_kind(role_type, TypeKind::Role)?;
        if let Some(overridden) = overridden {
            self.expect_kind(overridden, TypeKind::Role)?;
            let inherited = match record.supertype {
                Some(sup) => self.plays(sup, Transitivity::Transitive)?,
                None => Vec::new(),
            };
            if overridden == role_type
                || !self.is_subtype_of(role_type, overridden)
                || !inherited.contains(&overridden)
            {
                return Err(EngineError::constraint(
                    "TYW21",
                    "A played role can only override an inherited role that it specialises",
                ));
            }
        }
        self.type_record_mut(player)?.plays.insert(role_type, overridden);
        Ok(())
    }

    pub fn unset_plays(&mut self, player: ConceptId, role_type: ConceptId) -> EngineResult<()> {
        let record = self.type_record_mut(player)?;
        if record.plays.shift_remove(&role_type).is_none() {
            let label = record.label.clone();
            return Err(EngineError::constraint(
                "TYW22",
                format!("'{}' does not declare that it plays the role", label),
            ));
        }
        Ok(())
    }

    /// Declare (or narrow) a role on a relation type.
    ///
    /// The overridden role is looked up by name among the roles the relation
    /// type already relates, declared or inherited.
    pub fn set_relates(
        &mut self,
        relation_type: ConceptId,
        name: &str,
        overridden_name: Option<&str>,
    ) -> EngineResult<()> {
        self.ensure_not_root(relation_type, "add roles to")?;
        let relation = self.expect_kind(relation_type, TypeKind::Relation)?;
        let relation_label = relation.label.clone();
        let overridden = match overridden_name {
            Some(overridden_name) => {
                let found = match self.declared_role_by_name(relation_type, overridden_name)? {
                    Some(role) => Some(role),
                    None => self.relates_by_name(relation_type, overridden_name)?,
                };
                match found {
                    Some(role) if self.type_record(role)?.label.name() != name => Some(role),
                    _ => {
                        return Err(EngineError::constraint(
                            "TYW23",
                            format!(
                                "'{}' has no role '{}' that '{}' could override",
                                relation_label, overridden_name, name
                            ),
                        ))
                    }
                }
            }
            None => None,
        };
        let role = match self.declared_role_by_name(relation_type, name)? {
            Some(role) => role,
            None => {
                let root_role = self.root_of(TypeKind::Role)?;
                let id = self.allocate_id();
                let label = Label::scoped(relation_label.name(), name);
                let record = TypeRecord::new(id, TypeKind::Role, label.clone(), Some(root_role));
                self.label_index.insert(label, id);
                self.types.insert(id, record);
                id
            }
        };
        let root_role = self.root_of(TypeKind::Role)?;
        self.type_record_mut(role)?.supertype = Some(overridden.unwrap_or(root_role));
        self.type_record_mut(relation_type)?.relates.insert(role, overridden);
        debug!("Relation type {} relates {}", relation_label, name);
        Ok(())
    }

    pub fn unset_relates(&mut self, relation_type: ConceptId, name: &str) -> EngineResult<()> {
        match self.declared_role_by_name(relation_type, name)? {
            Some(role) => self.delete_type(role),
            None => Err(EngineError::constraint(
                "TYW24",
                format!("The relation type does not declare a role '{}'", name),
            )),
        }
    }

    pub fn set_regex(&mut self, attribute_type: ConceptId, regex: &str) -> EngineResult<()> {
        let record = self.expect_kind(attribute_type, TypeKind::Attribute)?;
        if record.value_type != Some(ValueType::String) {
            return Err(EngineError::constraint(
                "TYW11",
                format!(
                    "A regex can only be set on string attribute types, '{}' is not one",
                    record.label
                ),
            ));
        }
        let compiled = Regex::new(regex).map_err(|e| EngineError::InvalidRegex {
            regex: regex.to_string(),
            reason: e.to_string(),
        })?;
        for instance in self.instances(attribute_type, Transitivity::Transitive)? {
            if let Some(Value::String(s)) = &self.thing_record(instance)?.value {
                if !compiled.is_match(s) {
                    return Err(EngineError::constraint(
                        "TYW25",
                        format!("The existing attribute \"{}\" does not satisfy regex '{}'", s, regex),
                    ));
                }
            }
        }
        self.type_record_mut(attribute_type)?.regex = Some(regex.to_string());
        Ok(())
    }

    pub fn unset_regex(&mut self, attribute_type: ConceptId) -> EngineResult<()> {
        self.expect_kind(attribute_type, TypeKind::Attribute)?;
        self.type_record_mut(attribute_type)?.regex = None;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Data writes
    // ------------------------------------------------------------------

    fn insert_thing(&mut self, type_id: ConceptId, value: Option<Value>) -> ConceptId {
        let id = self.allocate_id();
        let iid = Iid::new(format!("0x{:04x}{:012x}", type_id.0, id.0));
        self.iid_index.insert(iid.clone(), id);
        self.things.insert(
            id,
            ThingRecord {
                id,
                iid,
                type_id,
                value,
                has: IndexSet::new(),
                role_players: Vec::new(),
            },
        );
        id
    }

    fn ensure_concrete(&self, type_id: ConceptId) -> EngineResult<&TypeRecord> {
        let record = self.type_record(type_id)?;
        if record.is_abstract {
            return Err(EngineError::AbstractType(record.label.clone()));
        }
        Ok(record)
    }

    pub fn create(&mut self, type_id: ConceptId) -> EngineResult<ConceptId> {
        let record = self.ensure_concrete(type_id)?;
        if !matches!(record.kind, TypeKind::Entity | TypeKind::Relation) {
            return Err(EngineError::constraint(
                "THW02",
                format!("Instances of '{}' cannot be created directly", record.label),
            ));
        }
        let label = record.label.clone();
        let id = self.insert_thing(type_id, None);
        debug!("Created instance {} of {}", id, label);
        Ok(id)
    }

    fn check_value(&self, attribute_type: ConceptId, value: &Value) -> EngineResult<()> {
        let record = self.expect_kind(attribute_type, TypeKind::Attribute)?;
        if record.value_type != Some(value.value_type()) {
            return Err(EngineError::constraint(
                "THW03",
                format!(
                    "The value {} is not of value type {} required by '{}'",
                    value,
                    record.value_type.unwrap_or(ValueType::Object),
                    record.label
                ),
            ));
        }
        Ok(())
    }

    pub fn put_attribute(&mut self, attribute_type: ConceptId, value: Value) -> EngineResult<ConceptId> {
        self.check_value(attribute_type, &value)?;
        let record = self.ensure_concrete(attribute_type)?;
        if let (Some(regex), Value::String(s)) = (&record.regex, &value) {
            let compiled = Regex::new(regex).map_err(|e| EngineError::InvalidRegex {
                regex: regex.clone(),
                reason: e.to_string(),
            })?;
            if !compiled.is_match(s) {
                return Err(EngineError::constraint(
                    "THW04",
                    format!("\"{}\" does not satisfy the regex '{}' of '{}'", s, regex, record.label),
                ));
            }
        }
        let key = (attribute_type, value_key(&value));
        if let Some(existing) = self.value_index.get(&key) {
            return Ok(*existing);
        }
        let id = self.insert_thing(attribute_type, Some(value));
        self.value_index.insert(key, id);
        Ok(id)
    }

    pub fn get_attribute(&self, attribute_type: ConceptId, value: &Value) -> EngineResult<Option<ConceptId>> {
        self.check_value(attribute_type, value)?;
        Ok(self.value_index.get(&(attribute_type, value_key(value))).copied())
    }

    pub fn delete_thing(&mut self, id: ConceptId) -> EngineResult<()> {
        let record = self
            .things
            .shift_remove(&id)
            .ok_or_else(|| EngineError::ConceptNotFound(format!("thing {}", id)))?;
        self.iid_index.remove(&record.iid);
        if let Some(value) = &record.value {
            self.value_index.remove(&(record.type_id, value_key(value)));
        }
        for other in self.things.values_mut() {
            other.has.shift_remove(&id);
            other.role_players.retain(|(_, player)| *player != id);
        }
        debug!("Deleted instance {}", record.iid);
        Ok(())
    }

    fn owns_annotations(&self, owner_type: ConceptId, attribute_type: ConceptId) -> EngineResult<Option<BTreeSet<Annotation>>> {
        Ok(self
            .owns(owner_type, Transitivity::Transitive)?
            .into_iter()
            .find(|(a, _)| *a == attribute_type)
            .map(|(_, edge)| edge.annotations))
    }

    pub fn set_has(&mut self, owner: ConceptId, attribute: ConceptId) -> EngineResult<()> {
        let owner_record = self.thing_record(owner)?;
        let attribute_record = self.thing_record(attribute)?;
        if attribute_record.value.is_none() {
            return Err(EngineError::constraint("THW05", "Only attributes can be owned"));
        }
        let attribute_type = attribute_record.type_id;
        let annotations = match self.owns_annotations(owner_record.type_id, attribute_type)? {
            Some(annotations) => annotations,
            None => {
                return Err(EngineError::constraint(
                    "THW06",
                    format!(
                        "'{}' is not allowed to own attributes of type '{}'",
                        self.type_record(owner_record.type_id)?.label,
                        self.type_record(attribute_type)?.label
                    ),
                ))
            }
        };
        if annotations.contains(&Annotation::Key) {
            let already_keyed = owner_record.has.iter().any(|a| {
                *a != attribute
                    && self
                        .things
                        .get(a)
                        .map(|t| t.type_id == attribute_type)
                        .unwrap_or(false)
            });
            if already_keyed {
                return Err(EngineError::constraint(
                    "THW07",
                    format!("{} already has a key of that type", owner_record.iid),
                ));
            }
        }
        if annotations.contains(&Annotation::Key) || annotations.contains(&Annotation::Unique) {
            for other in self.things.values() {
                if other.id == owner || !other.has.contains(&attribute) {
                    continue;
                }
                let other_annotations = self.owns_annotations(other.type_id, attribute_type)?;
                let constrained = other_annotations
                    .map(|a| a.contains(&Annotation::Key) || a.contains(&Annotation::Unique))
                    .unwrap_or(false);
                if constrained {
                    return Err(EngineError::constraint(
                        "THW08",
                        format!("The attribute {} is already owned uniquely by {}", attribute_record.iid, other.iid),
                    ));
                }
            }
        }
        self.thing_record_mut(owner)?.has.insert(attribute);
        Ok(())
    }

    pub fn unset_has(&mut self, owner: ConceptId, attribute: ConceptId) -> EngineResult<()> {
        let record = self.thing_record_mut(owner)?;
        if !record.has.shift_remove(&attribute) {
            return Err(EngineError::constraint("THW09", "The thing does not own that attribute"));
        }
        Ok(())
    }

    pub fn add_role_player(&mut self, relation: ConceptId, role_type: ConceptId, player: ConceptId) -> EngineResult<()> {
        let relation_type = self.thing_record(relation)?.type_id;
        self.expect_kind(relation_type, TypeKind::Relation)?;
        if !self.relates(relation_type, Transitivity::Transitive)?.contains(&role_type) {
            return Err(EngineError::constraint(
                "THW10",
                format!(
                    "'{}' does not relate the role '{}'",
                    self.type_record(relation_type)?.label,
                    self.type_record(role_type)?.label
                ),
            ));
        }
        let player_type = self.thing_record(player)?.type_id;
        if !self.plays(player_type, Transitivity::Transitive)?.contains(&role_type) {
            return Err(EngineError::constraint(
                "THW11",
                format!(
                    "'{}' is not allowed to play the role '{}'",
                    self.type_record(player_type)?.label,
                    self.type_record(role_type)?.label
                ),
            ));
        }
        self.thing_record_mut(relation)?.role_players.push((role_type, player));
        Ok(())
    }

    pub fn remove_role_player(&mut self, relation: ConceptId, role_type: ConceptId, player: ConceptId) -> EngineResult<()> {
        let record = self.thing_record_mut(relation)?;
        match record.role_players.iter().position(|rp| *rp == (role_type, player)) {
            Some(index) => {
                record.role_players.remove(index);
                Ok(())
            }
            None => Err(EngineError::constraint("THW12", "No such role player in the relation")),
        }
    }

    // ------------------------------------------------------------------
    // Data reads
    // ------------------------------------------------------------------

    pub fn get_has(
        &self,
        owner: ConceptId,
        attribute_types: &[ConceptId],
        annotations: &[Annotation],
    ) -> EngineResult<Vec<ConceptId>> {
        let record = self.thing_record(owner)?;
        let annotated: Option<Vec<ConceptId>> = if annotations.is_empty() {
            None
        } else {
            Some(self.owns_filtered(record.type_id, None, Transitivity::Transitive, annotations)?)
        };
        let mut result = Vec::new();
        for attribute in &record.has {
            let attribute_type = self.thing_record(*attribute)?.type_id;
            if !attribute_types.is_empty()
                && !attribute_types.iter().any(|t| self.is_subtype_of(attribute_type, *t))
            {
                continue;
            }
            if let Some(allowed) = &annotated {
                if !allowed.contains(&attribute_type) {
                    continue;
                }
            }
            result.push(*attribute);
        }
        Ok(result)
    }

    pub fn get_relations(&self, player: ConceptId, role_types: &[ConceptId]) -> EngineResult<Vec<ConceptId>> {
        self.thing_record(player)?;
        Ok(self
            .things
            .values()
            .filter(|relation| {
                relation.role_players.iter().any(|(role, p)| {
                    *p == player
                        && (role_types.is_empty()
                            || role_types.iter().any(|r| self.is_subtype_of(*role, *r)))
                })
            })
            .map(|relation| relation.id)
            .collect())
    }

    pub fn get_playing(&self, player: ConceptId) -> EngineResult<Vec<ConceptId>> {
        self.thing_record(player)?;
        let mut roles: IndexSet<ConceptId> = IndexSet::new();
        for relation in self.things.values() {
            for (role, p) in &relation.role_players {
                if *p == player {
                    roles.insert(*role);
                }
            }
        }
        Ok(roles.into_iter().collect())
    }

    pub fn players_by_role_type(&self, relation: ConceptId, role_types: &[ConceptId]) -> EngineResult<Vec<ConceptId>> {
        let mut players: IndexSet<ConceptId> = IndexSet::new();
        for (role, player) in &self.thing_record(relation)?.role_players {
            if role_types.is_empty() || role_types.iter().any(|r| self.is_subtype_of(*role, *r)) {
                players.insert(*player);
            }
        }
        Ok(players.into_iter().collect())
    }

    pub fn role_players(&self, relation: ConceptId) -> EngineResult<Vec<(ConceptId, ConceptId)>> {
        Ok(self.thing_record(relation)?.role_players.clone())
    }

    pub fn relating(&self, relation: ConceptId) -> EngineResult<Vec<ConceptId>> {
        let roles: IndexSet<ConceptId> = self
            .thing_record(relation)?
            .role_players
            .iter()
            .map(|(role, _)| *role)
            .collect();
        Ok(roles.into_iter().collect())
    }

    pub fn attribute_owners(&self, attribute: ConceptId, owner_type: Option<ConceptId>) -> EngineResult<Vec<ConceptId>> {
        self.thing_record(attribute)?;
        Ok(self
            .things
            .values()
            .filter(|t| t.has.contains(&attribute))
            .filter(|t| owner_type.map(|o| self.is_subtype_of(t.type_id, o)).unwrap_or(true))
            .map(|t| t.id)
            .collect())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
