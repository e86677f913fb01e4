use super::cursor::MemoryCursor;
use super::render;
use super::store::{Store, TypeKind};
use super::DatabaseState;
use crate::config::TransactionOptions;
use crate::engine::{
    ConceptHandle, ConceptId, ConceptKind, ConceptRequest, ConceptResponse, EngineError,
    EngineResult, RawConcept, RawPayload, SessionType, TransactionId, TransactionOps,
    TransactionType,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

fn type_kind(kind: ConceptKind) -> TypeKind {
    match kind {
        ConceptKind::EntityType | ConceptKind::Entity => TypeKind::Entity,
        ConceptKind::RelationType | ConceptKind::Relation => TypeKind::Relation,
        ConceptKind::AttributeType | ConceptKind::Attribute => TypeKind::Attribute,
        ConceptKind::RoleType => TypeKind::Role,
    }
}

/// A transaction over a private copy of the database's committed store
pub struct MemoryTransaction {
    id: TransactionId,
    session_type: SessionType,
    transaction_type: TransactionType,
    options: TransactionOptions,
    database: Arc<DatabaseState>,
    working: Mutex<Store>,
    snapshot: Store,
    /// Committed version the snapshot was taken at
    base_version: u64,
    open: Arc<AtomicBool>,
}

impl MemoryTransaction {
    pub(super) fn open(
        database: Arc<DatabaseState>,
        session_type: SessionType,
        transaction_type: TransactionType,
        options: TransactionOptions,
    ) -> EngineResult<Self> {
        let (snapshot, base_version) = database.committed_copy()?;
        let id = TransactionId(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed));
        debug!(
            "Opened {:?} {:?} transaction {} on database '{}'",
            session_type, transaction_type, id, database.name
        );
        Ok(Self {
            id,
            session_type,
            transaction_type,
            options,
            database,
            working: Mutex::new(snapshot.clone()),
            snapshot,
            base_version,
            open: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn options(&self) -> &TransactionOptions {
        &self.options
    }

    fn store(&self) -> EngineResult<MutexGuard<'_, Store>> {
        self.working
            .lock()
            .map_err(|e| EngineError::Internal(format!("transaction store lock poisoned: {}", e)))
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(EngineError::TransactionClosed)
        }
    }

    /// Resolve a handle issued by this transaction
    fn resolve(&self, handle: &ConceptHandle) -> EngineResult<ConceptId> {
        if handle.owner() != self.id {
            return Err(EngineError::ForeignConcept);
        }
        Ok(handle.id())
    }

    fn resolve_all(&self, handles: &[ConceptHandle]) -> EngineResult<Vec<ConceptId>> {
        handles.iter().map(|h| self.resolve(h)).collect()
    }

    fn resolve_optional(&self, handle: &Option<ConceptHandle>) -> EngineResult<Option<ConceptId>> {
        handle.as_ref().map(|h| self.resolve(h)).transpose()
    }

    fn raw(&self, store: &Store, id: ConceptId) -> EngineResult<RawConcept> {
        if let Ok(record) = store.type_record(id) {
            return Ok(RawConcept {
                id,
                kind: render::type_tag(record.kind).to_string(),
                owner: self.id,
                rendering: render::type_rendering(record),
                payload: RawPayload::Type {
                    label: record.label.clone(),
                    is_root: record.is_root,
                    is_abstract: record.is_abstract,
                    value_type: record.value_type,
                },
            });
        }
        let record = store.thing_record(id)?;
        let thing_type = store.type_record(record.type_id)?;
        Ok(RawConcept {
            id,
            kind: render::thing_tag(thing_type.kind).to_string(),
            owner: self.id,
            rendering: render::thing_rendering(store, record)?,
            payload: RawPayload::Thing {
                iid: record.iid.clone(),
                type_: ConceptHandle::from(self.raw(store, record.type_id)?),
                inferred: false,
                value: record.value.clone(),
            },
        })
    }

    fn concept(&self, store: &Store, id: Option<ConceptId>) -> EngineResult<ConceptResponse> {
        Ok(ConceptResponse::Concept(
            id.map(|id| self.raw(store, id)).transpose()?,
        ))
    }

    fn stream(&self, store: &Store, ids: Vec<ConceptId>) -> EngineResult<ConceptResponse> {
        let answers = ids
            .into_iter()
            .map(|id| self.raw(store, id))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(ConceptResponse::Stream(Box::new(MemoryCursor::new(
            answers,
            self.options.prefetch_size,
            self.open.clone(),
        ))))
    }

    fn check_permission(&self, request: &ConceptRequest) -> EngineResult<()> {
        if request.is_write() && self.transaction_type.is_read() {
            return Err(EngineError::ReadOnly);
        }
        if request.is_schema_write() && self.session_type.is_data() {
            return Err(EngineError::SchemaWriteInDataSession);
        }
        Ok(())
    }

    fn dispatch(&self, store: &mut Store, request: ConceptRequest) -> EngineResult<ConceptResponse> {
        use ConceptRequest::*;
        let done = Ok(ConceptResponse::Done);
        match request {
            // ----- concept manager -----
            GetThingType { kind, label } => {
                let found = store
                    .type_by_label(&label)
                    .filter(|t| kind.is_type() && t.kind == type_kind(kind))
                    .map(|t| t.id);
                self.concept(store, found)
            }
            PutEntityType { label } => {
                let id = store.put_type(TypeKind::Entity, label, None)?;
                self.concept(store, Some(id))
            }
            PutRelationType { label } => {
                let id = store.put_type(TypeKind::Relation, label, None)?;
                self.concept(store, Some(id))
            }
            PutAttributeType { label, value_type } => {
                let id = store.put_type(TypeKind::Attribute, label, Some(value_type))?;
                self.concept(store, Some(id))
            }
            GetThing { kind, iid } => {
                let found = match store.thing_by_iid(&iid) {
                    Some(thing) => {
                        let thing_type = store.type_record(thing.type_id)?;
                        (kind.is_thing() && thing_type.kind == type_kind(kind)).then_some(thing.id)
                    }
                    None => None,
                };
                self.concept(store, found)
            }

            // ----- any type -----
            GetLabel { type_ } => {
                let id = self.resolve(&type_)?;
                Ok(ConceptResponse::Text(Some(store.type_record(id)?.label.to_string())))
            }
            SetLabel { type_, label } => {
                store.set_label(self.resolve(&type_)?, label.name())?;
                done
            }
            SetAbstract { type_ } => {
                store.set_abstract(self.resolve(&type_)?)?;
                done
            }
            UnsetAbstract { type_ } => {
                store.unset_abstract(self.resolve(&type_)?)?;
                done
            }
            GetSyntax { type_ } => {
                let id = self.resolve(&type_)?;
                Ok(ConceptResponse::Text(Some(render::syntax(store, id)?)))
            }
            SetSupertype { type_, supertype } => {
                store.set_supertype(self.resolve(&type_)?, self.resolve(&supertype)?)?;
                done
            }
            GetSupertype { type_ } => {
                let supertype = store.type_record(self.resolve(&type_)?)?.supertype;
                self.concept(store, supertype)
            }
            GetSupertypes { type_ } => {
                let ids = store.supertypes(self.resolve(&type_)?)?;
                self.stream(store, ids)
            }
            GetSubtypes {
                type_,
                transitivity,
                value_type,
            } => {
                let mut ids = store.subtypes(self.resolve(&type_)?, transitivity)?;
                if let Some(value_type) = value_type {
                    ids.retain(|id| {
                        store
                            .type_record(*id)
                            .map(|t| t.value_type == Some(value_type))
                            .unwrap_or(false)
                    });
                }
                self.stream(store, ids)
            }
            GetInstances {
                type_,
                transitivity,
            } => {
                let ids = store.instances(self.resolve(&type_)?, transitivity)?;
                self.stream(store, ids)
            }

            // ----- types and things -----
            Delete { concept } => {
                let id = self.resolve(&concept)?;
                if concept.label().is_some() {
                    store.delete_type(id)?;
                } else {
                    store.delete_thing(id)?;
                }
                done
            }
            IsDeleted { concept } => {
                let id = self.resolve(&concept)?;
                Ok(ConceptResponse::Bool(!store.contains(id)))
            }

            // ----- owns / plays -----
            SetOwns {
                owner,
                attribute_type,
                overridden,
                annotations,
            } => {
                store.set_owns(
                    self.resolve(&owner)?,
                    self.resolve(&attribute_type)?,
                    self.resolve_optional(&overridden)?,
                    &annotations,
                )?;
                done
            }
            UnsetOwns {
                owner,
                attribute_type,
            } => {
                store.unset_owns(self.resolve(&owner)?, self.resolve(&attribute_type)?)?;
                done
            }
            GetOwns {
                owner,
                value_type,
                transitivity,
                annotations,
            } => {
                let ids = store.owns_filtered(
                    self.resolve(&owner)?,
                    value_type,
                    transitivity,
                    &annotations,
                )?;
                self.stream(store, ids)
            }
            GetOwnsOverridden {
                owner,
                attribute_type,
            } => {
                let overridden =
                    store.owns_overridden(self.resolve(&owner)?, self.resolve(&attribute_type)?)?;
                self.concept(store, overridden)
            }
            SetPlays {
                player,
                role_type,
                overridden,
            } => {
                store.set_plays(
                    self.resolve(&player)?,
                    self.resolve(&role_type)?,
                    self.resolve_optional(&overridden)?,
                )?;
                done
            }
            UnsetPlays { player, role_type } => {
                store.unset_plays(self.resolve(&player)?, self.resolve(&role_type)?)?;
                done
            }
            GetPlays {
                player,
                transitivity,
            } => {
                let ids = store.plays(self.resolve(&player)?, transitivity)?;
                self.stream(store, ids)
            }
            GetPlaysOverridden { player, role_type } => {
                let overridden =
                    store.plays_overridden(self.resolve(&player)?, self.resolve(&role_type)?)?;
                self.concept(store, overridden)
            }
            Create { type_ } => {
                let id = store.create(self.resolve(&type_)?)?;
                self.concept(store, Some(id))
            }

            // ----- relates -----
            GetRelates {
                relation_type,
                role_label,
                transitivity,
            } => {
                let ids = store.relates(self.resolve(&relation_type)?, transitivity)?;
                match role_label {
                    None => self.stream(store, ids),
                    Some(name) => {
                        let found = ids.into_iter().find(|id| {
                            store
                                .type_record(*id)
                                .map(|t| t.label.name() == name)
                                .unwrap_or(false)
                        });
                        self.concept(store, found)
                    }
                }
            }
            GetRelatesOverridden {
                relation_type,
                role_label,
            } => {
                let overridden =
                    store.relates_overridden(self.resolve(&relation_type)?, &role_label)?;
                self.concept(store, overridden)
            }
            SetRelates {
                relation_type,
                role_label,
                overridden_label,
            } => {
                store.set_relates(
                    self.resolve(&relation_type)?,
                    &role_label,
                    overridden_label.as_deref(),
                )?;
                done
            }
            UnsetRelates {
                relation_type,
                role_label,
            } => {
                store.unset_relates(self.resolve(&relation_type)?, &role_label)?;
                done
            }

            // ----- attribute types -----
            Put {
                attribute_type,
                value,
            } => {
                let id = store.put_attribute(self.resolve(&attribute_type)?, value)?;
                self.concept(store, Some(id))
            }
            GetByValue {
                attribute_type,
                value,
            } => {
                let found = store.get_attribute(self.resolve(&attribute_type)?, &value)?;
                self.concept(store, found)
            }
            GetRegex { attribute_type } => {
                let id = self.resolve(&attribute_type)?;
                Ok(ConceptResponse::Text(store.type_record(id)?.regex.clone()))
            }
            SetRegex {
                attribute_type,
                regex,
            } => {
                store.set_regex(self.resolve(&attribute_type)?, &regex)?;
                done
            }
            UnsetRegex { attribute_type } => {
                store.unset_regex(self.resolve(&attribute_type)?)?;
                done
            }
            GetOwnerTypes {
                attribute_type,
                transitivity,
                annotations,
            } => {
                let ids =
                    store.owner_types(self.resolve(&attribute_type)?, transitivity, &annotations)?;
                self.stream(store, ids)
            }

            // ----- role types -----
            GetRoleRelationTypes { role_type } => {
                let ids = store.role_relation_types(self.resolve(&role_type)?)?;
                self.stream(store, ids)
            }
            GetPlayerTypes {
                role_type,
                transitivity,
            } => {
                let ids = store.player_types(self.resolve(&role_type)?, transitivity)?;
                self.stream(store, ids)
            }
            GetRelationInstances {
                role_type,
                transitivity,
            } => {
                let ids = store.relation_instances(self.resolve(&role_type)?, transitivity);
                self.stream(store, ids)
            }
            GetPlayerInstances {
                role_type,
                transitivity,
            } => {
                let ids = store.player_instances(self.resolve(&role_type)?, transitivity);
                self.stream(store, ids)
            }

            // ----- things -----
            GetHas {
                thing,
                attribute_types,
                annotations,
            } => {
                let ids = store.get_has(
                    self.resolve(&thing)?,
                    &self.resolve_all(&attribute_types)?,
                    &annotations,
                )?;
                self.stream(store, ids)
            }
            GetRelations { thing, role_types } => {
                let ids =
                    store.get_relations(self.resolve(&thing)?, &self.resolve_all(&role_types)?)?;
                self.stream(store, ids)
            }
            GetPlaying { thing } => {
                let ids = store.get_playing(self.resolve(&thing)?)?;
                self.stream(store, ids)
            }
            SetHas { thing, attribute } => {
                store.set_has(self.resolve(&thing)?, self.resolve(&attribute)?)?;
                done
            }
            UnsetHas { thing, attribute } => {
                store.unset_has(self.resolve(&thing)?, self.resolve(&attribute)?)?;
                done
            }

            // ----- relations -----
            AddRolePlayer {
                relation,
                role_type,
                player,
            } => {
                store.add_role_player(
                    self.resolve(&relation)?,
                    self.resolve(&role_type)?,
                    self.resolve(&player)?,
                )?;
                done
            }
            RemoveRolePlayer {
                relation,
                role_type,
                player,
            } => {
                store.remove_role_player(
                    self.resolve(&relation)?,
                    self.resolve(&role_type)?,
                    self.resolve(&player)?,
                )?;
                done
            }
            GetPlayersByRoleType {
                relation,
                role_types,
            } => {
                let ids = store.players_by_role_type(
                    self.resolve(&relation)?,
                    &self.resolve_all(&role_types)?,
                )?;
                self.stream(store, ids)
            }
            GetRolePlayers { relation } => {
                let pairs = store
                    .role_players(self.resolve(&relation)?)?
                    .into_iter()
                    .map(|(role, player)| Ok((self.raw(store, role)?, self.raw(store, player)?)))
                    .collect::<EngineResult<Vec<_>>>()?;
                Ok(ConceptResponse::RolePlayers(Box::new(MemoryCursor::new(
                    pairs,
                    self.options.prefetch_size,
                    self.open.clone(),
                ))))
            }
            GetRelating { relation } => {
                let ids = store.relating(self.resolve(&relation)?)?;
                self.stream(store, ids)
            }

            // ----- attributes -----
            GetAttributeOwners {
                attribute,
                owner_type,
            } => {
                let ids = store
                    .attribute_owners(self.resolve(&attribute)?, self.resolve_optional(&owner_type)?)?;
                self.stream(store, ids)
            }
        }
    }
}

impl TransactionOps for MemoryTransaction {
    fn id(&self) -> TransactionId {
        self.id
    }

    fn session_type(&self) -> SessionType {
        self.session_type
    }

    fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn execute(&self, request: ConceptRequest) -> EngineResult<ConceptResponse> {
        self.ensure_open()?;
        self.check_permission(&request)?;
        trace!("Transaction {} executing {:?}", self.id, request);
        let mut store = self.store()?;
        self.dispatch(&mut store, request)
    }

    fn commit(&self) -> EngineResult<()> {
        self.ensure_open()?;
        if self.transaction_type.is_read() {
            return Err(EngineError::ReadOnly);
        }
        let working = self.store()?.clone();
        // A commit ends the transaction whether or not it was accepted
        let published = self.database.publish(working, self.base_version);
        self.open.store(false, Ordering::Release);
        let version = published?;
        debug!(
            "Committed transaction {} on database '{}' as version {}",
            self.id, self.database.name, version
        );
        Ok(())
    }

    fn rollback(&self) -> EngineResult<()> {
        self.ensure_open()?;
        *self.store()? = self.snapshot.clone();
        debug!("Rolled back transaction {}", self.id);
        Ok(())
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            debug!("Closed transaction {}", self.id);
        }
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.open.store(false, Ordering::Release);
    }
}
