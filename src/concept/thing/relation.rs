use super::{Thing, ThingCore};
use crate::common::Iid;
use crate::concept::{ConceptFactory, ConceptStream, Deletable, RoleType, ThingOps};
use crate::connection::Transaction;
use crate::engine::{ConceptHandle, ConceptRequest, Cursor};
use crate::error::ConceptResult;
use indexmap::IndexMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An instance of a relation type, connecting players through roles
#[derive(Debug, Clone)]
pub struct Relation {
    core: ThingCore,
}

impl Relation {
    pub(crate) fn from_handle(handle: ConceptHandle) -> ConceptResult<Self> {
        Ok(Self {
            core: ThingCore::new(handle)?,
        })
    }

    pub fn handle(&self) -> &ConceptHandle {
        self.core.handle()
    }

    /// `player` must be allowed to play `role_type`, and the relation type must relate it
    pub fn add_role_player<P: ThingOps + ?Sized>(
        &self,
        tx: &Transaction,
        role_type: &RoleType,
        player: &P,
    ) -> ConceptResult<()> {
        tx.done(ConceptRequest::AddRolePlayer {
            relation: self.handle().clone(),
            role_type: role_type.handle().clone(),
            player: player.thing_handle().clone(),
        })
    }

    pub fn remove_role_player<P: ThingOps + ?Sized>(
        &self,
        tx: &Transaction,
        role_type: &RoleType,
        player: &P,
    ) -> ConceptResult<()> {
        tx.done(ConceptRequest::RemoveRolePlayer {
            relation: self.handle().clone(),
            role_type: role_type.handle().clone(),
            player: player.thing_handle().clone(),
        })
    }

    /// Players of any of `role_types`, or of every role if empty
    pub fn get_players_by_role_type(
        &self,
        tx: &Transaction,
        role_types: &[RoleType],
    ) -> ConceptResult<ConceptStream<Thing>> {
        tx.stream(ConceptRequest::GetPlayersByRoleType {
            relation: self.handle().clone(),
            role_types: role_types.iter().map(|r| r.handle().clone()).collect(),
        })
    }

    /// Players grouped by role, in the order roles were first filled
    pub fn get_role_players(&self, tx: &Transaction) -> ConceptResult<IndexMap<RoleType, Vec<Thing>>> {
        let mut cursor = tx
            .execute(ConceptRequest::GetRolePlayers {
                relation: self.handle().clone(),
            })?
            .into_role_players()?;
        let mut players: IndexMap<RoleType, Vec<Thing>> = IndexMap::new();
        while let Some((role, player)) = cursor.next()? {
            let role: RoleType = ConceptFactory::wrap_as(ConceptHandle::from(role))?;
            let player = Thing::of(ConceptHandle::from(player))?;
            players.entry(role).or_default().push(player);
        }
        Ok(players)
    }

    /// Roles this relation currently has players for
    pub fn get_relating(&self, tx: &Transaction) -> ConceptResult<ConceptStream<RoleType>> {
        tx.stream(ConceptRequest::GetRelating {
            relation: self.handle().clone(),
        })
    }
}

impl ThingOps for Relation {
    fn thing_handle(&self) -> &ConceptHandle {
        self.core.handle()
    }

    fn get_iid(&self) -> &Iid {
        self.core.iid()
    }
}

impl Deletable for Relation {
    fn delete(&self, tx: &Transaction) -> ConceptResult<()> {
        self.core.delete(tx)
    }

    fn is_deleted(&self, tx: &Transaction) -> ConceptResult<bool> {
        self.core.is_deleted(tx)
    }
}

impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        self.get_iid() == other.get_iid()
    }
}

impl Eq for Relation {}

impl Hash for Relation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.get_iid().hash(state);
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handle().rendering())
    }
}
