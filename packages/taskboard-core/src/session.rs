//! Browsing/editing state machine driving a [`PartitionStore`].
//!
//! Field edits only touch the edit buffer; the store sees nothing until [`SyncSession::commit`].
//! While an edit is open the unload guard is installed, and [`SyncSession::before_unload`]
//! flushes the in-memory graph so a closed tab does not lose the last saved state.

use tracing::debug;

use crate::backend::Backend;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::ids::{EntityId, EntityKind};
use crate::store::PartitionStore;
use crate::traits::AccessControl;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditOrigin {
    New,
    Existing(EntityId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Browsing,
    Editing { buffer: Entity, origin: EditOrigin },
}

#[derive(Clone, Debug)]
pub struct SyncSession {
    current: EntityKind,
    state: SessionState,
    unload_guard: bool,
}

impl SyncSession {
    pub fn new(current: EntityKind) -> Self {
        Self {
            current,
            state: SessionState::Browsing,
            unload_guard: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_partition(&self) -> EntityKind {
        self.current
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, SessionState::Editing { .. })
    }

    pub fn unload_guard_installed(&self) -> bool {
        self.unload_guard
    }

    /// The record open for editing, if any.
    pub fn current_entity(&self) -> Option<&Entity> {
        self.buffer()
    }

    pub fn buffer(&self) -> Option<&Entity> {
        match &self.state {
            SessionState::Editing { buffer, .. } => Some(buffer),
            SessionState::Browsing => None,
        }
    }

    pub fn buffer_mut(&mut self) -> Option<&mut Entity> {
        match &mut self.state {
            SessionState::Editing { buffer, .. } => Some(buffer),
            SessionState::Browsing => None,
        }
    }

    pub fn select_partition(&mut self, kind: EntityKind) -> Result<()> {
        self.require_browsing("switch partitions")?;
        debug!(from = %self.current, to = %kind, "partition selected");
        self.current = kind;
        Ok(())
    }

    /// Open an edit buffer holding a blank record of the current partition.
    pub fn begin_create<B, A>(&mut self, store: &PartitionStore<B, A>) -> Result<()>
    where
        B: Backend,
        A: AccessControl,
    {
        self.require_browsing("start creating")?;
        store.access().can_write(self.current)?;
        let buffer = store.graph().partition(self.current).default_entity();
        self.open(buffer, EditOrigin::New);
        Ok(())
    }

    /// Open an edit buffer holding a copy of the stored entity `id`.
    pub fn begin_edit<B, A>(&mut self, store: &PartitionStore<B, A>, id: &EntityId) -> Result<()>
    where
        B: Backend,
        A: AccessControl,
    {
        self.require_browsing("start editing")?;
        let buffer = store
            .get(self.current, id)?
            .cloned()
            .ok_or_else(|| Error::NotFound {
                kind: self.current,
                id: id.clone(),
            })?;
        self.open(buffer, EditOrigin::Existing(id.clone()));
        Ok(())
    }

    /// Save the buffer and return to browsing. On any error the session stays in editing with
    /// the buffer as it was.
    pub fn commit<B, A>(&mut self, store: &mut PartitionStore<B, A>) -> Result<EntityId>
    where
        B: Backend,
        A: AccessControl,
    {
        let SessionState::Editing { buffer, origin } = &self.state else {
            return Err(Error::InvalidTransition("nothing is being edited".into()));
        };
        let id = match origin {
            EditOrigin::New => store.create(buffer.clone())?,
            EditOrigin::Existing(id) => {
                store.update(id, buffer.clone())?;
                id.clone()
            }
        };
        debug!(kind = %self.current, %id, "edit committed");
        self.close();
        Ok(id)
    }

    /// Drop the buffer and return to browsing.
    pub fn cancel(&mut self) -> Result<()> {
        if !self.is_editing() {
            return Err(Error::InvalidTransition("nothing is being edited".into()));
        }
        debug!(kind = %self.current, "edit canceled");
        self.close();
        Ok(())
    }

    /// Page unload hook. Flushes the graph when the guard is installed and reports whether it
    /// did.
    pub fn before_unload<B, A>(&mut self, store: &mut PartitionStore<B, A>) -> Result<bool>
    where
        B: Backend,
        A: AccessControl,
    {
        if !self.unload_guard {
            return Ok(false);
        }
        debug!(kind = %self.current, "flushing before unload");
        store.flush(self.current)?;
        Ok(true)
    }

    fn require_browsing(&self, action: &str) -> Result<()> {
        if self.is_editing() {
            return Err(Error::InvalidTransition(format!(
                "cannot {action} while an edit is open"
            )));
        }
        Ok(())
    }

    fn open(&mut self, buffer: Entity, origin: EditOrigin) {
        debug!(kind = %self.current, ?origin, "edit opened");
        self.state = SessionState::Editing { buffer, origin };
        self.unload_guard = true;
    }

    fn close(&mut self) {
        self.state = SessionState::Browsing;
        self.unload_guard = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::local::LocalBackend;
    use crate::entity::Member;
    use crate::traits::{AllowAllAccess, MemoryKeyValueStore};

    fn store() -> PartitionStore<LocalBackend<MemoryKeyValueStore>> {
        PartitionStore::open(LocalBackend::new(MemoryKeyValueStore::new()), AllowAllAccess).unwrap()
    }

    #[test]
    fn starts_browsing_without_guard() {
        let session = SyncSession::new(EntityKind::Project);
        assert_eq!(session.state(), &SessionState::Browsing);
        assert!(!session.unload_guard_installed());
        assert!(session.current_entity().is_none());
    }

    #[test]
    fn partition_switch_is_refused_while_editing() {
        let store = store();
        let mut session = SyncSession::new(EntityKind::Member);
        session.begin_create(&store).unwrap();
        assert!(matches!(
            session.select_partition(EntityKind::Task),
            Err(Error::InvalidTransition(_))
        ));
        session.cancel().unwrap();
        session.select_partition(EntityKind::Task).unwrap();
    }

    #[test]
    fn invalid_buffer_stays_open() {
        let mut store = store();
        let mut session = SyncSession::new(EntityKind::Member);
        session.begin_create(&store).unwrap();
        assert!(matches!(session.commit(&mut store), Err(Error::Validation(_))));
        assert!(session.is_editing());
        assert!(session.unload_guard_installed());

        *session.buffer_mut().unwrap() = Entity::Member(Member {
            last_name: "Ivanov".into(),
            first_name: "Ivan".into(),
            ..Member::default()
        });
        let id = session.commit(&mut store).unwrap();
        assert_eq!(id, "0");
        assert!(!session.is_editing());
        assert!(!session.unload_guard_installed());
    }
}
