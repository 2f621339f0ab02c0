use crate::entity::Entity;
use crate::ids::EntityId;

/// Lifecycle notification for one logical write.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<E> {
    Created(E),
    Updated {
        entity: E,
        /// Snapshot the writer held before the update, when it had one.
        previous: Option<E>,
    },
    Deleted(EntityId),
}

impl<E: Entity> ChangeEvent<E> {
    pub fn entity_id(&self) -> &EntityId {
        match self {
            ChangeEvent::Created(entity) => entity.id(),
            ChangeEvent::Updated { entity, .. } => entity.id(),
            ChangeEvent::Deleted(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Created(_) => "created",
            ChangeEvent::Updated { .. } => "updated",
            ChangeEvent::Deleted(_) => "deleted",
        }
    }
}
