//! Applying change events to a loaded collection.
//!
//! Everything here is synchronous and side-effect free apart from the
//! `items` vector it is handed, which keeps the rules easy to test.

use quotebook_protocol::ChangeEvent;
use quotebook_protocol::Entity;
use quotebook_protocol::EntityId;

/// What [`reconcile`] did to the item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Inserted,
    Replaced,
    Removed,
    Ignored,
}

impl Reconciliation {
    pub fn changed(self) -> bool {
        !matches!(self, Reconciliation::Ignored)
    }
}

/// Applies `event` to `items` for a view whose membership test is `matches`.
///
/// New members go to the head of the list, existing ones are replaced in
/// place. A snapshot older than the one already held never overwrites it.
/// Applying the same event twice has the same effect as applying it once.
pub fn reconcile<E, F>(items: &mut Vec<E>, event: &ChangeEvent<E>, matches: F) -> Reconciliation
where
    E: Entity,
    F: Fn(&E) -> bool,
{
    match event {
        ChangeEvent::Created(entity) => {
            if !matches(entity) {
                return Reconciliation::Ignored;
            }
            match position(items, entity.id()) {
                Some(index) => replace(items, index, entity),
                None => {
                    items.insert(0, entity.clone());
                    Reconciliation::Inserted
                }
            }
        }
        ChangeEvent::Updated { entity, previous } => {
            let index = position(items, entity.id());
            let was_member =
                index.is_some() || previous.as_ref().is_some_and(|previous| matches(previous));
            let is_member = matches(entity);
            match (was_member, is_member, index) {
                (true, true, Some(index)) => replace(items, index, entity),
                // Belongs here but lives on a page we have not loaded yet.
                (true, true, None) => Reconciliation::Ignored,
                (false, true, _) => {
                    items.insert(0, entity.clone());
                    Reconciliation::Inserted
                }
                (true, false, Some(index)) => {
                    if entity.is_older_than(&items[index]) {
                        return Reconciliation::Ignored;
                    }
                    items.remove(index);
                    Reconciliation::Removed
                }
                (true, false, None) | (false, false, _) => Reconciliation::Ignored,
            }
        }
        ChangeEvent::Deleted(id) => remove(items, id),
    }
}

/// Appends a freshly fetched page, skipping ids that are already present.
/// Returns how many items were added.
pub fn append_page<E: Entity>(items: &mut Vec<E>, page: Vec<E>) -> usize {
    let before = items.len();
    for entity in page {
        if position(items, entity.id()).is_none() {
            items.push(entity);
        }
    }
    items.len() - before
}

fn remove<E: Entity>(items: &mut Vec<E>, id: &EntityId) -> Reconciliation {
    match position(items, id) {
        Some(index) => {
            items.remove(index);
            Reconciliation::Removed
        }
        None => Reconciliation::Ignored,
    }
}

fn position<E: Entity>(items: &[E], id: &EntityId) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}

fn replace<E: Entity>(items: &mut [E], index: usize, entity: &E) -> Reconciliation {
    if entity.is_older_than(&items[index]) {
        return Reconciliation::Ignored;
    }
    items[index] = entity.clone();
    Reconciliation::Replaced
}
