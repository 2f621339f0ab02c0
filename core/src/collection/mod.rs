//! Paginated, self-synchronising collections.
//!
//! A [`CollectionController`] owns the [`CollectionState`] of one view. It
//! loads pages on demand, performs writes through its gateway, and listens on
//! the [`ChangeBus`] so that writes made by any other controller over the same
//! entity type are folded into its items without a round trip.

mod state;

use parking_lot::Mutex;
use quotebook_backend_client::ApiError;
use quotebook_backend_client::EntityGateway;
use quotebook_backend_client::RemoteEntity;
use quotebook_protocol::ChangeEvent;
use quotebook_protocol::EntityId;
use quotebook_protocol::Page;
use std::fmt;
use std::sync::Arc;
use std::sync::Weak;
use tokio::sync::broadcast;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use crate::bus::ChangeBus;
use crate::bus::ChangeNotice;
use crate::bus::CollectionId;
use crate::membership::Reconciliation;
use crate::membership::append_page;
use crate::membership::reconcile;
use crate::views::CollectionView;

pub use state::CollectionState;
pub use state::PREFETCH_WINDOW;

/// Result of a `load_next` or `refresh` call.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// A page was applied; `added` counts new items.
    Loaded { added: usize },
    /// Already loading, already on the last page, or nothing to do.
    Skipped,
    /// Superseded by a refresh or by disposal; nothing was applied.
    Cancelled,
    Failed(ApiError),
}

/// Bookkeeping for the single in-flight page load.
struct LoadSlot {
    /// Bumped by every refresh and by dispose; a response whose epoch no
    /// longer matches is discarded.
    epoch: u64,
    cancel: CancellationToken,
    /// Set by refresh: the next successful page replaces the items.
    replace_items: bool,
    disposed: bool,
}

struct Inner<E: RemoteEntity> {
    id: CollectionId,
    view: Arc<dyn CollectionView<E>>,
    page_size: u32,
    gateway: Arc<dyn EntityGateway<E>>,
    bus: ChangeBus<E>,
    state: watch::Sender<CollectionState<E>>,
    load: Mutex<LoadSlot>,
}

/// Page load claimed under the slot lock, run after it is released.
struct PendingLoad {
    epoch: u64,
    cancel: CancellationToken,
    page: u32,
}

pub struct CollectionController<E: RemoteEntity> {
    inner: Arc<Inner<E>>,
    subscription: JoinHandle<()>,
}

impl<E: RemoteEntity> fmt::Debug for CollectionController<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionController")
            .field("id", &self.inner.id)
            .field("view", &self.inner.view.to_string())
            .finish_non_exhaustive()
    }
}

impl<E: RemoteEntity> CollectionController<E> {
    /// Creates an empty controller and subscribes it to `bus`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        view: impl CollectionView<E>,
        gateway: Arc<dyn EntityGateway<E>>,
        bus: ChangeBus<E>,
        page_size: u32,
    ) -> Self {
        let (state, _) = watch::channel(CollectionState::default());
        let inner = Arc::new(Inner {
            id: bus.register(),
            view: Arc::new(view),
            page_size: page_size.max(1),
            gateway,
            bus,
            state,
            load: Mutex::new(LoadSlot {
                epoch: 0,
                cancel: CancellationToken::new(),
                replace_items: false,
                disposed: false,
            }),
        });
        let receiver = inner.bus.subscribe();
        let subscription = tokio::spawn(follow_changes(Arc::downgrade(&inner), receiver));
        Self {
            inner,
            subscription,
        }
    }

    pub fn id(&self) -> CollectionId {
        self.inner.id
    }

    pub fn view(&self) -> &dyn CollectionView<E> {
        self.inner.view.as_ref()
    }

    pub fn state(&self) -> CollectionState<E> {
        self.inner.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<E> {
        self.inner.state.borrow().items.clone()
    }

    /// Receiver notified on every state change.
    pub fn watch(&self) -> watch::Receiver<CollectionState<E>> {
        self.inner.state.subscribe()
    }

    /// Loads the page at the cursor. No-op while a load is in flight or once
    /// the last page has been reached.
    pub async fn load_next(&self) -> LoadOutcome {
        self.inner.load_next().await
    }

    /// Drops any in-flight load and starts over from page 1. Current items
    /// stay visible until the first page arrives.
    pub async fn refresh(&self) -> LoadOutcome {
        self.inner.refresh().await
    }

    /// Loads the next page when `item` is close to the end of the list.
    pub async fn load_more_if_needed(&self, item: &E) -> LoadOutcome {
        let near_end = self.inner.state.borrow().is_near_end(item);
        if near_end {
            self.inner.load_next().await
        } else {
            LoadOutcome::Skipped
        }
    }

    /// Fetches one entity without touching pagination.
    pub async fn fetch_one(&self, id: &EntityId) -> Result<E, ApiError> {
        self.inner.gateway.fetch_one(id).await
    }

    pub async fn create(&self, draft: &E::Draft) -> Result<E, ApiError> {
        let created = self.inner.gateway.create(draft).await?;
        self.inner.commit(ChangeEvent::Created(created.clone()));
        Ok(created)
    }

    pub async fn update(&self, id: &EntityId, draft: &E::Draft) -> Result<E, ApiError> {
        let previous = self
            .inner
            .state
            .borrow()
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned();
        let updated = self.inner.gateway.update(id, draft).await?;
        self.inner.commit(ChangeEvent::Updated {
            entity: updated.clone(),
            previous,
        });
        Ok(updated)
    }

    pub async fn delete(&self, id: &EntityId) -> Result<(), ApiError> {
        self.inner.gateway.delete(id).await?;
        self.inner.commit(ChangeEvent::Deleted(id.clone()));
        Ok(())
    }

    /// Cancels the active load and stops following the change bus. Late
    /// responses are discarded. Idempotent.
    pub fn dispose(&self) {
        {
            let mut slot = self.inner.load.lock();
            if !slot.disposed {
                slot.disposed = true;
                slot.epoch += 1;
                slot.cancel.cancel();
            }
        }
        self.subscription.abort();
        self.inner.state.send_if_modified(|state| {
            let was_loading = state.is_loading;
            state.is_loading = false;
            was_loading
        });
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.load.lock().disposed
    }
}

impl<E: RemoteEntity> Drop for CollectionController<E> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<E: RemoteEntity> Inner<E> {
    async fn load_next(&self) -> LoadOutcome {
        let pending = {
            let slot = self.load.lock();
            if slot.disposed {
                return LoadOutcome::Cancelled;
            }
            self.claim_load(&slot)
        };
        match pending {
            Some(pending) => self.run_load(pending).await,
            None => LoadOutcome::Skipped,
        }
    }

    /// Supersedes any in-flight load and claims page 1 in the same critical
    /// section, so no concurrent `load_next` can slip in between.
    async fn refresh(&self) -> LoadOutcome {
        let pending = {
            let mut slot = self.load.lock();
            if slot.disposed {
                return LoadOutcome::Cancelled;
            }
            slot.cancel.cancel();
            slot.cancel = CancellationToken::new();
            slot.epoch += 1;
            slot.replace_items = true;
            self.state.send_modify(|state| {
                state.cursor = 1;
                state.is_last_page = false;
                state.is_loading = false;
            });
            self.claim_load(&slot)
        };
        debug!("{}: refreshing", self.view);
        match pending {
            Some(pending) => self.run_load(pending).await,
            None => LoadOutcome::Skipped,
        }
    }

    /// Marks the state as loading and returns the page to fetch, or `None`
    /// when loading more is not possible. Caller holds the slot lock.
    fn claim_load(&self, slot: &LoadSlot) -> Option<PendingLoad> {
        let mut page = None;
        self.state.send_if_modified(|state| {
            if !state.can_load_more() {
                return false;
            }
            state.is_loading = true;
            state.last_error = None;
            page = Some(state.cursor);
            true
        });
        page.map(|page| PendingLoad {
            epoch: slot.epoch,
            cancel: slot.cancel.clone(),
            page,
        })
    }

    async fn run_load(&self, pending: PendingLoad) -> LoadOutcome {
        let PendingLoad {
            epoch,
            cancel,
            page,
        } = pending;
        let endpoint = self.view.page_endpoint(page, self.page_size);
        debug!("{}: loading page {page}", self.view);
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            result = self.gateway.fetch_page(&endpoint) => result,
        };
        self.apply_page(epoch, page, result)
    }

    fn apply_page(&self, epoch: u64, page: u32, result: Result<Page<E>, ApiError>) -> LoadOutcome {
        let mut slot = self.load.lock();
        if slot.epoch != epoch {
            debug!("{}: discarding superseded page {page}", self.view);
            return LoadOutcome::Cancelled;
        }

        match result {
            Ok(fetched) => {
                let replace = slot.replace_items;
                slot.replace_items = false;
                let mut added = 0;
                self.state.send_modify(|state| {
                    if replace {
                        state.items.clear();
                        state.is_stale = false;
                    }
                    added = append_page(&mut state.items, fetched.items);
                    state.pagination = Some(fetched.pagination);
                    if fetched.pagination.is_last_page() {
                        state.is_last_page = true;
                    } else {
                        state.cursor = page + 1;
                    }
                    state.is_loading = false;
                });
                LoadOutcome::Loaded { added }
            }
            Err(ApiError::Cancelled) => {
                self.state.send_modify(|state| state.is_loading = false);
                LoadOutcome::Cancelled
            }
            Err(err) => {
                warn!("{}: loading page {page} failed: {err}", self.view);
                self.state.send_modify(|state| {
                    state.is_loading = false;
                    state.last_error = Some(err.clone());
                });
                LoadOutcome::Failed(err)
            }
        }
    }

    /// Applies a write this controller performed, then tells everyone else.
    fn commit(&self, event: ChangeEvent<E>) {
        self.reconcile(&event);
        self.bus.publish(Some(self.id), event);
    }

    fn reconcile(&self, event: &ChangeEvent<E>) -> Reconciliation {
        let mut outcome = Reconciliation::Ignored;
        self.state.send_if_modified(|state| {
            outcome = reconcile(&mut state.items, event, |entity| self.view.contains(entity));
            outcome.changed()
        });
        outcome
    }

    fn on_notice(&self, notice: ChangeNotice<E>) {
        if notice.origin == Some(self.id) {
            return;
        }
        let outcome = self.reconcile(&notice.event);
        if outcome.changed() {
            debug!(
                "{}: {} {} -> {outcome:?}",
                self.view,
                notice.event.kind(),
                notice.event.entity_id()
            );
        }
    }

    fn mark_stale(&self, missed: u64) {
        warn!("{}: missed {missed} change events; items may be stale", self.view);
        self.state.send_if_modified(|state| {
            let was_stale = state.is_stale;
            state.is_stale = true;
            !was_stale
        });
    }
}

async fn follow_changes<E: RemoteEntity>(
    inner: Weak<Inner<E>>,
    mut receiver: broadcast::Receiver<ChangeNotice<E>>,
) {
    loop {
        let received = receiver.recv().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        match received {
            Ok(notice) => inner.on_notice(notice),
            Err(broadcast::error::RecvError::Lagged(missed)) => inner.mark_stale(missed),
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
