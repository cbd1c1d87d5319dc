//! Write-batching front for the host object store.
//!
//! Every `update` lands in one queue; the first write of a window schedules a
//! single flush a frame later, and everyone who wrote during that window
//! shares its completion handle. Reads see unflushed writes through a small
//! cache that is dropped right before the flush goes out.
//!
//! Must be used from inside a `tokio::task::LocalSet`.

use std::{
    cell::RefCell,
    collections::HashMap,
    rc::Rc,
    time::Duration,
};

use futures::{
    FutureExt,
    future::{LocalBoxFuture, Shared},
};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::scene::{HostError, ObjectFilter, ObjectId, ObjectStore, SceneObject};

pub type Mutator = Rc<dyn Fn(&mut SceneObject)>;

/// Resolves when the flush carrying a write has completed.
pub type FlushHandle = Shared<LocalBoxFuture<'static, Result<(), HostError>>>;

/// What an update is aimed at. Passing the object itself seeds the read cache.
pub enum UpdateTarget {
    Id(ObjectId),
    Object(SceneObject),
}

impl From<&str> for UpdateTarget {
    fn from(id: &str) -> Self {
        UpdateTarget::Id(id.to_string())
    }
}

impl From<ObjectId> for UpdateTarget {
    fn from(id: ObjectId) -> Self {
        UpdateTarget::Id(id)
    }
}

impl From<SceneObject> for UpdateTarget {
    fn from(object: SceneObject) -> Self {
        UpdateTarget::Object(object)
    }
}

#[derive(Default)]
struct ProxyState {
    queue: Vec<(ObjectId, Mutator)>,
    cache: HashMap<ObjectId, SceneObject>,
    /// Flush scheduled but not started.
    pending: Option<FlushHandle>,
    /// Flush currently talking to the store.
    in_flight: Option<FlushHandle>,
    flushes: usize,
}

#[derive(Clone)]
pub struct MutationProxy {
    store: Rc<dyn ObjectStore>,
    state: Rc<RefCell<ProxyState>>,
    flush_interval: Duration,
}

impl MutationProxy {
    pub fn new(store: Rc<dyn ObjectStore>, flush_interval: Duration) -> Self {
        Self {
            store,
            state: Rc::new(RefCell::new(ProxyState::default())),
            flush_interval,
        }
    }

    /// Queues `mutator` for the target and returns the handle of the flush
    /// that will carry it.
    pub fn update(
        &self,
        target: impl Into<UpdateTarget>,
        mutator: impl Fn(&mut SceneObject) + 'static,
    ) -> FlushHandle {
        let mutator: Mutator = Rc::new(mutator);
        let mut state = self.state.borrow_mut();

        let id = match target.into() {
            UpdateTarget::Id(id) => id,
            UpdateTarget::Object(object) => {
                let id = object.id.clone();
                state.cache.entry(id.clone()).or_insert(object);
                id
            }
        };
        if let Some(cached) = state.cache.get_mut(&id) {
            mutator(cached);
        }
        state.queue.push((id, mutator));

        if let Some(pending) = &state.pending {
            return pending.clone();
        }
        let handle = self.schedule_flush();
        state.pending = Some(handle.clone());
        handle
    }

    /// Latest known state of `id`: the cached copy of an unflushed write if
    /// there is one, otherwise the store's, read after any outstanding flush.
    pub async fn get(&self, id: &str) -> Result<Option<SceneObject>, HostError> {
        let waits = {
            let state = self.state.borrow();
            if let Some(cached) = state.cache.get(id) {
                return Ok(Some(cached.clone()));
            }
            [state.in_flight.clone(), state.pending.clone()]
        };
        for handle in waits.into_iter().flatten() {
            if let Err(err) = handle.await {
                debug!(error = %err, "read after failed flush");
            }
        }

        let filter = ObjectFilter::Ids(vec![id.to_string()]);
        let mut objects = self.store.get_objects(Some(&filter)).await?;
        Ok(objects.pop())
    }

    /// Reads through to the store, after outstanding writes have landed.
    pub async fn get_all(&self, filter: Option<&ObjectFilter>) -> Result<Vec<SceneObject>, HostError> {
        self.settle().await;
        self.store.get_objects(filter).await
    }

    /// Drops the read cache.
    pub fn invalidate(&self) {
        self.state.borrow_mut().cache.clear();
    }

    /// Waits for every write queued so far.
    pub async fn flush(&self) -> Result<(), HostError> {
        let waits = {
            let state = self.state.borrow();
            [state.in_flight.clone(), state.pending.clone()]
        };
        for handle in waits.into_iter().flatten() {
            handle.await?;
        }
        Ok(())
    }

    pub fn has_pending(&self) -> bool {
        let state = self.state.borrow();
        state.pending.is_some() || state.in_flight.is_some()
    }

    pub fn queued(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Number of batched writes issued so far.
    pub fn flush_count(&self) -> usize {
        self.state.borrow().flushes
    }

    async fn settle(&self) {
        if let Err(err) = self.flush().await {
            debug!(error = %err, "read after failed flush");
        }
    }

    fn schedule_flush(&self) -> FlushHandle {
        let (tx, rx) = oneshot::channel();
        let proxy = self.clone();
        let delay = self.flush_interval;
        tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            let result = proxy.run_flush().await;
            let _ = tx.send(result);
        });
        async move { rx.await.unwrap_or(Err(HostError::Unavailable)) }
            .boxed_local()
            .shared()
    }

    async fn run_flush(&self) -> Result<(), HostError> {
        let batch = {
            let mut state = self.state.borrow_mut();
            state.in_flight = state.pending.take();
            state.cache.clear();
            std::mem::take(&mut state.queue)
        };
        if batch.is_empty() {
            self.state.borrow_mut().in_flight = None;
            return Ok(());
        }

        let mutations = batch.len();
        let mut ids: Vec<ObjectId> = Vec::new();
        let mut by_id: HashMap<ObjectId, Vec<Mutator>> = HashMap::new();
        for (id, mutator) in batch {
            let list = by_id.entry(id.clone()).or_default();
            if list.is_empty() {
                ids.push(id);
            }
            list.push(mutator);
        }

        let result = self
            .store
            .update_objects(&ids, &mut |object: &mut SceneObject| {
                if let Some(mutators) = by_id.get(&object.id) {
                    for mutator in mutators {
                        mutator(object);
                    }
                }
            })
            .await;

        {
            let mut state = self.state.borrow_mut();
            state.in_flight = None;
            state.flushes += 1;
        }
        match &result {
            Ok(()) => debug!(objects = ids.len(), mutations, "flushed batch"),
            Err(err) => warn!(objects = ids.len(), mutations, error = %err, "batch flush failed"),
        }
        result
    }
}
