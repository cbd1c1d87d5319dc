//! Session: the explicit context that owns every runtime subsystem for one
//! scene and turns host notifications into registry dispatches.

use std::{
    collections::{BTreeSet, HashMap},
    rc::Rc,
};

use indexmap::IndexMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    compiler::CompileError,
    config::SessionConfig,
    graph::{BehaviorRecord, GraphError, RecordStamp},
    ir::CollisionPhase,
    runtime::{
        diff::{ItemDiff, ItemDiffer},
        registry::TriggerRegistry,
        services::Services,
        value::Value,
    },
    scene::{Host, HostError, ObjectId, ObjectStore, SceneObject, SceneResources},
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("stored behavior on `{object}` is malformed: {source}")]
    Behavior {
        object: ObjectId,
        #[source]
        source: GraphError,
    },
    #[error("behavior on `{object}` failed to compile: {source}")]
    Compile {
        object: ObjectId,
        #[source]
        source: CompileError,
    },
}

/// Everything the host can tell a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// Full object snapshot after an external change.
    Objects(Vec<SceneObject>),
    /// Currently selected object ids.
    Selection(Vec<ObjectId>),
    Broadcast {
        name: String,
        targets: Option<Vec<ObjectId>>,
    },
    /// Application-defined signal such as a dice roll.
    Signal {
        signal: String,
        targets: Option<Vec<ObjectId>>,
        payload: IndexMap<String, Value>,
    },
}

/// What one snapshot did to the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Objects whose behavior was (re)installed.
    pub installed: Vec<ObjectId>,
    /// Objects whose stored behavior failed to load or compile.
    pub failed: Vec<ObjectId>,
    pub collisions_started: usize,
    pub collisions_finished: usize,
    /// Executions started by property and collision events.
    pub dispatched: usize,
}

pub struct Session {
    services: Rc<Services>,
    registry: TriggerRegistry,
    differ: ItemDiffer,
    selection: BTreeSet<ObjectId>,
    /// Last stored record processed per object, whether it installed or
    /// failed. Independent of the registry, which forgets handlers on stop.
    handled: HashMap<ObjectId, RecordStamp>,
}

impl Session {
    pub fn new(config: SessionConfig, store: Rc<dyn ObjectStore>, host: Rc<dyn Host>) -> Self {
        let services = Rc::new(Services::new(config, store, host));
        let registry = TriggerRegistry::new(Rc::clone(&services));
        Self {
            services,
            registry,
            differ: ItemDiffer::new(),
            selection: BTreeSet::new(),
            handled: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &TriggerRegistry {
        &self.registry
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Reads scene resources from host metadata and declares their shared
    /// variables.
    pub async fn load_resources(&self) -> Result<SceneResources, SessionError> {
        let metadata = self.services.host.scene_metadata().await?;
        let resources =
            SceneResources::from_metadata(&metadata, &self.services.config.resources_key);
        debug!(
            sounds = resources.sounds.len(),
            variables = resources.variables.len(),
            "loaded scene resources"
        );
        self.services.set_resources(resources.clone());
        Ok(resources)
    }

    /// Reads the current objects straight from the store and processes them
    /// as the first snapshot.
    pub async fn sync(&mut self) -> Result<ChangeReport, SessionError> {
        let snapshot = self.services.store.get_objects(None).await?;
        Ok(self.handle_change(&snapshot))
    }

    /// Processes one full snapshot: installs or removes behaviors, fires
    /// property-changed triggers and collision triggers.
    pub fn handle_change(&mut self, snapshot: &[SceneObject]) -> ChangeReport {
        let diff = self.differ.update(snapshot);
        let mut report = ChangeReport {
            created: diff.created.len(),
            updated: diff.updated.len(),
            deleted: diff.deleted.len(),
            ..ChangeReport::default()
        };
        if diff.is_empty() {
            return report;
        }

        for id in diff.deleted_sorted() {
            self.registry.stop_behaviors_for_item(id, None);
            self.handled.remove(id.as_str());
        }
        for object in diff.touched() {
            match self.sync_behavior(object) {
                Ok(true) => report.installed.push(object.id.clone()),
                Ok(false) => {}
                Err(err) => {
                    warn!(object = %object.id, error = %err, "behavior not installed");
                    report.failed.push(object.id.clone());
                }
            }
        }
        if !diff.deleted.is_empty() || !report.installed.is_empty() {
            let pruned = self.services.procedures.borrow_mut().prune();
            if pruned > 0 {
                debug!(pruned, "dropped unused compiled procedures");
            }
        }

        for update in &diff.updated {
            for (property, value) in update.changed_properties() {
                report.dispatched +=
                    self.registry
                        .dispatch_property_changed(update.id(), property, &value);
            }
        }

        self.dispatch_collisions(&diff, &mut report);
        debug!(
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            dispatched = report.dispatched,
            "processed snapshot"
        );
        report
    }

    /// Replaces the selection set; fires selection-changed for every object
    /// that entered or left it. Returns how many executions started.
    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = ObjectId>) -> usize {
        let next: BTreeSet<ObjectId> = ids.into_iter().collect();
        let mut started = 0;
        for id in self.selection.difference(&next) {
            started += self.registry.dispatch_selection_changed(id, false);
        }
        for id in next.difference(&self.selection) {
            started += self.registry.dispatch_selection_changed(id, true);
        }
        self.selection = next;
        started
    }

    pub fn broadcast(&self, name: &str, targets: Option<&[ObjectId]>) -> usize {
        self.registry.dispatch_broadcast(name, targets)
    }

    pub fn signal(
        &self,
        signal: &str,
        targets: Option<&[ObjectId]>,
        payload: &IndexMap<String, Value>,
    ) -> usize {
        self.registry.dispatch_external(signal, targets, payload)
    }

    /// Applies one host event.
    pub fn apply(&mut self, event: SceneEvent) {
        match event {
            SceneEvent::Objects(snapshot) => {
                self.handle_change(&snapshot);
            }
            SceneEvent::Selection(ids) => {
                self.set_selection(ids);
            }
            SceneEvent::Broadcast { name, targets } => {
                self.broadcast(&name, targets.as_deref());
            }
            SceneEvent::Signal {
                signal,
                targets,
                payload,
            } => {
                self.signal(&signal, targets.as_deref(), &payload);
            }
        }
    }

    /// Consumes host events until the sender side closes. Must run inside a
    /// `tokio::task::LocalSet`.
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<SceneEvent>) {
        info!("session started");
        while let Some(event) = events.recv().await {
            self.apply(event);
        }
        info!("event stream closed");
    }

    /// Cancels every execution and waits for queued writes to land.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let stopped = self.registry.stop_all();
        self.services.proxy.flush().await?;
        info!(stopped, "session shut down");
        Ok(())
    }

    /// Installs the stored behavior when its record changed since it was
    /// last processed, or drops the installed one when the record
    /// disappeared. `Ok(true)` when a new procedure was installed. A record
    /// that fails to load or compile leaves the object with no handlers and
    /// is not retried until it changes.
    fn sync_behavior(&mut self, object: &SceneObject) -> Result<bool, SessionError> {
        let key = &self.services.config.behavior_key;
        let Some(raw) = object.metadata.get(key) else {
            if self.handled.remove(&object.id).is_some() {
                self.registry.stop_behaviors_for_item(&object.id, None);
            }
            return Ok(false);
        };

        let stamp = RecordStamp::of(raw);
        if self
            .handled
            .get(&object.id)
            .is_some_and(|&seen| !stamp.supersedes(seen))
        {
            return Ok(false);
        }
        self.handled.insert(object.id.clone(), stamp);

        let loaded = BehaviorRecord::from_json(raw)
            .and_then(|record| Ok((record.last_modified, record.graph.to_graph()?)));
        let (version, graph) = match loaded {
            Ok(loaded) => loaded,
            Err(source) => {
                let stopped = self.registry.stop_behaviors_for_item(&object.id, None);
                debug!(object = %object.id, stopped, "stopped behaviors of malformed record");
                return Err(SessionError::Behavior {
                    object: object.id.clone(),
                    source,
                });
            }
        };

        match self.registry.start_behavior(object, &graph, version, None) {
            Ok(started) => {
                debug!(object = %object.id, version, started, "behavior installed");
                Ok(true)
            }
            Err(source) => {
                self.services
                    .host
                    .notify(&format!("Behavior on {} failed to compile: {}", object.id, source));
                Err(SessionError::Compile {
                    object: object.id.clone(),
                    source,
                })
            }
        }
    }

    fn dispatch_collisions(&self, diff: &ItemDiff, report: &mut ChangeReport) {
        let update = self.services.collisions.borrow_mut().update(diff);
        report.collisions_started = update.new_collisions.len();
        report.collisions_finished = update.finished_collisions.len();
        for pair in &update.finished_collisions {
            report.dispatched += self.registry.dispatch_collision(pair, CollisionPhase::End);
        }
        for pair in &update.new_collisions {
            report.dispatched += self.registry.dispatch_collision(pair, CollisionPhase::Start);
        }
    }
}
