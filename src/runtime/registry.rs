//! Trigger registry: installs compiled handlers per object and starts or
//! cancels their executions in reaction to events.
//!
//! For a given handler at most one execution is live. Starting it again
//! cancels its own previous run, never another handler's. Dispatch order is
//! deterministic: objects in installation order, handlers in declaration
//! order.

use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;
use serde_json::Value as Json;
use tracing::{debug, error, trace};

use crate::{
    compiler::CompileError,
    graph::{BlockGraph, to_hex},
    ir::{CollisionPhase, CompiledHandler, CompiledProcedure, HandlerDescriptor, TriggerKind},
    runtime::{
        cancel::CancellationController,
        collision::CollisionPair,
        interpreter::{Execution, ExecutionContext},
        services::Services,
        value::Value,
    },
    scene::{ObjectId, SceneObject, TrackedProperty},
};

struct LiveRun {
    controller: CancellationController,
    run: u64,
}

struct InstalledHandler {
    handler: CompiledHandler,
    live: Option<LiveRun>,
}

impl InstalledHandler {
    fn hat_id(&self) -> &str {
        &self.handler.descriptor.hat_id
    }

    fn cancel(&mut self) -> bool {
        match self.live.take() {
            Some(live) => {
                live.controller.cancel();
                true
            }
            None => false,
        }
    }
}

struct ObjectBehaviors {
    version: u64,
    /// Keeps the cache entry alive while installed.
    procedure: Option<Rc<CompiledProcedure>>,
    /// Local variable ids by slot of `locals`.
    layout: Vec<String>,
    locals: Rc<RefCell<Vec<Value>>>,
    handlers: Vec<InstalledHandler>,
}

/// The handler kept alive across a reinstall, with the locals it writes to.
struct Survivor {
    handler: InstalledHandler,
    layout: Vec<String>,
    locals: Rc<RefCell<Vec<Value>>>,
}

#[derive(Default)]
struct RegistryState {
    objects: IndexMap<ObjectId, ObjectBehaviors>,
    next_run: u64,
}

#[derive(Clone)]
pub struct TriggerRegistry {
    services: Rc<Services>,
    state: Rc<RefCell<RegistryState>>,
}

impl TriggerRegistry {
    pub fn new(services: Rc<Services>) -> Self {
        Self {
            services,
            state: Rc::new(RefCell::new(RegistryState::default())),
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Replaces the object's handlers with those compiled from `graph`, then
    /// runs its immediate handlers and, for a fresh clone, its start-as-clone
    /// handlers. The handler named by `except_hat` keeps running across the
    /// swap. Returns how many executions were started.
    ///
    /// The survivor keeps sharing locals with the new handlers when the
    /// local slot layout is unchanged; otherwise it keeps its own copy.
    ///
    /// On a compile error the previous handlers stay stopped.
    pub fn start_behavior(
        &self,
        object: &SceneObject,
        graph: &BlockGraph,
        version: u64,
        except_hat: Option<&str>,
    ) -> Result<usize, CompileError> {
        let survivor = self.detach(&object.id, except_hat);

        let options = self.services.compile_options.borrow().clone();
        let compiled = self
            .services
            .procedures
            .borrow_mut()
            .get_or_compile(graph, &options);
        let procedure = match compiled {
            Ok(procedure) => procedure,
            Err(err) => {
                error!(object = %object.id, code = err.code(), error = %err, "behavior failed to compile");
                if let Some(Survivor { handler, layout, locals }) = survivor {
                    self.install(&object.id, version, None, vec![handler], layout, Some(locals));
                }
                return Err(err);
            }
        };

        let mut handlers: Vec<InstalledHandler> = procedure
            .handlers
            .iter()
            .map(|handler| InstalledHandler {
                handler: handler.clone(),
                live: None,
            })
            .collect();
        let mut shared = None;
        if let Some(Survivor { mut handler, layout, locals }) = survivor {
            if layout == procedure.locals {
                shared = Some(locals);
            }
            match handlers.iter_mut().find(|h| h.hat_id() == handler.hat_id()) {
                Some(slot) => slot.live = handler.live.take(),
                None => handlers.push(handler),
            }
        }
        debug!(
            object = %object.id,
            version,
            handlers = handlers.len(),
            hash = %to_hex(&procedure.hash),
            "installed behavior"
        );
        self.install(
            &object.id,
            version,
            Some(Rc::clone(&procedure)),
            handlers,
            procedure.locals.clone(),
            shared,
        );

        let mut started = 0;
        let immediate: Vec<String> = procedure
            .immediate()
            .map(|handler| handler.descriptor.hat_id.clone())
            .collect();
        for hat in &immediate {
            started += usize::from(self.start(&object.id, hat, None));
        }

        if self.is_fresh_clone(object) {
            let clone_hats: Vec<String> = procedure
                .handlers
                .iter()
                .filter(|h| matches!(h.descriptor.kind, TriggerKind::StartAsClone))
                .map(|h| h.descriptor.hat_id.clone())
                .collect();
            for hat in &clone_hats {
                started += usize::from(self.start(&object.id, hat, None));
            }
            let key = self.services.config.clone_flag_key.clone();
            // Completion is not awaited; the flag clears with the next batch.
            let _ = self.services.proxy.update(object.id.clone(), move |o| {
                o.metadata.remove(&key);
            });
        }
        Ok(started)
    }

    /// Cancels the object's executions and drops its handlers, except the
    /// one whose hat is `except_hat`. Returns how many live executions were
    /// cancelled.
    pub fn stop_behaviors_for_item(&self, object_id: &str, except_hat: Option<&str>) -> usize {
        let mut state = self.state.borrow_mut();
        let Some(behaviors) = state.objects.get_mut(object_id) else {
            return 0;
        };

        let mut stopped = 0;
        behaviors.handlers.retain_mut(|handler| {
            if except_hat == Some(handler.hat_id()) {
                return true;
            }
            stopped += usize::from(handler.cancel());
            false
        });
        if behaviors.handlers.is_empty() {
            state.objects.shift_remove(object_id);
        }
        debug!(object = object_id, stopped, "stopped behaviors");
        stopped
    }

    /// Cancels everything and forgets every handler.
    pub fn stop_all(&self) -> usize {
        let objects = std::mem::take(&mut self.state.borrow_mut().objects);
        let stopped = objects
            .into_values()
            .flat_map(|behaviors| behaviors.handlers)
            .map(|mut handler| usize::from(handler.cancel()))
            .sum();
        debug!(stopped, "stopped all behaviors");
        stopped
    }

    /// Objects that currently have any installed handler.
    pub fn get_behavior_item_ids(&self) -> Vec<ObjectId> {
        self.state.borrow().objects.keys().cloned().collect()
    }

    pub fn installed_version(&self, object_id: &str) -> Option<u64> {
        self.state
            .borrow()
            .objects
            .get(object_id)
            .map(|behaviors| behaviors.version)
    }

    pub fn installed_hash(&self, object_id: &str) -> Option<[u8; 32]> {
        self.state
            .borrow()
            .objects
            .get(object_id)
            .and_then(|behaviors| behaviors.procedure.as_ref())
            .map(|procedure| procedure.hash)
    }

    pub fn descriptors(&self, object_id: &str) -> Vec<HandlerDescriptor> {
        self.state
            .borrow()
            .objects
            .get(object_id)
            .map(|behaviors| {
                behaviors
                    .handlers
                    .iter()
                    .map(|h| h.handler.descriptor.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn live_count(&self) -> usize {
        self.state
            .borrow()
            .objects
            .values()
            .flat_map(|behaviors| &behaviors.handlers)
            .filter(|handler| handler.live.is_some())
            .count()
    }

    pub fn is_running(&self, object_id: &str, hat_id: &str) -> bool {
        self.state
            .borrow()
            .objects
            .get(object_id)
            .and_then(|behaviors| behaviors.handlers.iter().find(|h| h.hat_id() == hat_id))
            .is_some_and(|handler| handler.live.is_some())
    }

    /// `targets` restricts delivery to the listed objects.
    pub fn dispatch_broadcast(&self, name: &str, targets: Option<&[ObjectId]>) -> usize {
        let hits = self.collect(|object_id, kind| {
            targets.is_none_or(|ids| ids.iter().any(|id| id == object_id))
                && matches!(kind, TriggerKind::Broadcast { name: wanted } if wanted == name)
        });
        let started = self.start_all(hits, None);
        trace!(broadcast = name, started, "dispatched broadcast");
        started
    }

    pub fn dispatch_property_changed(
        &self,
        object_id: &str,
        property: TrackedProperty,
        value: &Value,
    ) -> usize {
        let hits = self.collect(|id, kind| {
            id == object_id
                && matches!(
                    kind,
                    TriggerKind::PropertyChanged { property: p, matcher }
                        if *p == property && matcher.matches(value)
                )
        });
        self.start_all(hits, None)
    }

    pub fn dispatch_selection_changed(&self, object_id: &str, selected: bool) -> usize {
        let hits = self.collect(|id, kind| {
            id == object_id
                && matches!(kind, TriggerKind::SelectionChanged { selected: s } if *s == selected)
        });
        self.start_all(hits, None)
    }

    /// Fires both directions of the pair; each side sees the other as
    /// `other_id`.
    pub fn dispatch_collision(&self, pair: &CollisionPair, phase: CollisionPhase) -> usize {
        let mut started = 0;
        for (me, other) in [(&pair.a, &pair.b), (&pair.b, &pair.a)] {
            let hits = self.collect(|id, kind| {
                id == me.as_str()
                    && matches!(kind, TriggerKind::Collision { phase: p } if *p == phase)
            });
            started += self.start_all(hits, Some(other.clone()));
        }
        started
    }

    /// Application-defined signals; a handler matches when each of its
    /// criteria accepts the payload value under the same key.
    pub fn dispatch_external(
        &self,
        signal: &str,
        targets: Option<&[ObjectId]>,
        payload: &IndexMap<String, Value>,
    ) -> usize {
        let hits = self.collect(|object_id, kind| {
            if !targets.is_none_or(|ids| ids.iter().any(|id| id == object_id)) {
                return false;
            }
            match kind {
                TriggerKind::External {
                    signal: wanted,
                    criteria,
                } if wanted == signal => criteria
                    .iter()
                    .all(|(key, matcher)| matcher.matches(payload.get(key).unwrap_or(&Value::Nothing))),
                _ => false,
            }
        });
        let started = self.start_all(hits, None);
        trace!(signal, started, "dispatched external signal");
        started
    }

    fn is_fresh_clone(&self, object: &SceneObject) -> bool {
        matches!(
            object.metadata.get(&self.services.config.clone_flag_key),
            Some(Json::Bool(true))
        )
    }

    fn detach(&self, object_id: &str, except_hat: Option<&str>) -> Option<Survivor> {
        let behaviors = self.state.borrow_mut().objects.shift_remove(object_id)?;
        let mut survivor = None;
        for mut handler in behaviors.handlers {
            if survivor.is_none() && except_hat == Some(handler.hat_id()) {
                survivor = Some(handler);
            } else {
                handler.cancel();
            }
        }
        survivor.map(|handler| Survivor {
            handler,
            layout: behaviors.layout,
            locals: behaviors.locals,
        })
    }

    fn install(
        &self,
        object_id: &str,
        version: u64,
        procedure: Option<Rc<CompiledProcedure>>,
        handlers: Vec<InstalledHandler>,
        layout: Vec<String>,
        locals: Option<Rc<RefCell<Vec<Value>>>>,
    ) {
        let locals =
            locals.unwrap_or_else(|| Rc::new(RefCell::new(vec![Value::Nothing; layout.len()])));
        self.state.borrow_mut().objects.insert(
            object_id.to_string(),
            ObjectBehaviors {
                version,
                procedure,
                layout,
                locals,
                handlers,
            },
        );
    }

    fn collect(&self, wants: impl Fn(&str, &TriggerKind) -> bool) -> Vec<(ObjectId, String)> {
        let state = self.state.borrow();
        let mut hits = Vec::new();
        for (object_id, behaviors) in &state.objects {
            for handler in &behaviors.handlers {
                if wants(object_id, &handler.handler.descriptor.kind) {
                    hits.push((object_id.clone(), handler.hat_id().to_string()));
                }
            }
        }
        hits
    }

    fn start_all(&self, hits: Vec<(ObjectId, String)>, other: Option<ObjectId>) -> usize {
        hits.iter()
            .filter(|(object_id, hat)| self.start(object_id, hat, other.clone()))
            .count()
    }

    /// (Re)starts one handler: cancels its previous run, then spawns a fresh
    /// execution with its own token.
    fn start(&self, object_id: &str, hat_id: &str, other: Option<ObjectId>) -> bool {
        let (body, locals, token, run) = {
            let state = &mut *self.state.borrow_mut();
            state.next_run += 1;
            let run = state.next_run;
            let Some(behaviors) = state.objects.get_mut(object_id) else {
                return false;
            };
            let Some(entry) = behaviors.handlers.iter_mut().find(|h| h.hat_id() == hat_id) else {
                return false;
            };
            if entry.cancel() {
                trace!(object = object_id, hat = hat_id, "superseding previous run");
            }
            let controller = CancellationController::new();
            let token = controller.token();
            entry.live = Some(LiveRun { controller, run });
            (
                Rc::clone(&entry.handler.body),
                Rc::clone(&behaviors.locals),
                token,
                run,
            )
        };

        let execution = Execution::new(
            ExecutionContext {
                object_id: object_id.to_string(),
                hat_id: hat_id.to_string(),
                other_id: other,
                token,
                locals,
                registry: self.clone(),
            },
            self.services.config.loop_guard,
        );

        tokio::task::spawn_local(async move {
            let outcome = execution.run(&body).await;
            let ctx = execution.context();
            ctx.registry.finish(&ctx.object_id, &ctx.hat_id, run);
            match outcome {
                Ok(()) => trace!(object = %ctx.object_id, hat = %ctx.hat_id, "behavior finished"),
                Err(err) if err.is_cancellation() => {
                    trace!(object = %ctx.object_id, hat = %ctx.hat_id, "behavior cancelled")
                }
                Err(err) => {
                    error!(object = %ctx.object_id, hat = %ctx.hat_id, error = %err, "behavior failed");
                    ctx.services()
                        .host
                        .notify(&format!("Behavior error on {}: {}", ctx.object_id, err));
                }
            }
        });
        true
    }

    fn finish(&self, object_id: &str, hat_id: &str, run: u64) {
        let mut state = self.state.borrow_mut();
        let entry = state
            .objects
            .get_mut(object_id)
            .and_then(|behaviors| behaviors.handlers.iter_mut().find(|h| h.hat_id() == hat_id));
        if let Some(entry) = entry {
            if entry.live.as_ref().is_some_and(|live| live.run == run) {
                entry.live = None;
            }
        }
    }
}
