use std::{cell::RefCell, collections::HashMap, rc::Rc};

use tokio::time::Instant;

use crate::{
    compiler::{CompileOptions, ProcedureCache},
    config::SessionConfig,
    runtime::{collision::CollisionEngine, proxy::MutationProxy, value::Value},
    scene::{Host, ObjectStore, SceneResources},
};

/// Scene-shared variables keyed by variable id. Reads and writes are visible
/// to every execution at once.
pub type SharedVariables = Rc<RefCell<HashMap<String, Value>>>;

/// Collaborators shared by the registry and every execution it starts.
pub struct Services {
    pub config: SessionConfig,
    pub store: Rc<dyn ObjectStore>,
    pub host: Rc<dyn Host>,
    pub proxy: MutationProxy,
    pub globals: SharedVariables,
    pub collisions: Rc<RefCell<CollisionEngine>>,
    pub procedures: RefCell<ProcedureCache>,
    pub compile_options: RefCell<CompileOptions>,
    pub resources: RefCell<SceneResources>,
    pub started: Instant,
}

impl Services {
    pub fn new(config: SessionConfig, store: Rc<dyn ObjectStore>, host: Rc<dyn Host>) -> Self {
        let proxy = MutationProxy::new(Rc::clone(&store), config.flush_interval());
        Self {
            config,
            store,
            host,
            proxy,
            globals: Rc::new(RefCell::new(HashMap::new())),
            collisions: Rc::new(RefCell::new(CollisionEngine::new())),
            procedures: RefCell::new(ProcedureCache::new()),
            compile_options: RefCell::new(CompileOptions::default()),
            resources: RefCell::new(SceneResources::default()),
            started: Instant::now(),
        }
    }

    /// Replaces scene resources; declares their variables as shared and seeds
    /// any that are not set yet.
    pub fn set_resources(&self, resources: SceneResources) {
        {
            let mut globals = self.globals.borrow_mut();
            for declaration in &resources.variables {
                globals
                    .entry(declaration.id.clone())
                    .or_insert_with(|| declaration.initial_value());
            }
        }
        *self.compile_options.borrow_mut() =
            CompileOptions::with_globals(resources.global_variable_ids());
        *self.resources.borrow_mut() = resources;
    }
}
