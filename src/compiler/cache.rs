use std::{collections::HashMap, rc::Rc};

use tracing::debug;

use crate::{graph::BlockGraph, graph::to_hex, ir::CompiledProcedure};

use super::{CompileOptions, CompileResult, compile};

/// Compiled procedures keyed by the content hash of graph + options, so an
/// unchanged graph is never translated twice.
#[derive(Default)]
pub struct ProcedureCache {
    entries: HashMap<[u8; 32], Rc<CompiledProcedure>>,
    hits: usize,
    misses: usize,
}

pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

impl ProcedureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(
        &mut self,
        graph: &BlockGraph,
        options: &CompileOptions,
    ) -> CompileResult<Rc<CompiledProcedure>> {
        let hash = options.hash_graph(graph);
        if let Some(procedure) = self.entries.get(&hash) {
            self.hits += 1;
            debug!(hash = %to_hex(&hash), "procedure cache hit");
            return Ok(Rc::clone(procedure));
        }

        self.misses += 1;
        let procedure = Rc::new(compile(graph, options)?);
        self.entries.insert(hash, Rc::clone(&procedure));
        Ok(procedure)
    }

    pub fn contains(&self, hash: &[u8; 32]) -> bool {
        self.entries.contains_key(hash)
    }

    /// Drops entries no installed procedure refers to anymore.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, procedure| Rc::strong_count(procedure) > 1);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}
