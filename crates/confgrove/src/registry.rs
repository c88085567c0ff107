//! Host-owned registry driving the load pass.
//!
//! The host builds its schemas, registers them here, and runs [`Registry::load_all`]
//! once at a well-defined startup point. The registry never owns a tree; it
//! borrows each one for the duration of the pass. There is no hidden global:
//! registration is an explicit call sequence.

use std::{path::Path, time::Instant};

use tracing::{error, info};

use crate::{
    loader::load,
    tree::{ConfigTree, RunMode},
};

/// Ordered list of configuration trees awaiting one load pass.
#[derive(Default)]
pub struct Registry<'a> {
    entries: Vec<&'a mut ConfigTree>,
}

impl<'a> Registry<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a tree for the load pass. Order of registration is the order of
    /// loading.
    pub fn register(&mut self, tree: &'a mut ConfigTree) {
        self.entries.push(tree);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run load orchestration for every registered tree whose side matches
    /// `mode`. A single tree's failure is logged and leaves that tree at its
    /// defaults; the remaining trees still load. Returns the number of trees
    /// loaded without error.
    pub fn load_all(&mut self, root: &Path, mode: RunMode) -> usize {
        let start = Instant::now();
        let mut loaded = 0;
        for tree in &mut self.entries {
            if !tree.side().applies_to(mode) {
                continue;
            }
            match load(root, tree) {
                Ok(()) => loaded += 1,
                Err(e) => {
                    error!(config = tree.name(), error = %e, "config failed to load");
                },
            }
        }
        info!(
            loaded,
            registered = self.entries.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "config load pass finished"
        );
        loaded
    }
}
