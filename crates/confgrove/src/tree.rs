//! Built configuration trees and execution-side classification.

use serde::{Deserialize, Serialize};

use crate::{
    category::Arena,
    value::{LeafValue, SerializedRef, ValueData, ValueRef},
};

/// Which run mode loads a schema, and which on-disk subfolder it lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// No subfolder; loaded in every run mode.
    Uncategorized,
    Common,
    Server,
    Client,
}

/// The mode the host process is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Client,
    Server,
}

impl Side {
    /// Lowercase subfolder name, or `None` for [`Side::Uncategorized`].
    pub fn subfolder(self) -> Option<&'static str> {
        match self {
            Self::Uncategorized => None,
            Self::Common => Some("common"),
            Self::Server => Some("server"),
            Self::Client => Some("client"),
        }
    }

    /// Whether a schema of this side loads under `mode`. Common and
    /// uncategorized schemas load everywhere; client and server schemas only
    /// on their own side.
    pub fn applies_to(self, mode: RunMode) -> bool {
        match self {
            Self::Uncategorized | Self::Common => true,
            Self::Client => mode == RunMode::Client,
            Self::Server => mode == RunMode::Server,
        }
    }
}

/// An immutable (post-build) schema bundle: identity plus the category arena.
///
/// Produced by [`SchemaBuilder::build`](crate::SchemaBuilder::build). The load
/// pass mutates leaf values in place and then flips the one-way `loaded`
/// flag; once set, further load passes are no-ops.
pub struct ConfigTree {
    name: String,
    folder: String,
    side: Side,
    loaded: bool,
    pub(crate) arena: Arena,
}

impl ConfigTree {
    pub(crate) fn new(name: String, folder: String, side: Side, arena: Arena) -> Self {
        Self {
            name,
            folder,
            side,
            loaded: false,
            arena,
        }
    }

    /// File base name (without `.json`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Folder path under the config root; empty for the root itself.
    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub(crate) fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    /// Current value of a primitive leaf.
    ///
    /// # Panics
    /// Panics if the handle was created by a different tree's builder.
    pub fn get<T: LeafValue>(&self, value: ValueRef<T>) -> T {
        let leaf = self.arena.value(value.id);
        match T::from_data(&leaf.data) {
            Some(v) => v,
            None => panic!("value `{}` read through a foreign handle", leaf.name),
        }
    }

    /// Deserialized value of a codec-backed leaf, from the cache populated on
    /// every set.
    ///
    /// # Panics
    /// Panics if the handle was created by a different tree's builder.
    pub fn get_deserialized<T: Clone + Send + Sync + 'static>(&self, value: SerializedRef<T>) -> T {
        let leaf = self.arena.value(value.id);
        let cached = match &leaf.data {
            ValueData::Serialized(slot) => slot.cached::<T>(),
            _ => None,
        };
        match cached {
            Some(v) => v,
            None => panic!("value `{}` read through a foreign handle", leaf.name),
        }
    }

    /// Persisted string form of a codec-backed leaf.
    ///
    /// # Panics
    /// Panics if the handle was created by a different tree's builder.
    pub fn raw<T>(&self, value: SerializedRef<T>) -> &str {
        let leaf = self.arena.value(value.id);
        match &leaf.data {
            ValueData::Serialized(slot) => slot.raw(),
            _ => panic!("value `{}` read through a foreign handle", leaf.name),
        }
    }
}
