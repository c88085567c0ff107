//! Schema-driven configuration trees with JSON persistence and migration.
//!
//! Declare a tree of named categories and typed values with defaults through
//! [`SchemaBuilder`], persist it as a pretty-printed JSON document, and
//! reload values from disk on startup. When the declared schema differs from
//! what is already on disk, the two are reconciled: user edits survive for
//! keys that still exist, newly declared keys get their defaults, dropped
//! keys vanish.
//!
//! This is an embedded library: the host decides when the load pass runs
//! (typically once at startup, via [`Registry::load_all`]) and which
//! [`RunMode`] it runs in. Non-primitive values plug in through the
//! [`Codec`] contract; the engine never inspects the custom type itself.
//!
//! ```no_run
//! use confgrove::{Registry, RunMode, SchemaBuilder, Side};
//!
//! let mut builder = SchemaBuilder::new()
//!     .with_folder("")
//!     .with_name("my_app")
//!     .of_type(Side::Common);
//! builder.push("general");
//! let verbose = builder.define("verbose", false);
//! let max_items = builder.define("max_items", 64i32);
//! builder.pop();
//! let mut tree = builder.build();
//!
//! let mut registry = Registry::new();
//! registry.register(&mut tree);
//! registry.load_all("config".as_ref(), RunMode::Server);
//!
//! if tree.get(verbose) {
//!     println!("max_items = {}", tree.get(max_items));
//! }
//! ```

pub mod builder;
pub mod category;
pub mod error;
pub mod loader;
pub mod migrate;
pub mod registry;
pub mod tree;
pub mod value;

pub use {
    builder::{BuildSettings, SchemaBuilder},
    error::{Error, Result},
    loader::{
        config_dir, config_file, default_config_root, load, read_config, serialize, validate,
        write_config,
    },
    migrate::migrate,
    registry::Registry,
    tree::{ConfigTree, RunMode, Side},
    value::{Codec, DefineLeaf, LeafValue, SerializedRef, ValueData, ValueKind, ValueRef},
};
