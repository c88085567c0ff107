//! Schema migration: reconcile an on-disk document against a changed schema.
//!
//! Invoked when a config file exists but fails structural validation. Values
//! whose keys survive the schema change are carried forward, newly declared
//! keys take their defaults, removed and unknown keys vanish from the
//! rewritten file.

use std::{fs, path::Path};

use tracing::{error, info, warn};

use crate::{
    error::Result,
    loader::{config_file, populate_tree, read_document, write_config},
    tree::ConfigTree,
};

/// Merge the existing file into the tree's just-built defaults and rewrite
/// it.
///
/// The old file is deleted before the fresh create-write; a deletion failure
/// is fatal for this tree's load. The merge read is tolerant: missing
/// categories and keys keep their defaults, and a key whose on-disk kind no
/// longer matches the redeclared leaf falls back to the default with a
/// logged mismatch instead of failing the migration.
pub fn migrate(root: &Path, tree: &mut ConfigTree) -> Result<()> {
    let path = config_file(root, tree);
    let doc = read_document(&path)?;

    fs::remove_file(&path).map_err(|e| {
        error!(path = %path.display(), error = %e, "could not delete outdated config");
        e
    })?;

    for mismatch in populate_tree(tree, &doc, false)? {
        warn!(config = tree.name(), error = %mismatch, "kept default for mismatched value");
    }

    write_config(root, tree)?;
    info!(config = tree.name(), path = %path.display(), "migrated config to current schema");
    Ok(())
}
