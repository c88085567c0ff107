//! Persistence engine: folder resolution, JSON serialization, create-only
//! writes, strict reads, structural validation, and load orchestration.
//!
//! All I/O is synchronous and blocking; the design assumes one orchestrating
//! thread runs the load pass. Concurrent external edits to a config file
//! between validation and migration are an accepted race, not guarded
//! against.

use std::{
    fs,
    path::{Path, PathBuf},
};

use {
    serde_json::{Map, Value as Json},
    tracing::{debug, error, warn},
};

use crate::{
    category::{Arena, CategoryId},
    error::{Error, Result},
    migrate::migrate,
    tree::ConfigTree,
    value::json_kind,
};

/// Default per-user config root for the host application
/// (`~/.config/<app>/` on Linux).
pub fn default_config_root(app: &str) -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", app).map(|d| d.config_dir().to_path_buf())
}

/// Folder a tree's file lives in: `<root>/[folder/]<side subfolder>`.
/// Computed identically for write and read.
pub fn config_dir(root: &Path, tree: &ConfigTree) -> PathBuf {
    let mut dir = root.to_path_buf();
    if !tree.folder().is_empty() {
        dir.push(tree.folder());
    }
    if let Some(sub) = tree.side().subfolder() {
        dir.push(sub);
    }
    dir
}

/// Full path of a tree's file: [`config_dir`] plus `<name>.json`.
pub fn config_file(root: &Path, tree: &ConfigTree) -> PathBuf {
    config_dir(root, tree).join(format!("{}.json", tree.name()))
}

/// Convert a tree into its nested JSON document: one object per category,
/// leaves first, sub-categories after, all in declaration order.
pub fn serialize(tree: &ConfigTree) -> Json {
    let mut doc = Map::new();
    for root in &tree.arena.roots {
        serialize_category(&tree.arena, *root, &mut doc);
    }
    Json::Object(doc)
}

fn serialize_category(arena: &Arena, id: CategoryId, out: &mut Map<String, Json>) {
    let category = arena.category(id);
    let mut object = Map::new();
    for value in &category.values {
        arena.value(*value).write_to(&mut object);
    }
    for child in &category.children {
        serialize_category(arena, *child, &mut object);
    }
    out.insert(category.name.clone(), Json::Object(object));
}

/// Write a tree's current values as a pretty-printed JSON file.
///
/// Creates the target folder if absent. This is create-only: an existing
/// file fails with [`Error::AlreadyExists`] and is left untouched — callers
/// must delete explicitly before retrying.
pub fn write_config(root: &Path, tree: &ConfigTree) -> Result<()> {
    let dir = config_dir(root, tree);
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| {
            error!(dir = %dir.display(), error = %e, "could not create config folder");
            e
        })?;
    }

    let path = dir.join(format!("{}.json", tree.name()));
    if path.exists() {
        return Err(Error::AlreadyExists { path });
    }

    let text = serde_json::to_string_pretty(&serialize(tree))?;
    fs::write(&path, text).map_err(|e| {
        error!(path = %path.display(), error = %e, "could not write config file");
        e
    })?;
    debug!(path = %path.display(), "wrote config");
    Ok(())
}

/// Strict read: the folder and file must already exist. Declared categories
/// must be present; leaves whose key is absent keep their current value;
/// keys with an incompatible JSON kind are returned as [`Error::TypeMismatch`]
/// diagnostics while sibling leaves still populate.
pub fn read_config(root: &Path, tree: &mut ConfigTree) -> Result<Vec<Error>> {
    let path = config_file(root, tree);
    let doc = read_document(&path)?;
    populate_tree(tree, &doc, true)
}

/// Check that the on-disk document is a structural superset of the schema:
/// every declared leaf and sub-category key exists at every level. Extra
/// undeclared keys are ignored. A `false` result routes to migration, it is
/// not an error.
pub fn validate(document: &Json, tree: &ConfigTree) -> bool {
    match document.as_object() {
        Some(doc) => validate_object(doc, tree),
        None => false,
    }
}

pub(crate) fn validate_object(doc: &Map<String, Json>, tree: &ConfigTree) -> bool {
    tree.arena
        .roots
        .iter()
        .all(|root| validate_category(&tree.arena, *root, doc))
}

fn validate_category(arena: &Arena, id: CategoryId, parent: &Map<String, Json>) -> bool {
    let category = arena.category(id);
    let Some(object) = parent.get(&category.name).and_then(Json::as_object) else {
        return false;
    };
    category
        .values
        .iter()
        .all(|v| object.contains_key(&arena.value(*v).name))
        && category
            .children
            .iter()
            .all(|c| validate_category(arena, *c, object))
}

/// Load orchestration for one tree: create the file from defaults when
/// absent, migrate when the on-disk document no longer matches the schema,
/// strict-read the values, then set the one-way loaded flag. Idempotent: a
/// loaded tree is a no-op.
pub fn load(root: &Path, tree: &mut ConfigTree) -> Result<()> {
    if tree.is_loaded() {
        debug!(config = tree.name(), "already loaded, skipping");
        return Ok(());
    }

    let path = config_file(root, tree);
    if !path.exists() {
        write_config(root, tree)?;
    } else {
        let matches = match read_document(&path) {
            Ok(doc) => validate_object(&doc, tree),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config unreadable, rewriting");
                false
            },
        };
        if !matches {
            migrate(root, tree)?;
        }
    }

    for mismatch in read_config(root, tree)? {
        warn!(config = tree.name(), error = %mismatch, "kept default for mismatched value");
    }
    tree.mark_loaded();
    Ok(())
}

/// Read and parse a config file into its top-level JSON object.
pub(crate) fn read_document(path: &Path) -> Result<Map<String, Json>> {
    let Some(dir) = path.parent() else {
        return Err(Error::MissingPath {
            path: path.to_path_buf(),
        });
    };
    if !dir.exists() {
        return Err(Error::MissingPath {
            path: dir.to_path_buf(),
        });
    }
    if !path.exists() {
        return Err(Error::MissingPath {
            path: path.to_path_buf(),
        });
    }

    let text = fs::read_to_string(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "could not read config file");
        Error::Io(e)
    })?;
    match serde_json::from_str::<Json>(&text)? {
        Json::Object(doc) => Ok(doc),
        _ => Err(Error::InvalidDocument {
            path: path.to_path_buf(),
        }),
    }
}

/// Copy document values into the tree's leaves.
///
/// Strict mode errors on a missing (or non-object) declared category; update
/// mode skips it, leaving that subtree at its defaults. In both modes a key
/// of incompatible kind becomes a [`Error::TypeMismatch`] diagnostic scoped
/// to that one leaf.
pub(crate) fn populate_tree(
    tree: &mut ConfigTree,
    doc: &Map<String, Json>,
    strict: bool,
) -> Result<Vec<Error>> {
    let mut mismatches = Vec::new();
    let roots = tree.arena.roots.clone();
    for root in roots {
        populate_category(&mut tree.arena, root, doc, strict, "", &mut mismatches)?;
    }
    Ok(mismatches)
}

fn populate_category(
    arena: &mut Arena,
    id: CategoryId,
    parent: &Map<String, Json>,
    strict: bool,
    prefix: &str,
    mismatches: &mut Vec<Error>,
) -> Result<()> {
    let name = arena.category(id).name.clone();
    let path = if prefix.is_empty() {
        name.clone()
    } else {
        format!("{prefix}.{name}")
    };

    let Some(object) = parent.get(&name).and_then(Json::as_object) else {
        if strict {
            return Err(Error::MissingCategory { path });
        }
        return Ok(());
    };

    let values = arena.category(id).values.clone();
    for value_id in values {
        let leaf = arena.value_mut(value_id);
        let Some(json) = object.get(&leaf.name) else {
            // Tolerant on absent keys in both modes; the default stands.
            continue;
        };
        if !leaf.populate(json) {
            mismatches.push(Error::TypeMismatch {
                path: format!("{path}.{}", leaf.name),
                expected: leaf.data.kind(),
                found: json_kind(json),
            });
        }
    }

    let children = arena.category(id).children.clone();
    for child in children {
        populate_category(arena, child, object, strict, &path, mismatches)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::{builder::SchemaBuilder, tree::Side, value::ValueRef},
        serde_json::json,
    };

    struct Probe {
        tree: ConfigTree,
        flag: ValueRef<bool>,
        count: ValueRef<i32>,
        label: ValueRef<String>,
    }

    fn probe_schema(side: Side, folder: &str) -> Probe {
        let mut builder = SchemaBuilder::new()
            .with_folder(folder)
            .with_name("probe")
            .of_type(side);
        builder.push("general");
        let flag = builder.define("flag", false);
        let count = builder.define("count", 7i32);
        builder.push("nested");
        let label = builder.define("label", "default");
        builder.pop();
        builder.pop();
        Probe {
            tree: builder.build(),
            flag,
            count,
            label,
        }
    }

    #[test]
    fn resolves_root_for_uncategorized() {
        let probe = probe_schema(Side::Uncategorized, "");
        let root = Path::new("/cfg");
        assert_eq!(config_file(root, &probe.tree), Path::new("/cfg/probe.json"));
    }

    #[test]
    fn resolves_side_subfolder_under_folder() {
        let probe = probe_schema(Side::Server, "mods/foo");
        let root = Path::new("/cfg");
        assert_eq!(
            config_file(root, &probe.tree),
            Path::new("/cfg/mods/foo/server/probe.json")
        );
    }

    #[test]
    fn round_trip_reproduces_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let written = probe_schema(Side::Common, "");
        write_config(dir.path(), &written.tree).unwrap();

        let mut fresh = probe_schema(Side::Common, "");
        let mismatches = read_config(dir.path(), &mut fresh.tree).unwrap();
        assert!(mismatches.is_empty());
        assert!(!fresh.tree.get(fresh.flag));
        assert_eq!(fresh.tree.get(fresh.count), 7);
        assert_eq!(fresh.tree.get(fresh.label), "default");
    }

    #[test]
    fn write_is_create_only() {
        let dir = tempfile::tempdir().unwrap();
        let probe = probe_schema(Side::Common, "");
        write_config(dir.path(), &probe.tree).unwrap();

        let path = config_file(dir.path(), &probe.tree);
        let before = fs::read_to_string(&path).unwrap();

        let err = write_config(dir.path(), &probe.tree).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn strict_read_requires_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut probe = probe_schema(Side::Common, "");
        let err = read_config(dir.path(), &mut probe.tree).unwrap_err();
        assert!(matches!(err, Error::MissingPath { .. }));
    }

    #[test]
    fn validate_accepts_supersets_and_rejects_missing_keys() {
        let probe = probe_schema(Side::Common, "");
        let mut doc = serialize(&probe.tree);
        assert!(validate(&doc, &probe.tree));

        // Extra undeclared keys are ignored.
        doc["general"]["stray"] = json!(1);
        assert!(validate(&doc, &probe.tree));

        // Any missing declared key fails, at any depth.
        doc["general"]["nested"].as_object_mut().unwrap().remove("label");
        assert!(!validate(&doc, &probe.tree));

        assert!(!validate(&json!({}), &probe.tree));
        assert!(!validate(&json!([]), &probe.tree));
    }

    #[test]
    fn type_mismatch_is_scoped_to_one_leaf() {
        let dir = tempfile::tempdir().unwrap();
        let mut probe = probe_schema(Side::Common, "");

        let path = config_file(dir.path(), &probe.tree);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let doc = json!({
            "general": {
                "flag": true,
                "count": "not a number",
                "nested": { "label": "edited" }
            }
        });
        fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

        let mismatches = read_config(dir.path(), &mut probe.tree).unwrap();
        assert_eq!(mismatches.len(), 1);
        assert!(matches!(
            &mismatches[0],
            Error::TypeMismatch { path, .. } if path == "general.count"
        ));

        // Siblings populated, the mismatched leaf kept its default.
        assert!(probe.tree.get(probe.flag));
        assert_eq!(probe.tree.get(probe.count), 7);
        assert_eq!(probe.tree.get(probe.label), "edited");
    }

    #[test]
    fn load_writes_defaults_when_no_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let mut probe = probe_schema(Side::Client, "mods/foo");
        load(dir.path(), &mut probe.tree).unwrap();

        assert!(probe.tree.is_loaded());
        let path = config_file(dir.path(), &probe.tree);
        assert!(path.ends_with("mods/foo/client/probe.json"));
        assert!(path.exists());
    }

    #[test]
    fn load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut probe = probe_schema(Side::Common, "");
        load(dir.path(), &mut probe.tree).unwrap();

        // Remove the file: a second load must not touch the disk.
        fs::remove_file(config_file(dir.path(), &probe.tree)).unwrap();
        load(dir.path(), &mut probe.tree).unwrap();
        assert!(!config_file(dir.path(), &probe.tree).exists());
        assert_eq!(probe.tree.get(probe.count), 7);
    }

    #[test]
    fn serialized_output_keeps_declaration_order() {
        let probe = probe_schema(Side::Common, "");
        let text = serde_json::to_string_pretty(&serialize(&probe.tree)).unwrap();
        let flag = text.find("\"flag\"").unwrap();
        let count = text.find("\"count\"").unwrap();
        let nested = text.find("\"nested\"").unwrap();
        assert!(flag < count && count < nested);
    }
}
