//! Schema construction.
//!
//! A [`SchemaBuilder`] is a stateful cursor over the category arena: `push`
//! descends into a new category, `pop` climbs back out, `define*` adds leaves
//! under the cursor. Misusing the cursor (defining without a category,
//! building without the required identity fields) is a construction-time bug
//! and panics rather than returning an error.

use std::marker::PhantomData;

use crate::{
    category::{Arena, CategoryId},
    tree::{ConfigTree, Side},
    value::{Codec, DefineLeaf, Leaf, LeafValue, SerializedRef, SerializedSlot, ValueData, ValueRef},
};

/// Host-owned build settings, read once at builder creation.
///
/// The "contain everything in one folder" toggle is a snapshot: flipping it
/// after a builder exists does not retroactively move already-built schemas.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub contain_in_one_folder: bool,
    /// Folder all schemas share when `contain_in_one_folder` is set.
    pub umbrella_folder: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            contain_in_one_folder: false,
            umbrella_folder: "confgrove".into(),
        }
    }
}

/// Builder for a [`ConfigTree`].
pub struct SchemaBuilder {
    name: Option<String>,
    folder: Option<String>,
    side: Option<Side>,
    arena: Arena,
    cursor: Option<CategoryId>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    /// Start a builder with no folder chosen yet. `with_folder("")` selects
    /// the config root.
    pub fn new() -> Self {
        Self {
            name: None,
            folder: None,
            side: None,
            arena: Arena::default(),
            cursor: None,
        }
    }

    /// Start a builder honoring the host's [`BuildSettings`]: when
    /// `contain_in_one_folder` is set, the schema lands under the umbrella
    /// folder, otherwise at the config root. The toggle is read here, once.
    pub fn with_settings(settings: &BuildSettings) -> Self {
        let folder = if settings.contain_in_one_folder {
            sanitize_segment(&settings.umbrella_folder)
        } else {
            String::new()
        };
        Self {
            folder: Some(folder),
            ..Self::new()
        }
    }

    /// Set the file base name. Do not include `.json` or path separators;
    /// separators and whitespace become `_` and dot sequences collapse.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(sanitize_name(name));
        self
    }

    /// Append a folder segment. Chaining nests folders; an empty segment
    /// leaves the path unchanged (and, as the first call, selects the config
    /// root).
    pub fn with_folder(mut self, segment: &str) -> Self {
        let segment = sanitize_segment(segment);
        self.folder = Some(match self.folder.take() {
            None => segment,
            Some(folder) if segment.is_empty() => folder,
            Some(folder) if folder.is_empty() => segment,
            Some(folder) => format!("{folder}/{segment}"),
        });
        self
    }

    /// Set the execution-side classification.
    pub fn of_type(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    /// Create a category under the cursor (or a root category) and move the
    /// cursor into it.
    ///
    /// # Panics
    /// Panics if a sibling category or leaf already uses `name`.
    pub fn push(&mut self, name: &str) {
        if self.arena.name_taken(self.cursor, name) {
            panic!("category `{name}` clashes with an existing sibling");
        }
        self.cursor = Some(self.arena.add_category(name, self.cursor));
    }

    /// Move the cursor to the parent category, or clear it at a root.
    pub fn pop(&mut self) {
        self.cursor = self
            .cursor
            .and_then(|cursor| self.arena.category(cursor).parent);
    }

    /// Define a primitive leaf under the current category with the given
    /// default. Returns a handle for reading the value back after loading.
    ///
    /// # Panics
    /// Panics without an active category cursor, or on a sibling name clash.
    pub fn define<D: DefineLeaf>(&mut self, name: &str, default: D) -> ValueRef<D::Stored> {
        let parent = self.require_category(name);
        let id = self
            .arena
            .add_value(Leaf::new(name, parent, default.into_stored().into_data()));
        ValueRef {
            id,
            _marker: PhantomData,
        }
    }

    /// Define a codec-backed leaf. The default is serialized immediately and
    /// the deserialized cache is primed from that string.
    ///
    /// # Panics
    /// Panics without an active category cursor, or on a sibling name clash.
    pub fn define_serialized<T: Send + Sync + 'static>(
        &mut self,
        name: &str,
        codec: Codec<T>,
        default: T,
    ) -> SerializedRef<T> {
        let parent = self.require_category(name);
        let slot = SerializedSlot::new(&codec, &default);
        let id = self
            .arena
            .add_value(Leaf::new(name, parent, ValueData::Serialized(slot)));
        SerializedRef {
            id,
            _marker: PhantomData,
        }
    }

    /// Validate identity fields and freeze the schema.
    ///
    /// # Panics
    /// Panics when the side classification, a non-empty file name, or the
    /// folder (possibly `""` for the config root) has not been set.
    pub fn build(self) -> ConfigTree {
        let Some(side) = self.side else {
            panic!("schema builder needs a side classification; call of_type()");
        };
        let name = match self.name {
            Some(name) if !name.is_empty() => name,
            other => panic!("schema builder needs a non-empty file name, got {other:?}"),
        };
        let Some(folder) = self.folder else {
            panic!("schema builder needs a folder; with_folder(\"\") selects the config root");
        };
        ConfigTree::new(name, folder, side, self.arena)
    }

    fn require_category(&self, name: &str) -> CategoryId {
        let Some(cursor) = self.cursor else {
            panic!("value `{name}` must be defined inside a category; call push() first");
        };
        if self.arena.name_taken(Some(cursor), name) {
            panic!("value `{name}` clashes with an existing sibling");
        }
        cursor
    }
}

// ── Name sanitization ───────────────────────────────────────────────────────

/// Drop every character immediately followed by a literal dot, together with
/// that dot, in one left-to-right pass without rescanning.
fn collapse_dots(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if chars.peek() == Some(&'.') {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

/// File base names: collapse dots, then map separators and whitespace to `_`.
fn sanitize_name(input: &str) -> String {
    collapse_dots(input)
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_whitespace() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Folder segments: collapse dots and map whitespace to `_`. Separators stay,
/// so one segment may span several path levels.
fn sanitize_segment(input: &str) -> String {
    collapse_dots(input)
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SchemaBuilder {
        SchemaBuilder::new()
            .with_folder("")
            .with_name("settings")
            .of_type(Side::Common)
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_name("my config"), "my_config");
        assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_name("v1.2"), "v2");
        assert_eq!(sanitize_name("a.b.c"), "c");
        assert_eq!(sanitize_name(".hidden"), ".hidden");
        assert_eq!(sanitize_name("..up"), "up");
    }

    #[test]
    fn folder_segments_keep_separators() {
        let tree = SchemaBuilder::new()
            .with_folder("mods/foo")
            .with_name("n")
            .of_type(Side::Server)
            .build();
        assert_eq!(tree.folder(), "mods/foo");
    }

    #[test]
    fn chained_folders_nest() {
        let tree = base().with_folder("outer").with_folder("inner").build();
        assert_eq!(tree.folder(), "outer/inner");
    }

    #[test]
    fn empty_segment_is_a_no_op() {
        let tree = base().with_folder("outer").with_folder("").build();
        assert_eq!(tree.folder(), "outer");
    }

    #[test]
    fn push_pop_navigates_the_cursor() {
        let mut builder = base();
        builder.push("general");
        builder.push("advanced");
        let deep = builder.define("deep", true);
        builder.pop();
        let shallow = builder.define("shallow", false);
        builder.pop();
        // Cursor cleared at the root; a second pop stays cleared.
        builder.pop();
        builder.push("other");
        builder.define("x", 1i64);

        let tree = builder.build();
        assert!(tree.get(deep));
        assert!(!tree.get(shallow));
    }

    #[test]
    #[should_panic(expected = "must be defined inside a category")]
    fn define_without_category_panics() {
        let mut builder = base();
        builder.define("orphan", true);
    }

    #[test]
    #[should_panic(expected = "clashes with an existing sibling")]
    fn duplicate_leaf_name_panics() {
        let mut builder = base();
        builder.push("general");
        builder.define("flag", true);
        builder.define("flag", false);
    }

    #[test]
    #[should_panic(expected = "needs a side classification")]
    fn build_without_side_panics() {
        SchemaBuilder::new().with_folder("").with_name("n").build();
    }

    #[test]
    #[should_panic(expected = "needs a non-empty file name")]
    fn build_without_name_panics() {
        SchemaBuilder::new()
            .with_folder("")
            .of_type(Side::Common)
            .build();
    }

    #[test]
    #[should_panic(expected = "needs a folder")]
    fn build_without_folder_panics() {
        SchemaBuilder::new()
            .with_name("n")
            .of_type(Side::Common)
            .build();
    }

    #[test]
    fn contained_toggle_snapshots_at_creation() {
        let mut settings = BuildSettings {
            contain_in_one_folder: true,
            umbrella_folder: "grove".into(),
        };
        let contained = SchemaBuilder::with_settings(&settings)
            .with_name("a")
            .of_type(Side::Common);

        // Flipping the toggle later must not move the earlier builder.
        settings.contain_in_one_folder = false;
        let loose = SchemaBuilder::with_settings(&settings)
            .with_name("b")
            .of_type(Side::Common);

        assert_eq!(contained.build().folder(), "grove");
        assert_eq!(loose.build().folder(), "");
    }
}
