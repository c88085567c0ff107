//! Category tree stored as an arena.
//!
//! Categories and leaves live in two flat vectors addressed by index; the
//! parent relation is an optional index used only for the builder's `pop`
//! navigation, never for ownership. This keeps the graph a rooted tree with
//! no reference cycles.

use crate::value::Leaf;

/// Index of a category in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryId(pub(crate) usize);

/// Index of a leaf in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueId(pub(crate) usize);

/// A named grouping node: leaves first, then nested sub-categories, both in
/// declaration order.
pub(crate) struct Category {
    pub(crate) name: String,
    pub(crate) parent: Option<CategoryId>,
    pub(crate) values: Vec<ValueId>,
    pub(crate) children: Vec<CategoryId>,
}

/// Arena holding one schema's categories and leaves.
#[derive(Default)]
pub(crate) struct Arena {
    pub(crate) categories: Vec<Category>,
    pub(crate) values: Vec<Leaf>,
    pub(crate) roots: Vec<CategoryId>,
}

impl Arena {
    /// Add a category under `parent` (or as a root) and link it in.
    pub(crate) fn add_category(
        &mut self,
        name: impl Into<String>,
        parent: Option<CategoryId>,
    ) -> CategoryId {
        let id = CategoryId(self.categories.len());
        self.categories.push(Category {
            name: name.into(),
            parent,
            values: Vec::new(),
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.categories[p.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Add a leaf and link it into its owning category.
    pub(crate) fn add_value(&mut self, leaf: Leaf) -> ValueId {
        let id = ValueId(self.values.len());
        let parent = leaf.parent;
        self.values.push(leaf);
        self.categories[parent.0].values.push(id);
        id
    }

    pub(crate) fn category(&self, id: CategoryId) -> &Category {
        &self.categories[id.0]
    }

    pub(crate) fn value(&self, id: ValueId) -> &Leaf {
        &self.values[id.0]
    }

    pub(crate) fn value_mut(&mut self, id: ValueId) -> &mut Leaf {
        &mut self.values[id.0]
    }

    /// True if `name` is already taken by a leaf or sub-category directly
    /// under `parent` (`None` checks the root level).
    pub(crate) fn name_taken(&self, parent: Option<CategoryId>, name: &str) -> bool {
        let (children, values): (&[CategoryId], &[ValueId]) = match parent {
            Some(p) => {
                let cat = self.category(p);
                (&cat.children, &cat.values)
            },
            None => (&self.roots, &[]),
        };
        children.iter().any(|c| self.category(*c).name == name)
            || values.iter().any(|v| self.value(*v).name == name)
    }
}
