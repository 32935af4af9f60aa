//! Page tree enumeration.
//!
//! The page tree is flattened depth-first, left to right. Every leaf is
//! returned as a [`PageRef`] carrying its inheritable attributes, already
//! resolved against the closest ancestor that defines them.

use std::collections::HashSet;

use crate::error::{PdfError, Result};
use crate::object::{Dictionary, Document, Object, ObjectId};

/// Attributes a page may inherit from its ancestors (ISO 32000-1, 7.7.3.4).
pub const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Deepest page tree accepted before the walk gives up.
const MAX_TREE_DEPTH: usize = 1024;

/// Inheritable page attributes, the page's own value taking precedence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageAttributes {
    /// `/Resources`
    pub resources: Option<Object>,
    /// `/MediaBox`
    pub media_box: Option<Object>,
    /// `/CropBox`
    pub crop_box: Option<Object>,
    /// `/Rotate`
    pub rotate: Option<Object>,
}

impl PageAttributes {
    fn slot(&mut self, key: &[u8]) -> Option<&mut Option<Object>> {
        match key {
            b"Resources" => Some(&mut self.resources),
            b"MediaBox" => Some(&mut self.media_box),
            b"CropBox" => Some(&mut self.crop_box),
            b"Rotate" => Some(&mut self.rotate),
            _ => None,
        }
    }

    /// Copy of `self` with every key `node` defines overriding it.
    fn overridden_by(&self, node: &Dictionary) -> Self {
        let mut merged = self.clone();
        for key in INHERITABLE_KEYS {
            if let Some(value) = node.get(key)
                && let Some(slot) = merged.slot(key)
            {
                *slot = Some(value.clone());
            }
        }
        merged
    }

    /// Present attributes as `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static [u8], &Object)> {
        [
            (INHERITABLE_KEYS[0], self.resources.as_ref()),
            (INHERITABLE_KEYS[1], self.media_box.as_ref()),
            (INHERITABLE_KEYS[2], self.crop_box.as_ref()),
            (INHERITABLE_KEYS[3], self.rotate.as_ref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
    }
}

/// A leaf of the page tree.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRef {
    /// Id of the page dictionary.
    pub id: ObjectId,
    /// Resolved inheritable attributes.
    pub attributes: PageAttributes,
}

/// Result of a full page tree walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageTree {
    /// Leaves in reading order.
    pub pages: Vec<PageRef>,
    /// Intermediate `/Pages` nodes, root first.
    pub nodes: Vec<ObjectId>,
}

/// List every page of `doc` in reading order.
///
/// # Errors
///
/// Returns [`PdfError::Structure`] when a node appears twice on the current
/// path (a cycle), when a kid is not a reference to a dictionary, or when the
/// tree is unreasonably deep. A missing catalog or `/Pages` entry is a
/// [`PdfError::Parse`] error.
pub fn enumerate_pages(doc: &Document) -> Result<Vec<PageRef>> {
    walk_page_tree(doc).map(|tree| tree.pages)
}

/// Walk the page tree, keeping the intermediate nodes as well as the leaves.
///
/// Fails exactly when [`enumerate_pages`] fails.
pub fn walk_page_tree(doc: &Document) -> Result<PageTree> {
    let root = doc.pages_root_id()?;
    let mut walk = Walk {
        doc,
        path: HashSet::new(),
        tree: PageTree::default(),
    };
    walk.visit(root, &PageAttributes::default(), 0)?;
    log::debug!(
        "page tree rooted at {root}: {} pages under {} nodes",
        walk.tree.pages.len(),
        walk.tree.nodes.len()
    );
    Ok(walk.tree)
}

/// Number of leaves in the page tree. `/Count` entries are not consulted.
pub fn page_count(doc: &Document) -> Result<usize> {
    enumerate_pages(doc).map(|pages| pages.len())
}

struct Walk<'a> {
    doc: &'a Document,
    path: HashSet<ObjectId>,
    tree: PageTree,
}

impl Walk<'_> {
    fn visit(&mut self, id: ObjectId, inherited: &PageAttributes, depth: usize) -> Result<()> {
        if depth > MAX_TREE_DEPTH {
            return Err(PdfError::structure(format!(
                "page tree deeper than {MAX_TREE_DEPTH} levels"
            )));
        }
        if !self.path.insert(id) {
            return Err(PdfError::structure(format!(
                "page tree cycle through object {id}"
            )));
        }

        let doc = self.doc;
        let node = doc.get_dict(id)?;
        let attributes = inherited.overridden_by(node);

        if is_intermediate(node) {
            self.tree.nodes.push(id);
            let kids = match node.get(b"Kids") {
                Some(kids) => doc.resolve(kids)?.as_array().ok_or_else(|| {
                    PdfError::structure(format!("/Kids of page tree node {id} is not an array"))
                })?,
                None => {
                    return Err(PdfError::structure(format!(
                        "page tree node {id} has no /Kids"
                    )));
                }
            };
            for kid in kids {
                let kid_id = kid.as_reference().ok_or_else(|| {
                    PdfError::structure(format!(
                        "kid of page tree node {id} is a {}, not a reference",
                        kid.type_name()
                    ))
                })?;
                self.visit(kid_id, &attributes, depth + 1)?;
            }
        } else {
            self.tree.pages.push(PageRef { id, attributes });
        }

        self.path.remove(&id);
        Ok(())
    }
}

/// `/Type /Pages`, or an untyped node that has `/Kids`.
fn is_intermediate(node: &Dictionary) -> bool {
    match node.type_name() {
        Some(b"Pages") => true,
        Some(b"Page") => false,
        _ => node.has(b"Kids"),
    }
}
