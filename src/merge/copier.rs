//! Deep copy of objects between documents.
//!
//! An [`ObjectCopier`] lives for exactly one assembly. It remembers every
//! `(source, id)` pair it has copied so that resources shared by several
//! pages of one source land in the destination once. Destination ids are
//! reserved the moment a reference is first seen and the bodies are filled
//! in from a work queue, so reference cycles terminate and long chains never
//! recurse.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{PdfError, Result};
use crate::object::{Dictionary, Document, Object, ObjectId, Stream};
use crate::pages::PageRef;

/// Identifies a source document within one assembly.
pub type SourceKey = usize;

/// Counters describing what a copier did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Indirect objects written to the destination.
    pub objects: usize,
    /// References to objects missing from their source, replaced by `null`.
    pub dangling: usize,
    /// References into the source page tree, replaced by `null`.
    pub pruned: usize,
}

/// Copies objects from source documents into one destination document.
#[derive(Debug, Default)]
pub struct ObjectCopier {
    copied: HashMap<(SourceKey, ObjectId), ObjectId>,
    excluded: HashSet<(SourceKey, ObjectId)>,
    placed: HashSet<ObjectId>,
    queue: VecDeque<(ObjectId, ObjectId)>,
    stats: CopyStats,
}

impl ObjectCopier {
    /// Create a copier with empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Never copy `id` of source `key`; references to it become `null`.
    ///
    /// Used for the intermediate nodes of a source page tree, which the
    /// destination replaces with its own.
    pub fn exclude(&mut self, key: SourceKey, id: ObjectId) {
        self.excluded.insert((key, id));
    }

    /// What the copier has done so far.
    pub fn stats(&self) -> CopyStats {
        self.stats
    }

    /// Copy `source_id` and everything it references into `dest`.
    ///
    /// Returns the destination id. Copying the same `(source_key, source_id)`
    /// twice returns the same id without copying again.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::Structure`] when `source_id` itself does not exist
    /// in `source`. Missing objects further down the graph become `null`.
    pub fn copy_object(
        &mut self,
        source: &Document,
        source_key: SourceKey,
        source_id: ObjectId,
        dest: &mut Document,
    ) -> Result<ObjectId> {
        if source.get(source_id).is_none() {
            return Err(PdfError::structure(format!(
                "cannot copy missing object {source_id}"
            )));
        }
        let reference = self.reference_to(source, source_key, source_id, dest);
        self.drain(source, source_key, dest);
        reference
            .as_reference()
            .ok_or_else(|| PdfError::structure(format!("object {source_id} cannot be copied")))
    }

    /// Copy a page leaf.
    ///
    /// `/Parent` is dropped and the page's inherited attributes are written
    /// into the copy. Every call produces a distinct page object, so
    /// selecting a page twice yields two pages sharing the same resources.
    pub fn copy_page(
        &mut self,
        source: &Document,
        source_key: SourceKey,
        page: &PageRef,
        dest: &mut Document,
    ) -> Result<ObjectId> {
        let original = source.get_dict(page.id)?;

        // A page reached earlier through some other reference already has a
        // reserved id; the first placement claims it.
        let existing = self.copied.get(&(source_key, page.id)).copied();
        let dest_id = match existing {
            Some(id) if self.placed.insert(id) => id,
            _ => {
                let id = dest.new_object_id();
                self.placed.insert(id);
                self.copied.entry((source_key, page.id)).or_insert(id);
                self.stats.objects += 1;
                id
            }
        };

        let mut copy = Dictionary::new();
        for (key, value) in original.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            let value = self.rewrite(source, source_key, value, dest);
            copy.set(key.clone(), value);
        }
        for (key, value) in page.attributes.iter() {
            if !copy.has(key) {
                let value = self.rewrite(source, source_key, value, dest);
                copy.set(key, value);
            }
        }
        dest.insert(dest_id, copy);

        self.drain(source, source_key, dest);
        Ok(dest_id)
    }

    /// Destination value standing in for a reference to `id`.
    fn reference_to(
        &mut self,
        source: &Document,
        key: SourceKey,
        id: ObjectId,
        dest: &mut Document,
    ) -> Object {
        if let Some(&dest_id) = self.copied.get(&(key, id)) {
            return Object::Reference(dest_id);
        }
        if self.excluded.contains(&(key, id)) {
            self.stats.pruned += 1;
            return Object::Null;
        }
        if source.get(id).is_none() {
            log::debug!("source {key}: dangling reference {id} replaced by null");
            self.stats.dangling += 1;
            return Object::Null;
        }

        let dest_id = dest.new_object_id();
        self.copied.insert((key, id), dest_id);
        self.queue.push_back((id, dest_id));
        Object::Reference(dest_id)
    }

    fn drain(&mut self, source: &Document, key: SourceKey, dest: &mut Document) {
        while let Some((source_id, dest_id)) = self.queue.pop_front() {
            let Some(object) = source.get(source_id) else {
                continue;
            };
            let copy = self.rewrite(source, key, object, dest);
            dest.insert(dest_id, copy);
            self.stats.objects += 1;
        }
    }

    /// Copy a direct value, turning every reference into a destination one.
    fn rewrite(
        &mut self,
        source: &Document,
        key: SourceKey,
        object: &Object,
        dest: &mut Document,
    ) -> Object {
        match object {
            Object::Reference(id) => self.reference_to(source, key, *id, dest),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.rewrite(source, key, item, dest))
                    .collect(),
            ),
            Object::Dictionary(dict) => {
                Object::Dictionary(self.rewrite_dict(source, key, dict, dest, false))
            }
            Object::Stream(stream) => Object::Stream(Stream::new(
                // The serializer writes the real length.
                self.rewrite_dict(source, key, &stream.dict, dest, true),
                stream.content.clone(),
            )),
            other => other.clone(),
        }
    }

    fn rewrite_dict(
        &mut self,
        source: &Document,
        key: SourceKey,
        dict: &Dictionary,
        dest: &mut Document,
        skip_length: bool,
    ) -> Dictionary {
        let mut copy = Dictionary::new();
        for (name, value) in dict.iter() {
            if skip_length && name.as_slice() == b"Length" {
                continue;
            }
            let value = self.rewrite(source, key, value, dest);
            copy.set(name.clone(), value);
        }
        copy
    }
}
