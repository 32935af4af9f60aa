use std::collections::{BTreeMap, HashSet};

use super::{Dictionary, Object, ObjectId};
use crate::error::{PdfError, Result};

/// An in-memory PDF object graph.
///
/// Objects are stored in an arena keyed by id. The trailer holds `/Root`
/// (and optionally `/Info` and `/ID`); `max_number` is the highest object
/// number ever handed out, so new ids never collide with existing ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// PDF version from the header, e.g. `1.7`.
    pub version: String,
    /// Indirect objects in ascending id order.
    pub objects: BTreeMap<ObjectId, Object>,
    /// Trailer dictionary.
    pub trailer: Dictionary,
    /// Highest object number in use.
    pub max_number: u32,
}

impl Default for Document {
    fn default() -> Self {
        Self::with_version("1.7")
    }
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty document with the given header version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            objects: BTreeMap::new(),
            trailer: Dictionary::new(),
            max_number: 0,
        }
    }

    /// Reserve the next object id without storing anything under it yet.
    pub fn new_object_id(&mut self) -> ObjectId {
        self.max_number += 1;
        ObjectId::new(self.max_number, 0)
    }

    /// Store an object under a fresh id.
    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        let id = self.new_object_id();
        self.objects.insert(id, object.into());
        id
    }

    /// Store an object under a known id, replacing any previous value.
    pub fn insert(&mut self, id: ObjectId, object: impl Into<Object>) {
        self.max_number = self.max_number.max(id.number);
        self.objects.insert(id, object.into());
    }

    /// Look up an indirect object.
    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    /// Look up an indirect object for mutation.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    /// Follow a chain of references until a direct object is reached.
    ///
    /// # Errors
    ///
    /// Returns a `Structure` error when the chain points at a missing object
    /// or loops back on itself.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> Result<&'a Object> {
        let mut current = object;
        let mut seen = HashSet::new();
        while let Object::Reference(id) = current {
            if !seen.insert(*id) {
                return Err(PdfError::structure(format!(
                    "reference chain through {id} is circular"
                )));
            }
            current = self
                .get(*id)
                .ok_or_else(|| PdfError::structure(format!("unresolved reference {id}")))?;
        }
        Ok(current)
    }

    /// Resolve `id` and require a dictionary (or stream dictionary).
    pub fn get_dict(&self, id: ObjectId) -> Result<&Dictionary> {
        let stored = self
            .get(id)
            .ok_or_else(|| PdfError::structure(format!("unresolved reference {id}")))?;
        let object = self.resolve(stored)?;
        object.as_dict().ok_or_else(|| {
            PdfError::structure(format!(
                "object {id} is a {} where a dictionary was expected",
                object.type_name()
            ))
        })
    }

    /// Id of the catalog named by the trailer's `/Root`.
    pub fn catalog_id(&self) -> Result<ObjectId> {
        self.trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .ok_or_else(|| PdfError::parse("trailer has no /Root reference"))
    }

    /// The catalog dictionary.
    pub fn catalog(&self) -> Result<&Dictionary> {
        let id = self.catalog_id()?;
        self.get_dict(id)
            .map_err(|err| PdfError::parse(format!("catalog {id} is unusable: {err}")))
    }

    /// Id of the page tree root named by the catalog's `/Pages`.
    pub fn pages_root_id(&self) -> Result<ObjectId> {
        self.catalog()?
            .get(b"Pages")
            .and_then(Object::as_reference)
            .ok_or_else(|| PdfError::parse("catalog has no /Pages reference"))
    }
}
