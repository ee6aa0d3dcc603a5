//! Persistence seam for the assignment aggregate.
//!
//! A store keeps exactly one document per assignment and knows nothing of
//! the tree's rules. [`AssignmentStore::replace`] is a conditional
//! whole-document write keyed on the version the caller loaded.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Mutex;

use serde::{Deserialize, Deserializer};

use crate::model::Assignment;
use crate::types::AssignmentId;

pub trait AssignmentStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn find(&self, id: &AssignmentId) -> Result<Option<Assignment>, Self::Error>;

    /// Store a brand-new document.
    fn insert(&self, assignment: &Assignment) -> Result<(), Self::Error>;

    /// Overwrite the stored document only if its version is still
    /// `expected_version`.  Returns `false` when the row changed underneath
    /// the caller or no longer exists.
    fn replace(&self, assignment: &Assignment, expected_version: u32) -> Result<bool, Self::Error>;

    /// Returns `true` if a document was removed.
    fn delete(&self, id: &AssignmentId) -> Result<bool, Self::Error>;

    fn list(&self, query: &AssignmentQuery) -> Result<Vec<Assignment>, Self::Error>;
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum SortField {
    #[serde(rename = "createdAt")]
    CreatedAt,
    #[default]
    #[serde(rename = "updatedAt")]
    UpdatedAt,
    #[serde(rename = "title")]
    Title,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filter and ordering for [`AssignmentStore::list`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentQuery {
    /// Case-insensitive substring over title and description.
    #[serde(default)]
    pub search: Option<String>,
    /// Any value other than `true` selects unpublished rows.
    #[serde(default, deserialize_with = "lenient_flag")]
    pub published: Option<bool>,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub order: SortOrder,
}

/// Accepts a JSON bool or query-string text; text is `true` only when it
/// reads exactly `true`.
fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(Option::<Flag>::deserialize(deserializer)?.map(|flag| match flag {
        Flag::Bool(b) => b,
        Flag::Text(text) => text == "true",
    }))
}

impl AssignmentQuery {
    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, assignment: &Assignment) -> bool {
        if let Some(published) = self.published {
            if assignment.published != published {
                return false;
            }
        }
        match self.search_term() {
            None => true,
            Some(term) => {
                assignment.title.to_lowercase().contains(&term)
                    || assignment
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&term))
            }
        }
    }

    pub fn sort(&self, assignments: &mut [Assignment]) {
        assignments.sort_by(|a, b| {
            let ord = match self.sort_by {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SortField::Title => a.title.cmp(&b.title),
            };
            match self.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store, handy for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<AssignmentId, Assignment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn docs(&self) -> std::sync::MutexGuard<'_, HashMap<AssignmentId, Assignment>> {
        // A panic while holding the lock cannot leave a half-written
        // document: every write is a single map operation.
        self.docs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AssignmentStore for MemoryStore {
    type Error = Infallible;

    fn find(&self, id: &AssignmentId) -> Result<Option<Assignment>, Self::Error> {
        Ok(self.docs().get(id).cloned())
    }

    fn insert(&self, assignment: &Assignment) -> Result<(), Self::Error> {
        self.docs().insert(assignment.id.clone(), assignment.clone());
        Ok(())
    }

    fn replace(&self, assignment: &Assignment, expected_version: u32) -> Result<bool, Self::Error> {
        let mut docs = self.docs();
        match docs.get_mut(&assignment.id) {
            Some(stored) if stored.version == expected_version => {
                *stored = assignment.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn delete(&self, id: &AssignmentId) -> Result<bool, Self::Error> {
        Ok(self.docs().remove(id).is_some())
    }

    fn list(&self, query: &AssignmentQuery) -> Result<Vec<Assignment>, Self::Error> {
        let mut found: Vec<Assignment> = self
            .docs()
            .values()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();
        query.sort(&mut found);
        Ok(found)
    }
}
