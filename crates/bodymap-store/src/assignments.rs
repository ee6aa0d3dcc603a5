//! Document operations for [`Assignment`] aggregates.
//!
//! The whole tree lives in the `document` column.  `title`, `description`,
//! `published` and the timestamps are copied out of it on every write so
//! listing can filter and sort in SQL.

use bodymap_core::{
    Assignment, AssignmentId, AssignmentQuery, AssignmentStore, SortField, SortOrder,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new assignment document.
    pub fn insert_assignment(&self, assignment: &Assignment) -> Result<()> {
        let document = serde_json::to_string(assignment)?;
        self.conn().execute(
            "INSERT INTO assignments
                (id, title, description, published, version, document, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                assignment.id.as_str(),
                assignment.title,
                assignment.description,
                assignment.published,
                assignment.version,
                document,
                stamp(&assignment.created_at),
                stamp(&assignment.updated_at),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single assignment by id.
    pub fn get_assignment(&self, id: &AssignmentId) -> Result<Option<Assignment>> {
        let document: Option<String> = self
            .conn()
            .query_row(
                "SELECT document FROM assignments WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        document
            .map(|doc| serde_json::from_str(&doc).map_err(StoreError::from))
            .transpose()
    }

    /// List assignments matching `query`, in the requested order.
    ///
    /// `search` is a substring match over title and description; SQLite's
    /// `LIKE` folds ASCII case only.
    pub fn list_assignments(&self, query: &AssignmentQuery) -> Result<Vec<Assignment>> {
        let column = match query.sort_by {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Title => "title",
        };
        let direction = match query.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let sql = format!(
            "SELECT document
             FROM assignments
             WHERE (?1 IS NULL OR title LIKE ?1 ESCAPE '\\' OR description LIKE ?1 ESCAPE '\\')
               AND (?2 IS NULL OR published = ?2)
             ORDER BY {column} {direction}"
        );

        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![pattern, query.published], row_to_assignment)?;

        let mut assignments = Vec::new();
        for row in rows {
            assignments.push(row?);
        }
        Ok(assignments)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Overwrite the document if the stored version is `expected_version`.
    /// Returns `false` if no row matched.
    pub fn replace_assignment(
        &self,
        assignment: &Assignment,
        expected_version: u32,
    ) -> Result<bool> {
        let document = serde_json::to_string(assignment)?;
        let affected = self.conn().execute(
            "UPDATE assignments
             SET title = ?2, description = ?3, published = ?4, version = ?5,
                 document = ?6, updated_at = ?7
             WHERE id = ?1 AND version = ?8",
            params![
                assignment.id.as_str(),
                assignment.title,
                assignment.description,
                assignment.published,
                assignment.version,
                document,
                stamp(&assignment.updated_at),
                expected_version,
            ],
        )?;

        if affected == 0 {
            tracing::debug!(
                id = %assignment.id,
                expected_version,
                "conditional update matched no row"
            );
        }
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete an assignment and with it the whole tree.  Returns `true` if a
    /// row was deleted.
    pub fn delete_assignment(&self, id: &AssignmentId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM assignments WHERE id = ?1", params![id.as_str()])?;
        Ok(affected > 0)
    }
}

impl AssignmentStore for Database {
    type Error = StoreError;

    fn find(&self, id: &AssignmentId) -> Result<Option<Assignment>> {
        self.get_assignment(id)
    }

    fn insert(&self, assignment: &Assignment) -> Result<()> {
        self.insert_assignment(assignment)
    }

    fn replace(&self, assignment: &Assignment, expected_version: u32) -> Result<bool> {
        self.replace_assignment(assignment, expected_version)
    }

    fn delete(&self, id: &AssignmentId) -> Result<bool> {
        self.delete_assignment(id)
    }

    fn list(&self, query: &AssignmentQuery) -> Result<Vec<Assignment>> {
        self.list_assignments(query)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fixed-width UTC timestamps so text order matches time order.
fn stamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Wrap a search term in `%..%`, escaping LIKE wildcards.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Map a `rusqlite::Row` holding a `document` column to an [`Assignment`].
fn row_to_assignment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Assignment> {
    let document: String = row.get(0)?;
    serde_json::from_str(&document).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use bodymap_core::input::{NewAssignment, NewFinalOption, NewMainColor, NewSubFeeling};
    use bodymap_core::{AdminRef, AssignmentError, AssignmentManager};

    use super::*;

    fn assignment(title: &str, description: Option<&str>) -> Assignment {
        Assignment::new(title.to_string(), description.map(str::to_string), None)
    }

    #[test]
    fn insert_get_delete() {
        let db = Database::open_in_memory().unwrap();
        let doc = assignment("Body Map", Some("Where emotions live"));
        db.insert_assignment(&doc).unwrap();

        let loaded = db.get_assignment(&doc.id).unwrap().expect("stored");
        assert_eq!(loaded, doc);

        assert!(db.delete_assignment(&doc.id).unwrap());
        assert!(db.get_assignment(&doc.id).unwrap().is_none());
        assert!(!db.delete_assignment(&doc.id).unwrap());
    }

    #[test]
    fn replace_is_conditional_on_version() {
        let db = Database::open_in_memory().unwrap();
        let mut doc = assignment("Body Map", None);
        db.insert_assignment(&doc).unwrap();

        doc.title = "Renamed".into();
        doc.version = 2;
        assert!(db.replace_assignment(&doc, 1).unwrap());

        doc.title = "Lost update".into();
        doc.version = 2;
        assert!(!db.replace_assignment(&doc, 1).unwrap());

        let stored = db.get_assignment(&doc.id).unwrap().unwrap();
        assert_eq!(stored.title, "Renamed");
        assert_eq!(stored.version, 2);
    }

    #[test]
    fn list_filters_and_orders() {
        let db = Database::open_in_memory().unwrap();
        let mut alpha = assignment("Alpha", Some("warm colors"));
        alpha.published = true;
        let beta = assignment("Beta", Some("100% cool"));
        let gamma = assignment("Gamma", None);
        for doc in [&alpha, &beta, &gamma] {
            db.insert_assignment(doc).unwrap();
        }

        let query = AssignmentQuery {
            sort_by: SortField::Title,
            order: SortOrder::Asc,
            ..Default::default()
        };
        let titles: Vec<_> = db
            .list_assignments(&query)
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["Alpha", "Beta", "Gamma"]);

        let query = AssignmentQuery {
            search: Some("WARM".into()),
            ..Default::default()
        };
        let found = db.list_assignments(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, alpha.id);

        // Wildcards in the term are literal.
        let query = AssignmentQuery {
            search: Some("0%".into()),
            ..Default::default()
        };
        assert_eq!(db.list_assignments(&query).unwrap().len(), 1);

        let query = AssignmentQuery {
            published: Some(false),
            ..Default::default()
        };
        assert_eq!(db.list_assignments(&query).unwrap().len(), 2);
    }

    #[test]
    fn manager_round_trips_full_tree_through_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bodymap.db");
        let admin = AdminRef("admin-1".into());

        let id = {
            let manager = AssignmentManager::new(Database::open_at(&path).unwrap());
            let id = manager
                .create_assignment(NewAssignment::new("Body Map"), Some(&admin))
                .unwrap()
                .id;
            let a = manager
                .add_main_color(&id, NewMainColor::new("#FF0000", "Anger"), None)
                .unwrap();
            let color = a.main_colors[0].id.clone();
            let a = manager
                .add_sub_feeling(&id, &color, NewSubFeeling::new("#aa0000", "Irritated"), None)
                .unwrap();
            let sub = a.main_colors[0].sub_feelings[0].id.clone();
            manager
                .set_final_options(
                    &id,
                    &color,
                    &sub,
                    vec![
                        NewFinalOption::new("#111111", "Release"),
                        NewFinalOption::new("#222222", "Hold"),
                    ],
                    Some(&admin),
                )
                .unwrap();
            manager.publish(&id, Some(&admin)).unwrap();

            let err = manager
                .add_main_color(&id, NewMainColor::new("#ff0000", "Rage"), None)
                .unwrap_err();
            assert!(matches!(err, AssignmentError::Duplicate { .. }));
            id
        };

        // Reopen from disk.
        let manager = AssignmentManager::new(Database::open_at(&path).unwrap());
        let a = manager.get_assignment(&id).unwrap();
        assert!(a.published);
        assert!(a.published_at.is_some());
        assert_eq!(a.last_edited_by, Some(admin));
        assert_eq!(a.main_colors[0].sub_feelings[0].final_options.len(), 2);

        let listed = manager
            .list_assignments(&AssignmentQuery {
                published: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].main_color_count, 1);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("a_b%c"), "%a\\_b\\%c%");
    }
}
