//! The assignment aggregate manager.
//!
//! [`AssignmentManager`] is the only code path that mutates an assignment
//! tree.  Every mutating operation follows the same cycle:
//!
//! 1. validate caller input that needs no stored state,
//! 2. load the whole aggregate by root id,
//! 3. apply one mutation to the in-memory tree,
//! 4. recompute derived fields and check every invariant,
//! 5. stamp the editor, bump `version` and write the document back,
//!    conditional on the version loaded in step 2.
//!
//! A failure at any step leaves the stored document untouched.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::constants::{
    COPY_SUFFIX, FINAL_OPTION_COUNT, MAX_DESCRIPTION_LEN, MAX_SUB_FEELINGS, MAX_TITLE_LEN,
};
use crate::error::{AssignmentError, Result};
use crate::input::{
    AssignmentPatch, FinalOptionPatch, MainColorPatch, NewAssignment, NewFinalOption,
    NewMainColor, NewSubFeeling, SubFeelingPatch,
};
use crate::model::{ensure_hex_free, remove, Assignment};
use crate::preview::AssignmentPreview;
use crate::store::{AssignmentQuery, AssignmentStore};
use crate::types::{AdminRef, AssignmentId, NodeId, NodeLevel};
use crate::validation::{check_optional, check_required, validate_tree};

/// A list row: the full document plus its computed color count.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSummary {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub main_color_count: usize,
}

pub struct AssignmentManager<S> {
    store: S,
}

impl<S: AssignmentStore> AssignmentManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn load(&self, id: &AssignmentId) -> Result<Assignment> {
        self.store
            .find(id)
            .map_err(AssignmentError::persistence)?
            .ok_or_else(|| AssignmentError::not_found(NodeLevel::Assignment, id))
    }

    /// Validate the mutated tree and write it back under the version that
    /// was loaded.
    fn commit(&self, mut assignment: Assignment, actor: Option<&AdminRef>) -> Result<Assignment> {
        assignment.refresh_audio();
        validate_tree(&assignment)?;

        let expected = assignment.version;
        assignment.version = expected + 1;
        assignment.last_edited_by = actor.cloned();
        assignment.updated_at = Utc::now();

        let written = self
            .store
            .replace(&assignment, expected)
            .map_err(AssignmentError::persistence)?;
        if !written {
            warn!(id = %assignment.id, expected_version = expected, "stale write rejected");
            return Err(AssignmentError::Conflict { id: assignment.id });
        }
        Ok(assignment)
    }

    /// Load, mutate, commit.
    fn edit<F>(&self, id: &AssignmentId, actor: Option<&AdminRef>, mutate: F) -> Result<Assignment>
    where
        F: FnOnce(&mut Assignment) -> Result<()>,
    {
        let mut assignment = self.load(id)?;
        mutate(&mut assignment)?;
        self.commit(assignment, actor)
    }

    // ------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------

    pub fn create_assignment(
        &self,
        input: NewAssignment,
        actor: Option<&AdminRef>,
    ) -> Result<Assignment> {
        let (title, description) = input.validate()?;
        let assignment = Assignment::new(title, description, actor);
        validate_tree(&assignment)?;

        self.store
            .insert(&assignment)
            .map_err(AssignmentError::persistence)?;

        info!(id = %assignment.id, title = %assignment.title, "body assignment created");
        Ok(assignment)
    }

    pub fn get_assignment(&self, id: &AssignmentId) -> Result<Assignment> {
        self.load(id)
    }

    pub fn list_assignments(&self, query: &AssignmentQuery) -> Result<Vec<AssignmentSummary>> {
        let found = self
            .store
            .list(query)
            .map_err(AssignmentError::persistence)?;

        Ok(found
            .into_iter()
            .map(|assignment| AssignmentSummary {
                main_color_count: assignment.main_color_count(),
                assignment,
            })
            .collect())
    }

    /// Partial update of title, description and published flag.  A change
    /// to `published` goes through the same gate as [`Self::publish`].
    pub fn update_assignment(
        &self,
        id: &AssignmentId,
        patch: AssignmentPatch,
        actor: Option<&AdminRef>,
    ) -> Result<Assignment> {
        let title = patch
            .title
            .map(|t| check_required(&t, "Title", MAX_TITLE_LEN))
            .transpose()?;
        let description = patch
            .description
            .map(|d| check_optional(d, "Description", MAX_DESCRIPTION_LEN))
            .transpose()?;

        let updated = self.edit(id, actor, |assignment| {
            if let Some(title) = title {
                assignment.title = title;
            }
            if let Some(description) = description {
                assignment.description = description;
            }
            match patch.published {
                Some(true) => mark_published(assignment),
                Some(false) => {
                    assignment.published = false;
                    Ok(())
                }
                None => Ok(()),
            }
        })?;

        debug!(id = %updated.id, "body assignment updated");
        Ok(updated)
    }

    pub fn delete_assignment(&self, id: &AssignmentId) -> Result<()> {
        let removed = self.store.delete(id).map_err(AssignmentError::persistence)?;
        if !removed {
            return Err(AssignmentError::not_found(NodeLevel::Assignment, id));
        }
        info!(id = %id, "body assignment deleted");
        Ok(())
    }

    /// Copy the whole tree into a new unpublished assignment titled
    /// `"<original> (Copy)"`.  Nested ids are regenerated.
    pub fn duplicate(&self, id: &AssignmentId, actor: Option<&AdminRef>) -> Result<Assignment> {
        let original = self.load(id)?;
        let title = format!("{}{}", original.title, COPY_SUFFIX);

        let mut copy = original.deep_copy(title, actor);
        copy.refresh_audio();
        // The suffix may push a long title past its limit.
        validate_tree(&copy)?;

        self.store.insert(&copy).map_err(AssignmentError::persistence)?;

        info!(source = %id, id = %copy.id, "body assignment duplicated");
        Ok(copy)
    }

    // ------------------------------------------------------------------
    // Main colors
    // ------------------------------------------------------------------

    pub fn add_main_color(
        &self,
        id: &AssignmentId,
        input: NewMainColor,
        actor: Option<&AdminRef>,
    ) -> Result<Assignment> {
        let color = input.build(Utc::now())?;
        let color_id = color.id.clone();

        let updated = self.edit(id, actor, |assignment| {
            ensure_hex_free(&assignment.main_colors, &color.hex, None)?;
            assignment.main_colors.push(color);
            Ok(())
        })?;

        debug!(id = %id, color = %color_id, "main color added");
        Ok(updated)
    }

    pub fn update_main_color(
        &self,
        id: &AssignmentId,
        color_id: &NodeId,
        patch: MainColorPatch,
        actor: Option<&AdminRef>,
    ) -> Result<Assignment> {
        let hex = patch.hex()?;

        let updated = self.edit(id, actor, |assignment| {
            assignment.main_color_mut(color_id)?;
            if let Some(hex) = &hex {
                ensure_hex_free(&assignment.main_colors, hex, Some(color_id))?;
            }
            let color = assignment.main_color_mut(color_id)?;
            patch.apply(color, hex, Utc::now())
        })?;

        debug!(id = %id, color = %color_id, "main color updated");
        Ok(updated)
    }

    /// Removes the color together with its sub-feelings and final options.
    pub fn delete_main_color(
        &self,
        id: &AssignmentId,
        color_id: &NodeId,
        actor: Option<&AdminRef>,
    ) -> Result<Assignment> {
        let updated = self.edit(id, actor, |assignment| {
            remove(&mut assignment.main_colors, color_id)?;
            Ok(())
        })?;

        debug!(id = %id, color = %color_id, "main color deleted");
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Sub-feelings
    // ------------------------------------------------------------------

    pub fn add_sub_feeling(
        &self,
        id: &AssignmentId,
        color_id: &NodeId,
        input: NewSubFeeling,
        actor: Option<&AdminRef>,
    ) -> Result<Assignment> {
        let sub = input.build(Utc::now())?;
        let sub_id = sub.id.clone();

        let updated = self.edit(id, actor, |assignment| {
            let color = assignment.main_color_mut(color_id)?;
            if color.sub_feelings.len() >= MAX_SUB_FEELINGS {
                return Err(AssignmentError::LimitExceeded {
                    limit: MAX_SUB_FEELINGS,
                });
            }
            ensure_hex_free(&color.sub_feelings, &sub.hex, None)?;
            color.sub_feelings.push(sub);
            Ok(())
        })?;

        debug!(id = %id, color = %color_id, sub_feeling = %sub_id, "sub-feeling added");
        Ok(updated)
    }

    pub fn update_sub_feeling(
        &self,
        id: &AssignmentId,
        color_id: &NodeId,
        sub_feeling_id: &NodeId,
        patch: SubFeelingPatch,
        actor: Option<&AdminRef>,
    ) -> Result<Assignment> {
        let hex = patch.hex()?;

        let updated = self.edit(id, actor, |assignment| {
            let color = assignment.main_color_mut(color_id)?;
            color.sub_feeling_mut(sub_feeling_id)?;
            if let Some(hex) = &hex {
                ensure_hex_free(&color.sub_feelings, hex, Some(sub_feeling_id))?;
            }
            let sub = color.sub_feeling_mut(sub_feeling_id)?;
            patch.apply(sub, hex, Utc::now())
        })?;

        debug!(id = %id, color = %color_id, sub_feeling = %sub_feeling_id, "sub-feeling updated");
        Ok(updated)
    }

    pub fn delete_sub_feeling(
        &self,
        id: &AssignmentId,
        color_id: &NodeId,
        sub_feeling_id: &NodeId,
        actor: Option<&AdminRef>,
    ) -> Result<Assignment> {
        let updated = self.edit(id, actor, |assignment| {
            let color = assignment.main_color_mut(color_id)?;
            remove(&mut color.sub_feelings, sub_feeling_id)?;
            Ok(())
        })?;

        debug!(id = %id, color = %color_id, sub_feeling = %sub_feeling_id, "sub-feeling deleted");
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Final options
    // ------------------------------------------------------------------

    /// Replace the sub-feeling's final options with exactly two new ones.
    pub fn set_final_options(
        &self,
        id: &AssignmentId,
        color_id: &NodeId,
        sub_feeling_id: &NodeId,
        options: Vec<NewFinalOption>,
        actor: Option<&AdminRef>,
    ) -> Result<Assignment> {
        if options.len() != FINAL_OPTION_COUNT {
            return Err(AssignmentError::validation(
                "Exactly 2 final options are required",
            ));
        }
        let now = Utc::now();
        let options = options
            .into_iter()
            .map(|option| option.build(now))
            .collect::<Result<Vec<_>>>()?;

        let updated = self.edit(id, actor, |assignment| {
            let color = assignment.main_color_mut(color_id)?;
            let sub = color.sub_feeling_mut(sub_feeling_id)?;
            if options[0].hex.eq_ignore_ascii_case(&options[1].hex) {
                return Err(AssignmentError::validation(
                    "Final options must have different colors",
                ));
            }
            sub.final_options = options;
            sub.updated_at = now;
            Ok(())
        })?;

        debug!(id = %id, color = %color_id, sub_feeling = %sub_feeling_id, "final options set");
        Ok(updated)
    }

    pub fn update_final_option(
        &self,
        id: &AssignmentId,
        color_id: &NodeId,
        sub_feeling_id: &NodeId,
        option_id: &NodeId,
        patch: FinalOptionPatch,
        actor: Option<&AdminRef>,
    ) -> Result<Assignment> {
        let hex = patch.hex()?;

        let updated = self.edit(id, actor, |assignment| {
            let sub = assignment
                .main_color_mut(color_id)?
                .sub_feeling_mut(sub_feeling_id)?;
            sub.final_option_mut(option_id)?;
            if let Some(hex) = &hex {
                ensure_hex_free(&sub.final_options, hex, Some(option_id))?;
            }
            let option = sub.final_option_mut(option_id)?;
            patch.apply(option, hex, Utc::now())
        })?;

        debug!(
            id = %id,
            color = %color_id,
            sub_feeling = %sub_feeling_id,
            option = %option_id,
            "final option updated"
        );
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Lifecycle and preview
    // ------------------------------------------------------------------

    pub fn publish(&self, id: &AssignmentId, actor: Option<&AdminRef>) -> Result<Assignment> {
        let updated = self.edit(id, actor, mark_published)?;
        info!(id = %id, published_at = ?updated.published_at, "body assignment published");
        Ok(updated)
    }

    /// Clears the flag only; `published_at` keeps the first publish date.
    pub fn unpublish(&self, id: &AssignmentId, actor: Option<&AdminRef>) -> Result<Assignment> {
        let updated = self.edit(id, actor, |assignment| {
            assignment.published = false;
            Ok(())
        })?;
        info!(id = %id, "body assignment unpublished");
        Ok(updated)
    }

    pub fn preview(&self, id: &AssignmentId) -> Result<AssignmentPreview> {
        let assignment = self.load(id)?;
        Ok(AssignmentPreview::from(&assignment))
    }
}

fn mark_published(assignment: &mut Assignment) -> Result<()> {
    if assignment.main_colors.is_empty() {
        return Err(AssignmentError::validation(
            "Cannot publish assignment without main colors",
        ));
    }
    assignment.published = true;
    if assignment.published_at.is_none() {
        assignment.published_at = Some(Utc::now());
    }
    Ok(())
}
