//! Field rules and whole-tree invariant checks.
//!
//! The manager runs [`validate_tree`] on the mutated in-memory aggregate
//! before every save, so a document that breaks an invariant never reaches
//! the store.

use std::collections::HashSet;

use crate::constants::*;
use crate::error::{AssignmentError, Result};
use crate::model::{Assignment, Narration, TreeNode, VoiceMeta};

/// `#RGB` or `#RRGGBB`, any case.
pub fn is_valid_hex(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Trim and format-check a hex color.
pub(crate) fn check_hex(value: &str) -> Result<String> {
    let hex = value.trim();
    if !is_valid_hex(hex) {
        return Err(AssignmentError::validation(format!(
            "Invalid hex color '{hex}', expected #RGB or #RRGGBB"
        )));
    }
    Ok(hex.to_string())
}

/// Trim a required text field and enforce its maximum length.
pub(crate) fn check_required(value: &str, field: &str, max: usize) -> Result<String> {
    let text = value.trim();
    if text.is_empty() {
        return Err(AssignmentError::validation(format!("{field} is required")));
    }
    check_len(text, field, max)?;
    Ok(text.to_string())
}

/// Trim an optional text field; blank becomes `None`.
pub(crate) fn check_optional(value: Option<String>, field: &str, max: usize) -> Result<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let text = value.trim();
    if text.is_empty() {
        return Ok(None);
    }
    check_len(text, field, max)?;
    Ok(Some(text.to_string()))
}

fn check_len(text: &str, field: &str, max: usize) -> Result<()> {
    if text.chars().count() > max {
        return Err(AssignmentError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

pub(crate) fn check_voice_meta(meta: &VoiceMeta) -> Result<()> {
    if !(MIN_SPEECH_RATE..=MAX_SPEECH_RATE).contains(&meta.speech_rate) {
        return Err(AssignmentError::validation(format!(
            "Speech rate must be between {MIN_SPEECH_RATE} and {MAX_SPEECH_RATE}"
        )));
    }
    if !(0.0..=1.0).contains(&meta.volume) {
        return Err(AssignmentError::validation("Volume must be between 0 and 1"));
    }
    if meta.language.trim().is_empty() {
        return Err(AssignmentError::validation("Voice language is required"));
    }
    Ok(())
}

fn check_narration(narration: &Narration) -> Result<()> {
    if let Some(text) = &narration.voice_text {
        check_len(text, "Voice text", MAX_VOICE_TEXT_LEN)?;
    }
    if let Some(meta) = &narration.voice_meta {
        check_voice_meta(meta)?;
    }
    if narration.has_audio != narration.derived_has_audio() {
        return Err(AssignmentError::validation(
            "Audio flag is out of sync with its sources",
        ));
    }
    Ok(())
}

fn check_unique<T: TreeNode>(list: &[T]) -> Result<()> {
    let mut seen = HashSet::with_capacity(list.len());
    for node in list {
        if !seen.insert(node.hex().to_ascii_lowercase()) {
            return Err(AssignmentError::Duplicate {
                level: T::LEVEL,
                hex: node.hex().to_string(),
            });
        }
    }
    Ok(())
}

/// Check every invariant of the aggregate.
pub fn validate_tree(assignment: &Assignment) -> Result<()> {
    check_required(&assignment.title, "Title", MAX_TITLE_LEN)?;
    if let Some(description) = &assignment.description {
        check_len(description, "Description", MAX_DESCRIPTION_LEN)?;
    }

    check_unique(&assignment.main_colors)?;
    for color in &assignment.main_colors {
        check_hex(&color.hex)?;
        check_required(&color.feeling, "Feeling", MAX_FEELING_LEN)?;
        check_narration(&color.narration)?;

        if color.sub_feelings.len() > MAX_SUB_FEELINGS {
            return Err(AssignmentError::LimitExceeded {
                limit: MAX_SUB_FEELINGS,
            });
        }
        check_unique(&color.sub_feelings)?;

        for sub in &color.sub_feelings {
            check_hex(&sub.hex)?;
            check_required(&sub.sub_feeling, "Sub-feeling", MAX_FEELING_LEN)?;
            check_narration(&sub.narration)?;

            match sub.final_options.len() {
                0 => {}
                FINAL_OPTION_COUNT => {
                    if sub.final_options[0]
                        .hex
                        .eq_ignore_ascii_case(&sub.final_options[1].hex)
                    {
                        return Err(AssignmentError::validation(
                            "Final options must have different colors",
                        ));
                    }
                }
                _ => {
                    return Err(AssignmentError::validation(
                        "Final options must be exactly 2 or empty",
                    ))
                }
            }

            for option in &sub.final_options {
                check_hex(&option.hex)?;
                check_required(&option.feeling, "Feeling", MAX_FEELING_LEN)?;
                check_narration(&option.narration)?;
            }
        }
    }

    if assignment.published && assignment.published_at.is_none() {
        return Err(AssignmentError::validation(
            "Published assignment is missing its publish date",
        ));
    }

    Ok(())
}
