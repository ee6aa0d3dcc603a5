//! Caller-supplied values for create and partial-update operations.
//!
//! Input types never carry `hasAudio`; unknown keys (including a
//! client-sent `hasAudio`) are ignored on deserialization.
//!
//! Patches distinguish "absent" from "explicit null" on nullable fields via
//! `Option<Option<T>>`: `None` leaves the stored value alone, `Some(None)`
//! clears it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::constants::*;
use crate::error::{AssignmentError, Result};
use crate::model::{FinalOption, MainColor, Narration, SubFeeling, VoiceMeta};
use crate::types::NodeId;
use crate::validation::{check_hex, check_optional, check_required, check_voice_meta};

/// Maps a present JSON value (including `null`) to `Some(..)`.  Combined
/// with `#[serde(default)]` a missing key stays `None`.
fn double_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewAssignment {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validated `(title, description)`.
    pub(crate) fn validate(self) -> Result<(String, Option<String>)> {
        let title = check_required(self.title.as_deref().unwrap_or_default(), "Title", MAX_TITLE_LEN)?;
        let description = check_optional(self.description, "Description", MAX_DESCRIPTION_LEN)?;
        Ok((title, description))
    }
}

/// Partial update of the root's own fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub published: Option<bool>,
}

// ---------------------------------------------------------------------------
// Narration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationInput {
    #[serde(default)]
    pub voice_text: Option<String>,
    #[serde(default)]
    pub voice_meta: Option<VoiceMeta>,
    #[serde(default)]
    pub audio_file: Option<String>,
    #[serde(default)]
    pub generated_tts_url: Option<String>,
}

impl NarrationInput {
    fn into_narration(self) -> Result<Narration> {
        if let Some(meta) = &self.voice_meta {
            check_voice_meta(meta)?;
        }
        let mut narration = Narration {
            voice_text: check_optional(self.voice_text, "Voice text", MAX_VOICE_TEXT_LEN)?,
            voice_meta: self.voice_meta,
            audio_file: check_optional(self.audio_file, "Audio file", usize::MAX)?,
            generated_tts_url: check_optional(self.generated_tts_url, "TTS URL", usize::MAX)?,
            has_audio: false,
        };
        narration.refresh_audio();
        Ok(narration)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub voice_text: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub voice_meta: Option<Option<VoiceMeta>>,
    #[serde(default, deserialize_with = "double_option")]
    pub audio_file: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub generated_tts_url: Option<Option<String>>,
}

impl NarrationPatch {
    /// Validate every provided field, then merge into `target`.  Nothing is
    /// written if any field fails.
    fn apply(self, target: &mut Narration) -> Result<()> {
        if let Some(Some(meta)) = &self.voice_meta {
            check_voice_meta(meta)?;
        }
        let voice_text = self
            .voice_text
            .map(|v| check_optional(v, "Voice text", MAX_VOICE_TEXT_LEN))
            .transpose()?;
        let audio_file = self
            .audio_file
            .map(|v| check_optional(v, "Audio file", usize::MAX))
            .transpose()?;
        let generated_tts_url = self
            .generated_tts_url
            .map(|v| check_optional(v, "TTS URL", usize::MAX))
            .transpose()?;

        if let Some(v) = voice_text {
            target.voice_text = v;
        }
        if let Some(v) = self.voice_meta {
            target.voice_meta = v;
        }
        if let Some(v) = audio_file {
            target.audio_file = v;
        }
        if let Some(v) = generated_tts_url {
            target.generated_tts_url = v;
        }
        target.refresh_audio();
        Ok(())
    }
}

/// Both halves of a required `(hex, label)` pair, or the given message.
fn required_pair(
    hex: Option<String>,
    label: Option<String>,
    missing: &str,
) -> Result<(String, String)> {
    match (hex, label) {
        (Some(hex), Some(label)) if !hex.trim().is_empty() && !label.trim().is_empty() => {
            Ok((hex, label))
        }
        _ => Err(AssignmentError::validation(missing)),
    }
}

// ---------------------------------------------------------------------------
// Main color
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMainColor {
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(default)]
    pub feeling: Option<String>,
    #[serde(flatten)]
    pub narration: NarrationInput,
}

impl NewMainColor {
    pub fn new(hex: impl Into<String>, feeling: impl Into<String>) -> Self {
        Self {
            hex: Some(hex.into()),
            feeling: Some(feeling.into()),
            narration: NarrationInput::default(),
        }
    }

    pub(crate) fn build(self, now: DateTime<Utc>) -> Result<MainColor> {
        let (hex, feeling) =
            required_pair(self.hex, self.feeling, "Hex color and feeling are required")?;
        Ok(MainColor {
            id: NodeId::new(),
            hex: check_hex(&hex)?,
            feeling: check_required(&feeling, "Feeling", MAX_FEELING_LEN)?,
            narration: self.narration.into_narration()?,
            sub_feelings: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainColorPatch {
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(default)]
    pub feeling: Option<String>,
    #[serde(flatten)]
    pub narration: NarrationPatch,
}

impl MainColorPatch {
    /// Validated hex, if the patch carries one.
    pub(crate) fn hex(&self) -> Result<Option<String>> {
        self.hex.as_deref().map(check_hex).transpose()
    }

    pub(crate) fn apply(self, target: &mut MainColor, hex: Option<String>, now: DateTime<Utc>) -> Result<()> {
        let feeling = self
            .feeling
            .map(|f| check_required(&f, "Feeling", MAX_FEELING_LEN))
            .transpose()?;
        self.narration.apply(&mut target.narration)?;
        if let Some(hex) = hex {
            target.hex = hex;
        }
        if let Some(feeling) = feeling {
            target.feeling = feeling;
        }
        target.updated_at = now;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-feeling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubFeeling {
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(default)]
    pub sub_feeling: Option<String>,
    #[serde(flatten)]
    pub narration: NarrationInput,
}

impl NewSubFeeling {
    pub fn new(hex: impl Into<String>, sub_feeling: impl Into<String>) -> Self {
        Self {
            hex: Some(hex.into()),
            sub_feeling: Some(sub_feeling.into()),
            narration: NarrationInput::default(),
        }
    }

    pub(crate) fn build(self, now: DateTime<Utc>) -> Result<SubFeeling> {
        let (hex, label) = required_pair(
            self.hex,
            self.sub_feeling,
            "Hex color and sub-feeling are required",
        )?;
        Ok(SubFeeling {
            id: NodeId::new(),
            hex: check_hex(&hex)?,
            sub_feeling: check_required(&label, "Sub-feeling", MAX_FEELING_LEN)?,
            narration: self.narration.into_narration()?,
            final_options: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubFeelingPatch {
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(default)]
    pub sub_feeling: Option<String>,
    #[serde(flatten)]
    pub narration: NarrationPatch,
}

impl SubFeelingPatch {
    pub(crate) fn hex(&self) -> Result<Option<String>> {
        self.hex.as_deref().map(check_hex).transpose()
    }

    pub(crate) fn apply(self, target: &mut SubFeeling, hex: Option<String>, now: DateTime<Utc>) -> Result<()> {
        let label = self
            .sub_feeling
            .map(|s| check_required(&s, "Sub-feeling", MAX_FEELING_LEN))
            .transpose()?;
        self.narration.apply(&mut target.narration)?;
        if let Some(hex) = hex {
            target.hex = hex;
        }
        if let Some(label) = label {
            target.sub_feeling = label;
        }
        target.updated_at = now;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Final option
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFinalOption {
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(default)]
    pub feeling: Option<String>,
    #[serde(flatten)]
    pub narration: NarrationInput,
}

impl NewFinalOption {
    pub fn new(hex: impl Into<String>, feeling: impl Into<String>) -> Self {
        Self {
            hex: Some(hex.into()),
            feeling: Some(feeling.into()),
            narration: NarrationInput::default(),
        }
    }

    pub(crate) fn build(self, now: DateTime<Utc>) -> Result<FinalOption> {
        let (hex, feeling) = required_pair(
            self.hex,
            self.feeling,
            "Each option must have hex color and feeling",
        )?;
        Ok(FinalOption {
            id: NodeId::new(),
            hex: check_hex(&hex)?,
            feeling: check_required(&feeling, "Feeling", MAX_FEELING_LEN)?,
            narration: self.narration.into_narration()?,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalOptionPatch {
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(default)]
    pub feeling: Option<String>,
    #[serde(flatten)]
    pub narration: NarrationPatch,
}

impl FinalOptionPatch {
    pub(crate) fn hex(&self) -> Result<Option<String>> {
        self.hex.as_deref().map(check_hex).transpose()
    }

    pub(crate) fn apply(self, target: &mut FinalOption, hex: Option<String>, now: DateTime<Utc>) -> Result<()> {
        let feeling = self
            .feeling
            .map(|f| check_required(&f, "Feeling", MAX_FEELING_LEN))
            .transpose()?;
        self.narration.apply(&mut target.narration)?;
        if let Some(hex) = hex {
            target.hex = hex;
        }
        if let Some(feeling) = feeling {
            target.feeling = feeling;
        }
        target.updated_at = now;
        Ok(())
    }
}
