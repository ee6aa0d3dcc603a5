//! Read-only rendering view of an assignment for front-end preview.
//!
//! Unlike the stored document, every node exposes a single `audioUrl`
//! (uploaded file first, TTS output second) and a freshly derived
//! `hasAudio`.

use serde::Serialize;

use crate::model::{Assignment, FinalOption, MainColor, SubFeeling};
use crate::types::{AssignmentId, NodeId};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentPreview {
    pub id: AssignmentId,
    pub title: String,
    pub description: Option<String>,
    pub published: bool,
    pub main_colors: Vec<MainColorPreview>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MainColorPreview {
    pub id: NodeId,
    pub hex: String,
    pub feeling: String,
    pub voice_text: Option<String>,
    pub audio_url: Option<String>,
    pub has_audio: bool,
    pub sub_feelings: Vec<SubFeelingPreview>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubFeelingPreview {
    pub id: NodeId,
    pub hex: String,
    pub sub_feeling: String,
    pub voice_text: Option<String>,
    pub audio_url: Option<String>,
    pub has_audio: bool,
    pub final_options: Vec<FinalOptionPreview>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalOptionPreview {
    pub id: NodeId,
    pub hex: String,
    pub feeling: String,
    pub voice_text: Option<String>,
    pub audio_url: Option<String>,
    pub has_audio: bool,
}

impl From<&FinalOption> for FinalOptionPreview {
    fn from(option: &FinalOption) -> Self {
        Self {
            id: option.id.clone(),
            hex: option.hex.clone(),
            feeling: option.feeling.clone(),
            voice_text: option.narration.voice_text.clone(),
            audio_url: option.narration.audio_url().map(str::to_string),
            has_audio: option.narration.derived_has_audio(),
        }
    }
}

impl From<&SubFeeling> for SubFeelingPreview {
    fn from(sub: &SubFeeling) -> Self {
        Self {
            id: sub.id.clone(),
            hex: sub.hex.clone(),
            sub_feeling: sub.sub_feeling.clone(),
            voice_text: sub.narration.voice_text.clone(),
            audio_url: sub.narration.audio_url().map(str::to_string),
            has_audio: sub.narration.derived_has_audio(),
            final_options: sub.final_options.iter().map(Into::into).collect(),
        }
    }
}

impl From<&MainColor> for MainColorPreview {
    fn from(color: &MainColor) -> Self {
        Self {
            id: color.id.clone(),
            hex: color.hex.clone(),
            feeling: color.feeling.clone(),
            voice_text: color.narration.voice_text.clone(),
            audio_url: color.narration.audio_url().map(str::to_string),
            has_audio: color.narration.derived_has_audio(),
            sub_feelings: color.sub_feelings.iter().map(Into::into).collect(),
        }
    }
}

impl From<&Assignment> for AssignmentPreview {
    fn from(assignment: &Assignment) -> Self {
        Self {
            id: assignment.id.clone(),
            title: assignment.title.clone(),
            description: assignment.description.clone(),
            published: assignment.published,
            main_colors: assignment.main_colors.iter().map(Into::into).collect(),
        }
    }
}
