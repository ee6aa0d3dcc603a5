//! The Body Assignment aggregate.
//!
//! One [`Assignment`] document owns its whole tree:
//! `Assignment -> MainColor[] -> SubFeeling[] -> FinalOption[]`.  Nested
//! nodes have no life of their own; they are created, edited and removed
//! only through [`crate::manager::AssignmentManager`].
//!
//! Serialized keys are camelCase and every node carries an `_id`, matching
//! the stored document shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_LANGUAGE;
use crate::error::{AssignmentError, Result};
use crate::types::{AdminRef, AssignmentId, NodeId, NodeLevel};

// ---------------------------------------------------------------------------
// Voice metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceStyle {
    Male,
    Female,
    #[default]
    Neutral,
}

/// TTS options attached to a node's narration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceMeta {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub voice_style: VoiceStyle,
    /// Allowed range 0.5 ..= 2.0
    #[serde(default = "default_unit")]
    pub speech_rate: f64,
    /// Allowed range 0.0 ..= 1.0
    #[serde(default = "default_unit")]
    pub volume: f64,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_unit() -> f64 {
    1.0
}

impl Default for VoiceMeta {
    fn default() -> Self {
        Self {
            language: default_language(),
            voice_style: VoiceStyle::default(),
            speech_rate: default_unit(),
            volume: default_unit(),
        }
    }
}

// ---------------------------------------------------------------------------
// Narration (shared by every level)
// ---------------------------------------------------------------------------

/// Narration text and audio references carried by every node.
///
/// `has_audio` is a cached projection of `audio_file` / `generated_tts_url`.
/// It is persisted for readers of the raw document but always recomputed by
/// [`Narration::refresh_audio`] before a write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_meta: Option<VoiceMeta>,
    #[serde(default)]
    pub audio_file: Option<String>,
    #[serde(default)]
    pub generated_tts_url: Option<String>,
    #[serde(default)]
    pub has_audio: bool,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl Narration {
    /// The URL a player should use: the uploaded file wins over TTS output.
    pub fn audio_url(&self) -> Option<&str> {
        non_empty(&self.audio_file).or_else(|| non_empty(&self.generated_tts_url))
    }

    /// Whether any playable audio is attached, derived from the sources.
    pub fn derived_has_audio(&self) -> bool {
        self.audio_url().is_some()
    }

    pub fn refresh_audio(&mut self) {
        self.has_audio = self.derived_has_audio();
    }
}

// ---------------------------------------------------------------------------
// Tree nodes
// ---------------------------------------------------------------------------

/// Level 3: one of exactly two closing choices under a sub-feeling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalOption {
    #[serde(rename = "_id", alias = "id")]
    pub id: NodeId,
    pub hex: String,
    pub feeling: String,
    #[serde(flatten)]
    pub narration: Narration,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Level 2: a shade of a main color, up to ten per main color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubFeeling {
    #[serde(rename = "_id", alias = "id")]
    pub id: NodeId,
    pub hex: String,
    pub sub_feeling: String,
    #[serde(flatten)]
    pub narration: Narration,
    #[serde(default)]
    pub final_options: Vec<FinalOption>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Level 1: a top-level color and the feeling it maps to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainColor {
    #[serde(rename = "_id", alias = "id")]
    pub id: NodeId,
    pub hex: String,
    pub feeling: String,
    #[serde(flatten)]
    pub narration: Narration,
    #[serde(default)]
    pub sub_feelings: Vec<SubFeeling>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(rename = "_id", alias = "id")]
    pub id: AssignmentId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub main_colors: Vec<MainColor>,
    /// Bumped on every save; doubles as the optimistic-concurrency token.
    #[serde(default = "initial_version")]
    pub version: u32,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<AdminRef>,
    #[serde(default)]
    pub last_edited_by: Option<AdminRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn initial_version() -> u32 {
    1
}

impl Assignment {
    /// A fresh, unpublished assignment with no colors.
    pub fn new(title: String, description: Option<String>, actor: Option<&AdminRef>) -> Self {
        let now = Utc::now();
        Self {
            id: AssignmentId::new(),
            title,
            description,
            main_colors: Vec::new(),
            version: initial_version(),
            published: false,
            published_at: None,
            created_by: actor.cloned(),
            last_edited_by: actor.cloned(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn main_color_count(&self) -> usize {
        self.main_colors.len()
    }

    /// Recompute `has_audio` on every node of the tree.
    pub fn refresh_audio(&mut self) {
        for color in &mut self.main_colors {
            color.narration.refresh_audio();
            for sub in &mut color.sub_feelings {
                sub.narration.refresh_audio();
                for option in &mut sub.final_options {
                    option.narration.refresh_audio();
                }
            }
        }
    }

    /// Deep copy under a new root id with every nested id regenerated, so
    /// the copy shares no identifier with its source.
    pub fn deep_copy(&self, title: String, actor: Option<&AdminRef>) -> Self {
        let now = Utc::now();
        let mut copy = Self::new(title, self.description.clone(), actor);
        copy.main_colors = self
            .main_colors
            .iter()
            .map(|color| MainColor {
                id: NodeId::new(),
                sub_feelings: color
                    .sub_feelings
                    .iter()
                    .map(|sub| SubFeeling {
                        id: NodeId::new(),
                        final_options: sub
                            .final_options
                            .iter()
                            .map(|option| FinalOption {
                                id: NodeId::new(),
                                created_at: now,
                                updated_at: now,
                                ..option.clone()
                            })
                            .collect(),
                        created_at: now,
                        updated_at: now,
                        ..sub.clone()
                    })
                    .collect(),
                created_at: now,
                updated_at: now,
                ..color.clone()
            })
            .collect();
        copy
    }

    pub fn main_color_mut(&mut self, id: &NodeId) -> Result<&mut MainColor> {
        find_mut(&mut self.main_colors, id)
    }
}

impl MainColor {
    pub fn sub_feeling_mut(&mut self, id: &NodeId) -> Result<&mut SubFeeling> {
        find_mut(&mut self.sub_feelings, id)
    }
}

impl SubFeeling {
    pub fn final_option_mut(&mut self, id: &NodeId) -> Result<&mut FinalOption> {
        find_mut(&mut self.final_options, id)
    }
}

// ---------------------------------------------------------------------------
// Sibling lookups
// ---------------------------------------------------------------------------

/// Common view over the three nested node kinds.  Lists hold at most a
/// handful of entries, so lookups are linear scans.
pub trait TreeNode {
    const LEVEL: NodeLevel;

    fn id(&self) -> &NodeId;
    fn hex(&self) -> &str;
}

impl TreeNode for MainColor {
    const LEVEL: NodeLevel = NodeLevel::MainColor;

    fn id(&self) -> &NodeId {
        &self.id
    }

    fn hex(&self) -> &str {
        &self.hex
    }
}

impl TreeNode for SubFeeling {
    const LEVEL: NodeLevel = NodeLevel::SubFeeling;

    fn id(&self) -> &NodeId {
        &self.id
    }

    fn hex(&self) -> &str {
        &self.hex
    }
}

impl TreeNode for FinalOption {
    const LEVEL: NodeLevel = NodeLevel::FinalOption;

    fn id(&self) -> &NodeId {
        &self.id
    }

    fn hex(&self) -> &str {
        &self.hex
    }
}

pub(crate) fn find_mut<'a, T: TreeNode>(list: &'a mut [T], id: &NodeId) -> Result<&'a mut T> {
    list.iter_mut()
        .find(|node| node.id() == id)
        .ok_or_else(|| AssignmentError::not_found(T::LEVEL, id))
}

/// Remove the node with `id`, returning it.
pub(crate) fn remove<T: TreeNode>(list: &mut Vec<T>, id: &NodeId) -> Result<T> {
    let index = list
        .iter()
        .position(|node| node.id() == id)
        .ok_or_else(|| AssignmentError::not_found(T::LEVEL, id))?;
    Ok(list.remove(index))
}

/// Fail with `Duplicate` when `hex` matches (case-insensitively) any sibling
/// other than `except`.
pub(crate) fn ensure_hex_free<T: TreeNode>(
    list: &[T],
    hex: &str,
    except: Option<&NodeId>,
) -> Result<()> {
    let taken = list
        .iter()
        .filter(|node| Some(node.id()) != except)
        .any(|node| node.hex().eq_ignore_ascii_case(hex));

    if taken {
        return Err(AssignmentError::Duplicate {
            level: T::LEVEL,
            hex: hex.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color(hex: &str) -> MainColor {
        let now = Utc::now();
        MainColor {
            id: NodeId::new(),
            hex: hex.to_string(),
            feeling: "Calm".to_string(),
            narration: Narration::default(),
            sub_feelings: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn audio_url_prefers_uploaded_file() {
        let narration = Narration {
            audio_file: Some("/uploads/a.mp3".into()),
            generated_tts_url: Some("https://tts/b.mp3".into()),
            ..Default::default()
        };
        assert_eq!(narration.audio_url(), Some("/uploads/a.mp3"));

        let narration = Narration {
            audio_file: Some(String::new()),
            generated_tts_url: Some("https://tts/b.mp3".into()),
            ..Default::default()
        };
        assert_eq!(narration.audio_url(), Some("https://tts/b.mp3"));
    }

    #[test]
    fn refresh_audio_ignores_stale_flag() {
        let mut narration = Narration {
            has_audio: true,
            ..Default::default()
        };
        narration.refresh_audio();
        assert!(!narration.has_audio);
    }

    #[test]
    fn hex_collision_is_case_insensitive() {
        let list = vec![color("#FF0000")];
        let err = ensure_hex_free(&list, "#ff0000", None).unwrap_err();
        assert!(matches!(
            err,
            AssignmentError::Duplicate {
                level: NodeLevel::MainColor,
                ..
            }
        ));

        // A node may keep its own hex.
        let own = list[0].id.clone();
        assert!(ensure_hex_free(&list, "#ff0000", Some(&own)).is_ok());
    }

    #[test]
    fn missing_node_reports_its_level() {
        let mut list = vec![color("#000")];
        let err = find_mut(&mut list, &NodeId::from("nope")).unwrap_err();
        assert!(matches!(
            err,
            AssignmentError::NotFound {
                level: NodeLevel::MainColor,
                ..
            }
        ));
        assert!(remove(&mut list, &NodeId::from("nope")).is_err());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn document_uses_stored_key_names() {
        let mut assignment = Assignment::new("Body Map".into(), None, None);
        assignment.main_colors.push(color("#abc"));
        let json = serde_json::to_value(&assignment).unwrap();

        assert!(json.get("_id").is_some());
        assert!(json.get("mainColors").is_some());
        assert!(json.get("publishedAt").is_some());
        let first = &json["mainColors"][0];
        assert!(first.get("_id").is_some());
        assert_eq!(first["hasAudio"], serde_json::json!(false));
        assert!(first.get("subFeelings").is_some());

        let back: Assignment = serde_json::from_value(json).unwrap();
        assert_eq!(back, assignment);
    }

    #[test]
    fn deep_copy_regenerates_every_id() {
        let mut original = Assignment::new("Body Map".into(), None, None);
        let mut main = color("#f00");
        let now = Utc::now();
        main.sub_feelings.push(SubFeeling {
            id: NodeId::new(),
            hex: "#a00".into(),
            sub_feeling: "Irritated".into(),
            narration: Narration::default(),
            final_options: vec![
                FinalOption {
                    id: NodeId::new(),
                    hex: "#111".into(),
                    feeling: "A".into(),
                    narration: Narration::default(),
                    created_at: now,
                    updated_at: now,
                },
                FinalOption {
                    id: NodeId::new(),
                    hex: "#222".into(),
                    feeling: "B".into(),
                    narration: Narration::default(),
                    created_at: now,
                    updated_at: now,
                },
            ],
            created_at: now,
            updated_at: now,
        });
        original.main_colors.push(main);

        let copy = original.deep_copy("Body Map (Copy)".into(), None);
        assert_ne!(copy.id, original.id);

        let (a, b) = (&original.main_colors[0], &copy.main_colors[0]);
        assert_ne!(a.id, b.id);
        assert_eq!(a.hex, b.hex);
        assert_ne!(a.sub_feelings[0].id, b.sub_feelings[0].id);
        for (x, y) in a.sub_feelings[0]
            .final_options
            .iter()
            .zip(&b.sub_feelings[0].final_options)
        {
            assert_ne!(x.id, y.id);
            assert_eq!(x.feeling, y.feeling);
        }
    }
}
