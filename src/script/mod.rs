mod prompt;
mod validate;

pub use prompt::build_script_prompt;
#[cfg(test)]
pub(crate) use validate::BANNED_REFERENCES;
pub use validate::{validate, Violation};

use crate::error::{ReelError, Result};
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use std::fmt;
use std::path::Path;

/// 剧本固定为五个场景
pub const SCENE_COUNT: usize = 5;
pub const MIN_DIALOGUES: usize = 2;
pub const MAX_DIALOGUES: usize = 4;

/// 剧中角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Character {
    Maa,
    Baap,
    Hero,
    Behen,
    Dost,
    GavWale,
}

impl Character {
    pub const ALL: [Character; 6] = [
        Character::Maa,
        Character::Baap,
        Character::Hero,
        Character::Behen,
        Character::Dost,
        Character::GavWale,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Character::Maa => "maa",
            Character::Baap => "baap",
            Character::Hero => "hero",
            Character::Behen => "behen",
            Character::Dost => "dost",
            Character::GavWale => "gav_wale",
        }
    }

    /// Role description handed to the script model.
    pub fn role(self) -> &'static str {
        match self {
            Character::Maa => "the hero's mother, warm and worried",
            Character::Baap => "the hero's father, strict and proud",
            Character::Hero => "a quiet young farmer who is pushed too far",
            Character::Behen => "the hero's younger sister",
            Character::Dost => "the hero's loyal friend",
            Character::GavWale => "the villagers who mock the family",
        }
    }

    /// Characters allowed to speak in the given scene.
    ///
    /// Scene 4 belongs to the hero but is not restricted. Scene 5 must also
    /// be spoken by a single one of the two returned roles, which
    /// [`validate`] checks separately.
    pub fn allowed_in_scene(scene_id: u32) -> &'static [Character] {
        match scene_id {
            1 => &[Character::Baap, Character::GavWale],
            2 => &[Character::Maa, Character::Behen],
            3 => &[Character::Dost, Character::GavWale],
            5 => &[Character::Baap, Character::GavWale],
            _ => &Character::ALL,
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 场景情绪，由场景序号决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Conflict,
    Sadness,
    AngerBuilding,
    Rage,
    Shock,
}

impl Emotion {
    /// Emotions in scene order.
    pub const SEQUENCE: [Emotion; SCENE_COUNT] = [
        Emotion::Conflict,
        Emotion::Sadness,
        Emotion::AngerBuilding,
        Emotion::Rage,
        Emotion::Shock,
    ];

    pub fn for_scene(scene_id: u32) -> Option<Emotion> {
        let idx = usize::try_from(scene_id).ok()?.checked_sub(1)?;
        Self::SEQUENCE.get(idx).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Conflict => "conflict",
            Emotion::Sadness => "sadness",
            Emotion::AngerBuilding => "anger_building",
            Emotion::Rage => "rage",
            Emotion::Shock => "shock",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 场景地点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    VillageChowk,
    GharAangan,
    Khet,
    HandpumpArea,
    PanchayatGround,
}

impl Location {
    pub const ALL: [Location; 5] = [
        Location::VillageChowk,
        Location::GharAangan,
        Location::Khet,
        Location::HandpumpArea,
        Location::PanchayatGround,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Location::VillageChowk => "village_chowk",
            Location::GharAangan => "ghar_aangan",
            Location::Khet => "khet",
            Location::HandpumpArea => "handpump_area",
            Location::PanchayatGround => "panchayat_ground",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一句台词
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialogue {
    pub character: Character,
    pub text: String,
}

/// 表示一个场景
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub scene_id: u32,
    pub emotion: Emotion,
    pub location: Location,
    pub dialogues: Vec<Dialogue>,
}

/// 完整剧本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub scenes: Vec<Scene>,
}

impl Script {
    /// Parse a model response into a script.
    ///
    /// Each `{` in the response is tried as the start of the object, so
    /// markdown fences and chatter on either side (braces included) are
    /// skipped. The result is not validated.
    pub fn from_json(raw: &str) -> Result<Self> {
        let mut first_error: Option<serde_json::Error> = None;

        for (start, _) in raw.match_indices('{') {
            let mut stream =
                serde_json::Deserializer::from_str(&raw[start..]).into_iter::<Script>();
            match stream.next() {
                Some(Ok(script)) => return Ok(script),
                Some(Err(e)) => {
                    // a shape error says more than a syntax error in the chatter
                    let replace = match &first_error {
                        None => true,
                        Some(prev) => {
                            prev.classify() != Category::Data && e.classify() == Category::Data
                        }
                    };
                    if replace {
                        first_error = Some(e);
                    }
                }
                None => {}
            }
        }

        Err(match first_error {
            Some(e) => ReelError::Script(format!("Failed to parse script JSON: {}", e)),
            None => ReelError::Script("No JSON object found in response".to_string()),
        })
    }

    /// Consume the script, returning it only if every rule holds.
    pub fn validated(self) -> Result<Self> {
        let violations = validate(&self);
        if violations.is_empty() {
            Ok(self)
        } else {
            Err(ReelError::InvalidScript(violations))
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json(&raw)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path.as_ref(), json).await?;
        Ok(())
    }

    pub fn dialogue_count(&self) -> usize {
        self.scenes.iter().map(|s| s.dialogues.len()).sum()
    }
}
