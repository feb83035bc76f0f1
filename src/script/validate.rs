use super::{Character, Emotion, Script, MAX_DIALOGUES, MIN_DIALOGUES, SCENE_COUNT};
use thiserror::Error;

/// Franchise names that must never reach a generated reel, in Latin and
/// Devanagari spellings. Compared case-insensitively.
pub(crate) const BANNED_REFERENCES: &[&str] = &[
    "hulk",
    "marvel",
    "avengers",
    "bruce banner",
    "हल्क",
    "मार्वल",
    "एवेंजर्स",
    "ब्रूस बैनर",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("expected 5 scenes, found {0}")]
    SceneCount(usize),

    #[error("scene at position {position} has scene_id {scene_id}")]
    SceneOrder { position: usize, scene_id: u32 },

    #[error("scene {scene_id} has {count} dialogues, expected 2-4")]
    DialogueCount { scene_id: u32, count: usize },

    #[error("scene {scene_id} has emotion {found}, expected {expected}")]
    WrongEmotion {
        scene_id: u32,
        expected: Emotion,
        found: Emotion,
    },

    #[error("scene {scene_id} line {line}: {character} may not speak in this scene")]
    CharacterNotAllowed {
        scene_id: u32,
        line: usize,
        character: Character,
    },

    #[error("scene {scene_id} mixes speakers; it must be only baap or only gav_wale")]
    MixedFinalSpeakers { scene_id: u32 },

    #[error("scene {scene_id} line {line}: text is empty")]
    EmptyText { scene_id: u32, line: usize },

    #[error("scene {scene_id} line {line}: contains Latin text {word:?}")]
    LatinText {
        scene_id: u32,
        line: usize,
        word: String,
    },

    #[error("scene {scene_id} line {line}: mentions banned reference {term:?}")]
    BannedReference {
        scene_id: u32,
        line: usize,
        term: &'static str,
    },
}

/// Check a script against every authoring rule and return all violations.
pub fn validate(script: &Script) -> Vec<Violation> {
    let mut violations = Vec::new();

    if script.scenes.len() != SCENE_COUNT {
        violations.push(Violation::SceneCount(script.scenes.len()));
    }

    for (position, scene) in script.scenes.iter().enumerate() {
        let scene_id = scene.scene_id;

        if usize::try_from(scene_id).ok() != Some(position + 1) {
            violations.push(Violation::SceneOrder {
                position: position + 1,
                scene_id,
            });
        }

        let count = scene.dialogues.len();
        if !(MIN_DIALOGUES..=MAX_DIALOGUES).contains(&count) {
            violations.push(Violation::DialogueCount { scene_id, count });
        }

        if let Some(expected) = Emotion::for_scene(scene_id) {
            if scene.emotion != expected {
                violations.push(Violation::WrongEmotion {
                    scene_id,
                    expected,
                    found: scene.emotion,
                });
            }
        }

        let allowed = Character::allowed_in_scene(scene_id);
        for (idx, dialogue) in scene.dialogues.iter().enumerate() {
            let line = idx + 1;

            if !allowed.contains(&dialogue.character) {
                violations.push(Violation::CharacterNotAllowed {
                    scene_id,
                    line,
                    character: dialogue.character,
                });
            }

            if dialogue.text.trim().is_empty() {
                violations.push(Violation::EmptyText { scene_id, line });
                continue;
            }

            if let Some(word) = first_latin_word(&dialogue.text) {
                violations.push(Violation::LatinText {
                    scene_id,
                    line,
                    word,
                });
            }

            if let Some(term) = banned_reference(&dialogue.text) {
                violations.push(Violation::BannedReference {
                    scene_id,
                    line,
                    term,
                });
            }
        }

        if scene_id == 5 {
            let mut speakers = scene.dialogues.iter().map(|d| d.character);
            if let Some(first) = speakers.next() {
                if speakers.any(|c| c != first) {
                    violations.push(Violation::MixedFinalSpeakers { scene_id });
                }
            }
        }
    }

    violations
}

fn is_latin_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || (c.is_alphabetic() && ('\u{00C0}'..='\u{024F}').contains(&c))
}

/// First run of Latin letters in `text`, used as a proxy for English words.
fn first_latin_word(text: &str) -> Option<String> {
    let start = text.find(is_latin_letter)?;
    let word: String = text[start..]
        .chars()
        .take_while(|c| is_latin_letter(*c))
        .collect();
    Some(word)
}

fn banned_reference(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    BANNED_REFERENCES
        .iter()
        .copied()
        .find(|term| lowered.contains(term))
}
