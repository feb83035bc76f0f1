use super::{Character, Emotion, Location, MAX_DIALOGUES, MIN_DIALOGUES, SCENE_COUNT};

/// What happens in each scene, in order.
const SCENE_BEATS: [&str; SCENE_COUNT] = [
    "The villagers publicly insult the family at the village square and the father tries to defend his son.",
    "At home the mother and sister console each other in tears.",
    "The friend tries to calm the hero while the villagers keep taunting him.",
    "The hero explodes in rage and transforms into a towering green-skinned giant.",
    "Everyone freezes in shock. Only one voice is heard: either the father or the villagers.",
];

/// 生成剧本的提示词
///
/// The cast, emotion and location lists are rendered from the same tables
/// that [`super::validate`] checks against.
pub fn build_script_prompt() -> String {
    let mut scenes = String::new();
    for (idx, beat) in SCENE_BEATS.iter().enumerate() {
        let scene_id = idx as u32 + 1;
        let emotion = Emotion::SEQUENCE[idx];
        let cast = Character::allowed_in_scene(scene_id);
        let speakers = if scene_id == 5 {
            format!("only {} (a single speaker for the whole scene)", join_or(cast))
        } else if cast.len() == Character::ALL.len() {
            "any character, mainly hero".to_string()
        } else {
            format!("only {}", join_or(cast))
        };

        scenes.push_str(&format!(
            "Scene {scene_id}: emotion \"{emotion}\". {beat} Speakers: {speakers}.\n"
        ));
    }

    let characters = Character::ALL
        .iter()
        .map(|c| format!("- {}: {}", c.as_str(), c.role()))
        .collect::<Vec<_>>()
        .join("\n");

    let locations = Location::ALL
        .iter()
        .map(|l| format!("\"{}\"", l.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Write a short emotional Hindi village drama for a vertical video reel.

The script has exactly {SCENE_COUNT} scenes, in this order:
{scenes}
Characters (use these exact keys):
{characters}

Rules:
1. Each scene has between {MIN_DIALOGUES} and {MAX_DIALOGUES} dialogues.
2. Every dialogue "text" is short, natural spoken Hindi written in Devanagari script.
3. Do not use any English words or Latin letters in dialogue text.
4. Each scene's "location" is one of: {locations}.
5. Each scene's "emotion" is exactly the one given above for that scene.
6. Do not mention any copyrighted character, film, comic or franchise by name.

Return a JSON object with this exact shape:
{{
  "scenes": [
    {{
      "scene_id": 1,
      "emotion": "conflict",
      "location": "village_chowk",
      "dialogues": [
        {{"character": "baap", "text": "..."}}
      ]
    }}
  ]
}}

Return only the JSON object, with no explanation and no markdown."#
    )
}

fn join_or(cast: &[Character]) -> String {
    cast.iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(" or ")
}
