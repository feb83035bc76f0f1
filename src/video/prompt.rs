use crate::script::{Emotion, Location, Scene};

fn location_description(location: Location) -> &'static str {
    match location {
        Location::VillageChowk => "village central square with old banyan tree",
        Location::GharAangan => "rustic home courtyard with mud walls",
        Location::Khet => "golden wheat fields at sunset",
        Location::HandpumpArea => "village handpump with women gathering water",
        Location::PanchayatGround => "open ground with elders sitting",
    }
}

fn emotion_visuals(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Conflict => "tense confrontation, angry gestures",
        Emotion::Sadness => "tearful, emotional embrace",
        Emotion::AngerBuilding => "clenched fists, visible frustration",
        Emotion::Rage => "explosive anger, dramatic transformation, muscles bulging",
        Emotion::Shock => "stunned expressions, stepping back in fear",
    }
}

/// 根据场景生成文生视频提示词
///
/// The giant is described generically; no franchise names appear.
pub fn build_video_prompt(scene: &Scene) -> String {
    format!(
        "Rural Indian village scene.\n\
         {}.\n\
         Mud houses, handpump, dusty paths, neem trees in background.\n\
         A tall green-skinned muscular man with rippling muscles and torn farmer clothing.\n\
         {}.\n\
         Cinematic camera angle, dramatic lighting.\n\
         No text, no watermark, no subtitles.\n\
         Duration: 5-6 seconds.",
        location_description(scene.location),
        emotion_visuals(scene.emotion),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::BANNED_REFERENCES;

    fn scene(emotion: Emotion, location: Location) -> Scene {
        Scene {
            scene_id: 4,
            emotion,
            location,
            dialogues: Vec::new(),
        }
    }

    #[test]
    fn describes_location_and_emotion() {
        let prompt = build_video_prompt(&scene(Emotion::Rage, Location::Khet));
        assert!(prompt.starts_with("Rural Indian village scene.\n"));
        assert!(prompt.contains("golden wheat fields at sunset."));
        assert!(prompt.contains("muscles bulging."));
        assert!(prompt.ends_with("Duration: 5-6 seconds."));
    }

    #[test]
    fn never_names_a_franchise() {
        for location in Location::ALL {
            for emotion in Emotion::SEQUENCE {
                let prompt = build_video_prompt(&scene(emotion, location)).to_lowercase();
                for term in BANNED_REFERENCES {
                    assert!(!prompt.contains(term), "{term} in {prompt}");
                }
            }
        }
    }
}
