use crate::config::OutputLayout;
use crate::error::{ReelError, Result};
use crate::script::{Character, Script};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, warn};

pub const DEFAULT_EDGE_TTS_BIN: &str = "edge-tts";

const FEMALE_VOICE: &str = "hi-IN-SwaraNeural";
const MALE_VOICE: &str = "hi-IN-MadhurNeural";

/// Edge TTS 音色与语速/音调
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceProfile {
    pub voice: &'static str,
    pub rate: &'static str,
    pub pitch: &'static str,
}

impl VoiceProfile {
    pub fn for_character(character: Character) -> Self {
        let (voice, rate, pitch) = match character {
            Character::Maa => (FEMALE_VOICE, "-5%", "+5Hz"),
            Character::Behen => (FEMALE_VOICE, "+0%", "+10Hz"),
            Character::Baap => (MALE_VOICE, "-10%", "-10Hz"),
            // slow and deep for the rage scene
            Character::Hero => (MALE_VOICE, "-15%", "-20Hz"),
            Character::Dost => (MALE_VOICE, "+5%", "+0Hz"),
            Character::GavWale => (MALE_VOICE, "+0%", "+0Hz"),
        };
        Self { voice, rate, pitch }
    }
}

/// 单句台词的音频
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    pub path: PathBuf,
    pub character: Character,
    pub text: String,
    pub scene_id: u32,
    pub order: usize,
}

/// 一个场景的全部音频
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneAudio {
    pub scene_id: u32,
    pub audio_files: Vec<AudioClip>,
}

/// Hindi speech through the `edge-tts` command-line tool.
#[derive(Debug, Clone)]
pub struct EdgeTts {
    bin: String,
}

impl Default for EdgeTts {
    fn default() -> Self {
        Self::new(DEFAULT_EDGE_TTS_BIN)
    }
}

impl EdgeTts {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Arguments for one synthesis call. Rate, pitch and text use the
    /// `--flag=value` form because values starting with `-` would otherwise
    /// parse as flags.
    pub fn command_args(text: &str, profile: VoiceProfile, output_path: &Path) -> Vec<String> {
        vec![
            "--voice".to_string(),
            profile.voice.to_string(),
            format!("--rate={}", profile.rate),
            format!("--pitch={}", profile.pitch),
            format!("--text={}", text),
            "--write-media".to_string(),
            output_path.to_string_lossy().into_owned(),
        ]
    }

    /// 生成语音
    pub async fn synthesize(
        &self,
        text: &str,
        character: Character,
        output_path: &Path,
    ) -> Result<()> {
        let profile = VoiceProfile::for_character(character);
        info!(
            "Generating: {} -> {} (rate={}, pitch={})",
            character, profile.voice, profile.rate, profile.pitch
        );

        let result = Command::new(&self.bin)
            .args(Self::command_args(text, profile, output_path))
            .output()
            .await
            .map_err(|e| ReelError::Tts(format!("Failed to run {}: {}", self.bin, e)))
            .and_then(|output| {
                if output.status.success() {
                    Ok(())
                } else {
                    let error = String::from_utf8_lossy(&output.stderr);
                    Err(ReelError::Tts(format!("{} failed: {}", self.bin, error)))
                }
            });

        // 失败时删除不完整的音频，避免下次续传时被复用
        if result.is_err() {
            tokio::fs::remove_file(output_path).await.ok();
        }
        result
    }

    /// 为剧本中的每句台词生成音频（支持断点续传）
    ///
    /// Failed lines are logged and left out; every scene still gets an entry.
    pub async fn process_script(
        &self,
        script: &Script,
        layout: &OutputLayout,
    ) -> Result<Vec<SceneAudio>> {
        tokio::fs::create_dir_all(layout.audio_dir()).await?;
        let mut all_audio = Vec::with_capacity(script.scenes.len());

        for scene in &script.scenes {
            info!("Scene {}: {} dialogues", scene.scene_id, scene.dialogues.len());
            let mut audio_files = Vec::new();

            for (idx, dialogue) in scene.dialogues.iter().enumerate() {
                let text = dialogue.text.trim();
                if text.is_empty() {
                    continue;
                }

                let order = idx + 1;
                let output_path = layout.audio_dir().join(format!(
                    "scene{}_{}_{}.mp3",
                    scene.scene_id, dialogue.character, order
                ));

                let exists = tokio::fs::metadata(&output_path)
                    .await
                    .map(|m| m.len() > 0)
                    .unwrap_or(false);
                if exists {
                    info!("{} already exists, skipping...", output_path.display());
                } else if let Err(e) = self.synthesize(text, dialogue.character, &output_path).await
                {
                    warn!("Error generating audio for scene {} line {}: {}", scene.scene_id, order, e);
                    continue;
                }

                audio_files.push(AudioClip {
                    path: output_path,
                    character: dialogue.character,
                    text: text.to_string(),
                    scene_id: scene.scene_id,
                    order,
                });
            }

            all_audio.push(SceneAudio {
                scene_id: scene.scene_id,
                audio_files,
            });
        }

        let total: usize = all_audio.iter().map(|s| s.audio_files.len()).sum();
        info!(
            "Generated {} audio files across {} scenes",
            total,
            all_audio.len()
        );

        write_audio_manifest(layout, &all_audio).await?;
        Ok(all_audio)
    }
}

pub async fn write_audio_manifest(layout: &OutputLayout, audio: &[SceneAudio]) -> Result<()> {
    let json = serde_json::to_string_pretty(audio)?;
    tokio::fs::write(layout.audio_manifest(), json).await?;
    info!("Saved audio data to {}", layout.audio_manifest().display());
    Ok(())
}

/// Missing manifest means no audio; the composer then copies videos silently.
pub async fn load_audio_manifest(layout: &OutputLayout) -> Result<Vec<SceneAudio>> {
    match tokio::fs::read_to_string(layout.audio_manifest()).await {
        Ok(raw) => Ok(serde_json::from_str(&raw)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}
