use crate::error::{ReelError, Result};
use std::path::PathBuf;

/// 输出目录结构
///
/// Every stage reads the previous stage's manifest from here, so stages can
/// be re-run one at a time.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.root.join("videos")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio")
    }

    pub fn composed_dir(&self) -> PathBuf {
        self.root.join("composed")
    }

    pub fn final_dir(&self) -> PathBuf {
        self.root.join("final")
    }

    pub fn script_path(&self) -> PathBuf {
        self.root.join("script.json")
    }

    pub fn video_manifest(&self) -> PathBuf {
        self.root.join("video_paths.json")
    }

    pub fn audio_manifest(&self) -> PathBuf {
        self.root.join("audio_paths.json")
    }

    pub fn final_path_file(&self) -> PathBuf {
        self.root.join("final_reel_path.txt")
    }

    pub async fn create_dirs(&self) -> Result<()> {
        for dir in [
            self.videos_dir(),
            self.audio_dir(),
            self.composed_dir(),
            self.final_dir(),
        ] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }
}

/// Read a required key from a flag value or the environment.
pub fn require_key(flag: Option<String>, env_var: &str) -> Result<String> {
    flag.or_else(|| std::env::var(env_var).ok())
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            ReelError::Env(format!(
                "{} not found. Please set it via a flag or the {} environment variable",
                env_var, env_var
            ))
        })
}

/// Optional override from the environment, ignoring empty values.
pub fn env_override(env_var: &str) -> Option<String> {
    std::env::var(env_var).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn layout_matches_stage_handoff_files() {
        let layout = OutputLayout::new("outputs");
        assert_eq!(layout.videos_dir(), Path::new("outputs/videos"));
        assert_eq!(layout.script_path(), Path::new("outputs/script.json"));
        assert_eq!(layout.audio_manifest(), Path::new("outputs/audio_paths.json"));
        assert_eq!(
            layout.final_path_file(),
            Path::new("outputs/final_reel_path.txt")
        );
    }

    #[tokio::test]
    async fn creates_stage_directories() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path().join("out"));
        layout.create_dirs().await.unwrap();

        assert!(layout.videos_dir().is_dir());
        assert!(layout.audio_dir().is_dir());
        assert!(layout.composed_dir().is_dir());
        assert!(layout.final_dir().is_dir());
    }

    #[test]
    fn flag_wins_over_environment() {
        let key = require_key(Some("from-flag".to_string()), "AUTO_REEL_TEST_UNSET_KEY").unwrap();
        assert_eq!(key, "from-flag");
    }

    #[test]
    fn missing_key_is_env_error() {
        let err = require_key(None, "AUTO_REEL_TEST_UNSET_KEY").unwrap_err();
        assert!(matches!(err, ReelError::Env(msg) if msg.contains("AUTO_REEL_TEST_UNSET_KEY")));
    }
}
