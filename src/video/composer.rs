use super::{is_nonempty_file, scene_id_from_path};
use crate::config::OutputLayout;
use crate::error::{ReelError, Result};
use crate::tts::{AudioClip, SceneAudio};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, warn};

/// Used when ffprobe cannot report a duration.
pub const FALLBACK_DURATION_SECS: f64 = 5.0;
/// First line of each scene starts this far in.
pub const LEAD_IN_SECS: f64 = 0.2;
/// Silence between consecutive lines.
pub const DIALOGUE_GAP_SECS: f64 = 0.3;
/// Final reel length we aim for, in seconds.
pub const TARGET_DURATION_SECS: std::ops::RangeInclusive<f64> = 30.0..=45.0;

const REEL_SCALE_FILTER: &str =
    "scale=1080:1920:force_original_aspect_ratio=decrease,pad=1080:1920:(ow-iw)/2:(oh-ih)/2,setsar=1";

/// 媒体时长（秒），读取失败时返回默认值
pub async fn media_duration(path: &Path) -> f64 {
    let output = Command::new("ffprobe")
        .args([
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-show_entries"),
            OsStr::new("format=duration"),
            OsStr::new("-of"),
            OsStr::new("default=noprint_wrappers=1:nokey=1"),
            path.as_os_str(),
        ])
        .output()
        .await;

    output
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8_lossy(&o.stdout).trim().parse::<f64>().ok())
        .unwrap_or(FALLBACK_DURATION_SECS)
}

/// Start offsets in milliseconds for clips of the given durations.
pub fn dialogue_offsets(durations: &[f64]) -> Vec<u64> {
    let mut current = LEAD_IN_SECS;
    durations
        .iter()
        .map(|duration| {
            let offset = (current * 1000.0).round() as u64;
            current += duration + DIALOGUE_GAP_SECS;
            offset
        })
        .collect()
}

/// Build the `-filter_complex` graph that delays input `i + 1` by
/// `offsets_ms[i]` and mixes everything into `[aout]`.
pub fn audio_mix_filter(offsets_ms: &[u64]) -> String {
    let mut parts: Vec<String> = offsets_ms
        .iter()
        .enumerate()
        .map(|(idx, ms)| format!("[{}:a]adelay={ms}|{ms}[a{}]", idx + 1, idx))
        .collect();

    let labels: String = (0..offsets_ms.len()).map(|i| format!("[a{i}]")).collect();
    parts.push(format!(
        "{labels}amix=inputs={}:duration=longest[aout]",
        offsets_ms.len()
    ));
    parts.join(";")
}

/// Contents of an ffmpeg concat demuxer list.
pub fn concat_list(videos: &[PathBuf]) -> Result<String> {
    let mut content = String::new();
    for video in videos {
        let absolute = std::path::absolute(video)?;
        content.push_str(&format!("file '{}'\n", absolute.display()));
    }
    Ok(content)
}

async fn run_ffmpeg<I, S>(args: I, what: &str) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new("ffmpeg")
        .args(args)
        .output()
        .await
        .map_err(|e| ReelError::Ffmpeg(format!("Failed to run FFmpeg: {}", e)))?;

    if !output.status.success() {
        let error = String::from_utf8_lossy(&output.stderr);
        return Err(ReelError::Ffmpeg(format!("FFmpeg {} failed: {}", what, error)));
    }
    Ok(())
}

/// 场景合成与最终拼接
pub struct Composer {
    layout: OutputLayout,
}

impl Composer {
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }

    /// Overlay a scene's dialogue clips onto its video.
    ///
    /// Returns `None` when the scene video is missing or empty.
    pub async fn compose_scene(
        &self,
        scene_id: u32,
        video_path: &Path,
        clips: &[AudioClip],
    ) -> Result<Option<PathBuf>> {
        let output_path = self
            .layout
            .composed_dir()
            .join(format!("scene_{}_composed.mp4", scene_id));

        if !is_nonempty_file(video_path).await {
            warn!("Scene {} video not found: {}", scene_id, video_path.display());
            return Ok(None);
        }

        let mut audio_paths = Vec::new();
        for clip in clips {
            if is_nonempty_file(&clip.path).await {
                audio_paths.push(clip.path.as_path());
            } else {
                warn!("Scene {} audio missing: {}", scene_id, clip.path.display());
            }
        }

        if audio_paths.is_empty() {
            return Ok(self.copy_silent(scene_id, video_path, output_path).await);
        }

        let mut durations = Vec::with_capacity(audio_paths.len());
        for path in &audio_paths {
            durations.push(media_duration(path).await);
        }
        let filter = audio_mix_filter(&dialogue_offsets(&durations));

        let mut args: Vec<&OsStr> = vec![OsStr::new("-y"), OsStr::new("-i"), video_path.as_os_str()];
        for path in &audio_paths {
            args.push(OsStr::new("-i"));
            args.push(path.as_os_str());
        }
        args.extend(
            [
                "-filter_complex",
                filter.as_str(),
                "-map",
                "0:v",
                "-map",
                "[aout]",
                "-c:v",
                "libx264",
                "-preset",
                "fast",
                "-c:a",
                "aac",
                "-b:a",
                "128k",
                "-shortest",
            ]
            .map(OsStr::new),
        );
        args.push(output_path.as_os_str());

        info!("Composing scene {} with {} audio clips...", scene_id, audio_paths.len());
        if let Err(e) = run_ffmpeg(&args, "scene composition").await {
            warn!("Scene {}: {}; falling back to silent copy", scene_id, e);
            return Ok(self.copy_silent(scene_id, video_path, output_path).await);
        }

        Ok(Some(output_path))
    }

    /// Copy the video without audio. A failure drops the scene from the reel.
    async fn copy_silent(
        &self,
        scene_id: u32,
        video_path: &Path,
        output_path: PathBuf,
    ) -> Option<PathBuf> {
        let copied = run_ffmpeg(
            [
                OsStr::new("-y"),
                OsStr::new("-i"),
                video_path.as_os_str(),
                OsStr::new("-c:v"),
                OsStr::new("copy"),
                OsStr::new("-an"),
                output_path.as_os_str(),
            ],
            "silent copy",
        )
        .await;

        match copied {
            Ok(()) => Some(output_path),
            Err(e) => {
                warn!("Scene {} skipped: {}", scene_id, e);
                None
            }
        }
    }

    /// 合并所有场景为 9:16 竖屏成片
    pub async fn merge_scenes(&self, composed: &[PathBuf]) -> Result<PathBuf> {
        let mut valid = Vec::new();
        for video in composed {
            if is_nonempty_file(video).await {
                valid.push(video.clone());
            }
        }

        if valid.is_empty() {
            return Err(ReelError::Ffmpeg(
                "No valid composed videos to merge".to_string(),
            ));
        }

        tokio::fs::create_dir_all(self.layout.final_dir()).await?;
        let concat_file = self.layout.final_dir().join("concat_list.txt");
        tokio::fs::write(&concat_file, concat_list(&valid)?).await?;

        let output_path = self.layout.final_dir().join("final_reel.mp4");
        info!("Merging {} scenes into final reel...", valid.len());

        run_ffmpeg(
            [
                OsStr::new("-y"),
                OsStr::new("-f"),
                OsStr::new("concat"),
                OsStr::new("-safe"),
                OsStr::new("0"),
                OsStr::new("-i"),
                concat_file.as_os_str(),
                OsStr::new("-vf"),
                OsStr::new(REEL_SCALE_FILTER),
                OsStr::new("-c:v"),
                OsStr::new("libx264"),
                OsStr::new("-preset"),
                OsStr::new("medium"),
                OsStr::new("-crf"),
                OsStr::new("23"),
                OsStr::new("-c:a"),
                OsStr::new("aac"),
                OsStr::new("-b:a"),
                OsStr::new("128k"),
                OsStr::new("-movflags"),
                OsStr::new("+faststart"),
                output_path.as_os_str(),
            ],
            "merge",
        )
        .await?;

        let duration = media_duration(&output_path).await;
        info!("Final reel created: {}", output_path.display());
        info!("Duration: {:.1} seconds", duration);
        if !TARGET_DURATION_SECS.contains(&duration) {
            warn!(
                "Final reel is {:.1}s, outside the {}-{}s target",
                duration,
                TARGET_DURATION_SECS.start(),
                TARGET_DURATION_SECS.end()
            );
        }

        Ok(output_path)
    }

    /// Compose every scene, merge them, and record the final path.
    pub async fn compose_reel(
        &self,
        video_paths: &[PathBuf],
        audio: &[SceneAudio],
    ) -> Result<PathBuf> {
        tokio::fs::create_dir_all(self.layout.composed_dir()).await?;
        info!(
            "Found {} videos, {} audio scene sets",
            video_paths.len(),
            audio.len()
        );

        let mut composed = Vec::new();
        for (idx, video_path) in video_paths.iter().enumerate() {
            let scene_id = scene_id_from_path(video_path).unwrap_or(idx as u32 + 1);
            let clips = audio
                .iter()
                .find(|s| s.scene_id == scene_id)
                .map(|s| s.audio_files.as_slice())
                .unwrap_or_default();

            info!("Scene {}: {} audio files", scene_id, clips.len());
            if let Some(path) = self.compose_scene(scene_id, video_path, clips).await? {
                composed.push(path);
            }
        }

        let final_reel = self.merge_scenes(&composed).await?;
        tokio::fs::write(
            self.layout.final_path_file(),
            final_reel.to_string_lossy().as_bytes(),
        )
        .await?;

        // 清理临时文件
        tokio::fs::remove_file(self.layout.final_dir().join("concat_list.txt"))
            .await
            .ok();

        Ok(final_reel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_include_lead_in_and_gaps() {
        assert_eq!(dialogue_offsets(&[1.5, 2.0, 1.0]), vec![200, 2000, 4300]);
        assert!(dialogue_offsets(&[]).is_empty());
    }

    #[test]
    fn mix_filter_delays_each_input() {
        let filter = audio_mix_filter(&[200, 2000]);
        assert_eq!(
            filter,
            "[1:a]adelay=200|200[a0];[2:a]adelay=2000|2000[a1];[a0][a1]amix=inputs=2:duration=longest[aout]"
        );
    }

    #[test]
    fn concat_list_uses_absolute_paths() {
        let list = concat_list(&[PathBuf::from("composed/scene_1_composed.mp4")]).unwrap();
        let line = list.lines().next().unwrap();
        assert!(line.starts_with("file '/"));
        assert!(line.ends_with("composed/scene_1_composed.mp4'"));
    }

    #[tokio::test]
    async fn duration_falls_back_for_unreadable_media() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.mp3");
        assert_eq!(media_duration(&missing).await, FALLBACK_DURATION_SECS);
    }

    #[tokio::test]
    async fn skips_missing_or_placeholder_video() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let composer = Composer::new(layout.clone());

        let placeholder = dir.path().join("scene_1_placeholder.mp4");
        std::fs::write(&placeholder, b"").unwrap();

        assert_eq!(composer.compose_scene(1, &placeholder, &[]).await.unwrap(), None);
        let missing = dir.path().join("nope.mp4");
        assert_eq!(composer.compose_scene(2, &missing, &[]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreadable_video_is_dropped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        tokio::fs::create_dir_all(layout.composed_dir()).await.unwrap();
        let composer = Composer::new(layout);

        let broken = dir.path().join("scene_3.mp4");
        std::fs::write(&broken, b"not a video").unwrap();

        assert_eq!(composer.compose_scene(3, &broken, &[]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn merge_without_videos_fails() {
        let dir = tempfile::tempdir().unwrap();
        let composer = Composer::new(OutputLayout::new(dir.path()));

        let err = composer
            .compose_reel(&[dir.path().join("scene_1_placeholder.mp4")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ReelError::Ffmpeg(msg) if msg.contains("No valid composed videos")));
    }
}
