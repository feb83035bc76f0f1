use super::{build_video_prompt, is_nonempty_file, scene_id_from_path};
use crate::api::HuggingFaceClient;
use crate::config::OutputLayout;
use crate::error::{ReelError, Result};
use crate::script::Script;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Pause between remote generation requests.
pub const REQUEST_DELAY: Duration = Duration::from_secs(2);

/// 为每个场景生成视频（支持断点续传）
///
/// A scene whose generation fails gets an empty placeholder file so the
/// manifest keeps one entry per scene; the composer skips empty videos.
pub async fn generate_scene_videos(
    client: Option<&HuggingFaceClient>,
    script: &Script,
    layout: &OutputLayout,
    request_delay: Duration,
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(layout.videos_dir()).await?;
    info!("Processing {} scenes...", script.scenes.len());

    let mut video_paths = Vec::with_capacity(script.scenes.len());
    let mut requested = false;

    for scene in &script.scenes {
        let video_path = layout.videos_dir().join(format!("scene_{}.mp4", scene.scene_id));

        if is_nonempty_file(&video_path).await {
            info!("Scene {} video already exists, skipping...", scene.scene_id);
            video_paths.push(video_path);
            continue;
        }

        if requested {
            tokio::time::sleep(request_delay).await;
        }

        let prompt = build_video_prompt(scene);
        info!("[Scene {}] Prompt:\n{}", scene.scene_id, prompt);

        let outcome = match client {
            Some(client) => {
                requested = true;
                client.generate_video(&prompt, &video_path).await
            }
            None => Err(ReelError::Env(
                "HF_TOKEN not set, cannot generate video".to_string(),
            )),
        };

        match outcome {
            Ok(()) => video_paths.push(video_path),
            Err(e) => {
                warn!("[Scene {}] Video generation failed: {}", scene.scene_id, e);
                let placeholder = layout
                    .videos_dir()
                    .join(format!("scene_{}_placeholder.mp4", scene.scene_id));
                tokio::fs::write(&placeholder, b"").await?;
                video_paths.push(placeholder);
            }
        }
    }

    write_video_manifest(layout, &video_paths).await?;
    Ok(video_paths)
}

pub async fn write_video_manifest(layout: &OutputLayout, video_paths: &[PathBuf]) -> Result<()> {
    let json = serde_json::to_string_pretty(video_paths)?;
    tokio::fs::write(layout.video_manifest(), json).await?;
    info!("Saved video paths to {}", layout.video_manifest().display());
    Ok(())
}

/// Load the video manifest, or fall back to `scene_<id>.mp4` files on disk.
///
/// Placeholders are left out of the fallback listing; the composer takes
/// scene ids from the file names, so gaps do not shift later scenes.
pub async fn load_video_paths(layout: &OutputLayout) -> Result<Vec<PathBuf>> {
    if let Ok(raw) = tokio::fs::read_to_string(layout.video_manifest()).await {
        return Ok(serde_json::from_str(&raw)?);
    }

    let mut scenes = Vec::new();
    let mut entries = match tokio::fs::read_dir(layout.videos_dir()).await {
        Ok(entries) => entries,
        Err(_) => return Ok(Vec::new()),
    };
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_video = path.extension().is_some_and(|ext| ext == "mp4");
        let is_placeholder = path
            .file_stem()
            .is_some_and(|stem| stem.to_string_lossy().ends_with("_placeholder"));
        if !is_video || is_placeholder {
            continue;
        }
        if let Some(scene_id) = scene_id_from_path(&path) {
            scenes.push((scene_id, path));
        }
    }
    scenes.sort();
    Ok(scenes.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::tests::VALID_SCRIPT;

    #[tokio::test]
    async fn writes_placeholders_without_client() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let script = Script::from_json(VALID_SCRIPT).unwrap();

        let paths = generate_scene_videos(None, &script, &layout, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(paths.len(), 5);
        assert!(paths[0].ends_with("videos/scene_1_placeholder.mp4"));
        assert_eq!(load_video_paths(&layout).await.unwrap(), paths);
    }

    #[tokio::test]
    async fn reuses_existing_videos_and_fetches_the_rest() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/t2v")
            .with_status(200)
            .with_body(b"mp4")
            .expect(4)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        tokio::fs::create_dir_all(layout.videos_dir()).await.unwrap();
        std::fs::write(layout.videos_dir().join("scene_2.mp4"), b"cached").unwrap();

        let client = HuggingFaceClient::new("hf".to_string())
            .unwrap()
            .with_model_url(format!("{}/t2v", server.url()));
        let script = Script::from_json(VALID_SCRIPT).unwrap();

        let paths = generate_scene_videos(Some(&client), &script, &layout, Duration::ZERO)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(std::fs::read(&paths[1]).unwrap(), b"cached");
        assert_eq!(std::fs::read(&paths[4]).unwrap(), b"mp4");
    }

    #[tokio::test]
    async fn directory_fallback_skips_placeholders_and_orders_by_scene() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        tokio::fs::create_dir_all(layout.videos_dir()).await.unwrap();
        for name in [
            "scene_2.mp4",
            "scene_1.mp4",
            "scene_3_placeholder.mp4",
            "scene_10.mp4",
            "notes.txt",
        ] {
            std::fs::write(layout.videos_dir().join(name), b"x").unwrap();
        }

        let paths = load_video_paths(&layout).await.unwrap();
        assert_eq!(
            paths,
            vec![
                layout.videos_dir().join("scene_1.mp4"),
                layout.videos_dir().join("scene_2.mp4"),
                layout.videos_dir().join("scene_10.mp4"),
            ]
        );
    }
}
