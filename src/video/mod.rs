mod composer;
mod prompt;
mod scenes;

pub use composer::Composer;
pub use prompt::build_video_prompt;
pub use scenes::{generate_scene_videos, load_video_paths, REQUEST_DELAY};

use std::path::Path;

/// Scene id encoded in `scene_<id>.mp4` or `scene_<id>_placeholder.mp4`.
pub(crate) fn scene_id_from_path(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let rest = stem.strip_prefix("scene_")?;
    let digits = rest.split('_').next()?;
    digits.parse().ok()
}

/// Placeholders are written as empty files, so they count as missing.
pub(crate) async fn is_nonempty_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_scene_id_from_file_name() {
        assert_eq!(scene_id_from_path(Path::new("videos/scene_3.mp4")), Some(3));
        assert_eq!(
            scene_id_from_path(Path::new("videos/scene_2_placeholder.mp4")),
            Some(2)
        );
        assert_eq!(scene_id_from_path(Path::new("videos/intro.mp4")), None);
        assert_eq!(scene_id_from_path(Path::new("videos/scene_x.mp4")), None);
    }
}
