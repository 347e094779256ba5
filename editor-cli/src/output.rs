use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use editor_core::ColorLabel;
use image::{ImageFormat, RgbaImage};

/// Output file next to `input` (or in `dir`) named `{stem}{suffix}`.
pub fn sibling_path(input: &Path, dir: Option<&Path>, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let parent = dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    parent.join(format!("{stem}{suffix}"))
}

/// `{stem}_no_{label}.png`, e.g. `photo_no_white_very_light.png`.
pub fn removal_path(input: &Path, dir: Option<&Path>, label: ColorLabel) -> PathBuf {
    sibling_path(input, dir, &format!("_no_{}.png", label.slug()))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write through a temporary file and rename it into place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_path(path);
    fs::write(&tmp, bytes).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to move output into {}", path.display()))?;
    Ok(())
}

/// Save an RGBA raster as PNG through a temporary file.
pub fn save_png(path: &Path, image: &RgbaImage) -> Result<()> {
    let tmp = temp_path(path);
    image
        .save_with_format(&tmp, ImageFormat::Png)
        .with_context(|| format!("Failed to encode {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to move output into {}", path.display()))?;
    Ok(())
}
