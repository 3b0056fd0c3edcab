//! Output files: naming, PNG encoding, atomic writes and cleanup

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use image::RgbImage;
use log::{debug, info, warn};

use crate::{Error, Result};

/// Files [`clean_output_dir`] never deletes
pub const DEFAULT_KEEP: [&str; 5] = [".gitkeep", ".gitignore", "README.md", ".keep", "readme.txt"];

const INCHES_PER_METER: f64 = 39.3701;

/// `<dir>/<id><suffix>.png`, with characters unsafe in file names replaced.
pub fn output_path(dir: &Path, id: &str, suffix: &str) -> PathBuf {
    let stem: String = id
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = if stem.is_empty() || stem.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        stem
    };
    dir.join(format!("{}{}.png", stem, suffix))
}

/// Encode as 8-bit RGB PNG without compression, tagged with `dpi` in pHYs.
pub fn encode_png(image: &RgbImage, dpi: u32) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let ppm = (dpi as f64 * INCHES_PER_METER).round() as u32;
    {
        let mut encoder = png::Encoder::new(&mut buf, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::NoCompression);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit: png::Unit::Meter,
        }));
        let mut writer = encoder
            .write_header()
            .map_err(|e| Error::ExportError(format!("PNG header: {}", e)))?;
        writer
            .write_image_data(image.as_raw())
            .map_err(|e| Error::ExportError(format!("PNG data: {}", e)))?;
        writer
            .finish()
            .map_err(|e| Error::ExportError(format!("PNG finish: {}", e)))?;
    }
    Ok(buf)
}

/// Write `bytes` to a temporary sibling and rename it over `path`.
///
/// Returns the number of bytes written. On failure the temporary file is
/// removed and `path` is left untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<u64> {
    let name = path
        .file_name()
        .ok_or_else(|| Error::ExportError(format!("not a file path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", name.to_string_lossy()));

    let result = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(Error::ExportError(format!("failed to write {}: {}", path.display(), e)));
    }
    Ok(bytes.len() as u64)
}

pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        info!("Creating output directory {}", dir.display());
    }
    fs::create_dir_all(dir)
        .map_err(|e| Error::ExportError(format!("cannot create output directory {}: {}", dir.display(), e)))
}

/// What a cleanup would delete and keep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupPlan {
    pub delete: Vec<PathBuf>,
    pub kept: Vec<PathBuf>,
    /// Size of the regular files in `delete`
    pub bytes: u64,
}

#[derive(Debug, Default)]
pub struct CleanReport {
    pub deleted: usize,
    pub failed: Vec<(PathBuf, String)>,
    pub freed_bytes: u64,
    pub kept: usize,
}

pub fn plan_cleanup(dir: &Path, keep: &[&str]) -> Result<CleanupPlan> {
    let mut plan = CleanupPlan::default();
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        if keep.iter().any(|k| entry.file_name() == **k) {
            plan.kept.push(path);
            continue;
        }
        let meta = entry.metadata()?;
        if meta.is_file() {
            plan.bytes += meta.len();
        }
        plan.delete.push(path);
    }
    Ok(plan)
}

/// Delete everything in `dir` except names in `keep`.
///
/// Directories are removed recursively. Per-entry failures are collected
/// rather than aborting the sweep.
pub fn clean_output_dir(dir: &Path, keep: &[&str]) -> Result<CleanReport> {
    let plan = plan_cleanup(dir, keep)?;
    let mut report = CleanReport {
        kept: plan.kept.len(),
        ..CleanReport::default()
    };
    for path in plan.delete {
        let outcome = match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&path).map(|_| 0),
            Ok(meta) => fs::remove_file(&path).map(|_| meta.len()),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(bytes) => {
                debug!("Deleted {}", path.display());
                report.deleted += 1;
                report.freed_bytes += bytes;
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", path.display(), e);
                report.failed.push((path, e.to_string()));
            }
        }
    }
    Ok(report)
}

/// Bytes as MiB for progress logs
pub fn mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn output_name_uses_id_and_suffix() {
        let dir = Path::new("out");
        assert_eq!(output_path(dir, "1", "_card"), PathBuf::from("out/1_card.png"));
        assert_eq!(output_path(dir, "a/b:c", ""), PathBuf::from("out/a_b_c.png"));
        assert_eq!(output_path(dir, "..", "_card"), PathBuf::from("out/__card.png"));
    }

    #[test]
    fn png_is_rgb_and_carries_dpi() {
        let img = RgbImage::from_pixel(5, 3, image::Rgb([10, 20, 30]));
        let bytes = encode_png(&img, 300).unwrap();

        let decoder = png::Decoder::new(Cursor::new(bytes.clone()));
        let reader = decoder.read_info().unwrap();
        let info = reader.info();
        assert_eq!((info.width, info.height), (5, 3));
        assert_eq!(info.color_type, png::ColorType::Rgb);
        let dims = info.pixel_dims.unwrap();
        assert_eq!(dims.xppu, 11811);
        assert_eq!(dims.unit, png::Unit::Meter);

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn uncompressed_png_is_at_least_raw_size() {
        let img = RgbImage::new(64, 64);
        let bytes = encode_png(&img, 300).unwrap();
        assert!(bytes.len() >= 64 * 64 * 3);
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x_card.png");
        let n = write_atomic(&path, b"hello").unwrap();
        assert_eq!(n, 5);
        assert_eq!(fs::read(&path).unwrap(), b"hello");
        let names: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn failed_write_reports_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.png");
        let err = write_atomic(&path, b"data").unwrap_err();
        assert!(matches!(err, Error::ExportError(_)));
    }

    #[test]
    fn cleanup_respects_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitkeep"), b"").unwrap();
        fs::write(dir.path().join("README.md"), b"keep me").unwrap();
        fs::write(dir.path().join("1_card.png"), vec![0u8; 100]).unwrap();
        fs::create_dir(dir.path().join("old")).unwrap();
        fs::write(dir.path().join("old").join("2_card.png"), vec![0u8; 10]).unwrap();

        let plan = plan_cleanup(dir.path(), &DEFAULT_KEEP).unwrap();
        assert_eq!(plan.delete.len(), 2);
        assert_eq!(plan.bytes, 100);

        let report = clean_output_dir(dir.path(), &DEFAULT_KEEP).unwrap();
        assert_eq!(report.deleted, 2);
        assert!(report.failed.is_empty());
        assert_eq!(report.freed_bytes, 100);
        assert_eq!(report.kept, 2);
        assert!(dir.path().join(".gitkeep").exists());
        assert!(dir.path().join("README.md").exists());
        assert!(!dir.path().join("old").exists());
    }
}
