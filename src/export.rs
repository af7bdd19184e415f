//! Grayscale PNG import and export of frames.

use image::{GrayImage, Luma};
use ndarray::Array2;
use std::path::{Path, PathBuf};

use crate::Frame;
use crate::error::{FireVaeError, FireVaeResult};

/// Convert floating-point pixel values `[0.0–1.0]` into bytes `[0–255]`.
///
/// Values outside the unit range are clamped, so difference maps with
/// negative entries render as black.
pub fn build_gray_bytes(frame: &Frame) -> Vec<u8> {
    frame
        .iter()
        .map(|&val| (val * 255.0).clamp(0.0, 255.0) as u8)
        .collect()
}

/// Writes a frame as an 8-bit grayscale PNG.
pub fn save_frame_png(frame: &Frame, path: impl AsRef<Path>) -> FireVaeResult<()> {
    let (height, width) = frame.dim();
    let img = GrayImage::from_raw(width as u32, height as u32, build_gray_bytes(frame))
        .ok_or_else(|| FireVaeError::shape(format!("{height} x {width} buffer"), "short buffer"))?;
    img.save(path.as_ref())?;
    Ok(())
}

/// Reads any image file as grayscale, normalized to `[0.0, 1.0]`.
pub fn load_frame_png(path: impl AsRef<Path>) -> FireVaeResult<Frame> {
    let img = image::open(path.as_ref())?.to_luma8();
    let (width, height) = img.dimensions();
    let pixels: Vec<f32> = img.pixels().map(|Luma([p])| *p as f32 / 255.0).collect();
    Array2::from_shape_vec((height as usize, width as usize), pixels)
        .map_err(|e| FireVaeError::shape(format!("{height} x {width}"), e.to_string()))
}

/// Loads every `.png` in `dir`, sorted by file name.
///
/// # Errors
///
/// [`FireVaeError::EmptyInput`] if the directory holds no PNG files, and a
/// shape error if the frames do not all share one size.
pub fn load_frames_from_dir(dir: impl AsRef<Path>) -> FireVaeResult<Vec<Frame>> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(FireVaeError::EmptyInput(format!(
            "no PNG frames in {}",
            dir.display()
        )));
    }

    let frames = paths
        .iter()
        .map(|p| load_frame_png(p))
        .collect::<FireVaeResult<Vec<_>>>()?;
    let shape = frames[0].dim();
    if let Some(bad) = frames.iter().position(|f| f.dim() != shape) {
        return Err(FireVaeError::shape(
            format!("{:?}", shape),
            format!("{:?} in {}", frames[bad].dim(), paths[bad].display()),
        ));
    }

    log::info!("Loaded {} frames of {:?} from {}", frames.len(), shape, dir.display());
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn gray_bytes_clamp_and_scale() {
        let frame = array![[0.0f32, 1.0], [-0.5, 2.0]];
        assert_eq!(build_gray_bytes(&frame), vec![0, 255, 0, 255]);
    }

    #[test]
    fn binary_frames_survive_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        let frame = array![[0.0f32, 1.0, 1.0], [1.0, 0.0, 0.0]];

        save_frame_png(&frame, &path).unwrap();
        assert_eq!(load_frame_png(&path).unwrap(), frame);
    }

    #[test]
    fn directory_loading_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        save_frame_png(&array![[1.0f32, 1.0]], dir.path().join("b.png")).unwrap();
        save_frame_png(&array![[0.0f32, 0.0]], dir.path().join("a.png")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let frames = load_frames_from_dir(dir.path()).unwrap();
        assert_eq!(frames, vec![array![[0.0f32, 0.0]], array![[1.0f32, 1.0]]]);
    }

    #[test]
    fn mixed_sizes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        save_frame_png(&array![[1.0f32, 1.0]], dir.path().join("a.png")).unwrap();
        save_frame_png(&array![[1.0f32], [1.0]], dir.path().join("b.png")).unwrap();
        assert!(matches!(
            load_frames_from_dir(dir.path()),
            Err(FireVaeError::Shape { .. })
        ));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_frames_from_dir(dir.path()),
            Err(FireVaeError::EmptyInput(_))
        ));
    }
}
