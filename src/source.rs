use image::RgbImage;
use log::{ debug, warn };

use std::fs;
use std::path::{ Path, PathBuf };

use crate::error::LprError;

const FRAME_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

pub enum FrameRead {
    Frame(RgbImage),
    /// nothing usable this time, try again on the next iteration
    Missed,
    Exhausted,
}

pub trait FrameSource {
    fn read(&mut self) -> FrameRead;
}

/// Frames from image files, in file name order.
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageSequence {

    /// `path` is either a single image or a directory of them.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LprError> {
        let path = path.as_ref();
        let paths = if path.is_dir() {
            let mut paths: Vec<PathBuf> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_frame_file(p))
                .collect();
            paths.sort();
            paths
        } else {
            // surface a missing path now rather than as a missed read
            fs::metadata(path)?;
            vec![path.to_path_buf()]
        };
        debug!("{} frames queued from {}", paths.len(), path.display());
        Ok(Self { paths, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.is_file() && path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequence {

    fn read(&mut self) -> FrameRead {
        let path = match self.paths.get(self.next) {
            Some(path) => path,
            None => return FrameRead::Exhausted,
        };
        self.next += 1;
        match image::open(path) {
            Ok(img) => FrameRead::Frame(img.to_rgb8()),
            Err(e) => {
                warn!("skipping frame {}: {}", path.display(), e);
                FrameRead::Missed
            }
        }
    }
}
