//! Photo source: an ordered, append-only list of photo handles.
//!
//! The app compares [`PhotoLibrary::revision`] each frame and hands the list
//! to the choreographer when it moves.

use std::path::Path;

use ornament_core::PhotoRef;

use crate::error::AppResult;

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

#[derive(Debug, Default)]
pub struct PhotoLibrary {
    photos:   Vec<PhotoRef>,
    revision: u64,
}

impl PhotoLibrary {
    pub fn new() -> Self { Self::default() }

    /// Every image file directly inside `dir`, ordered by file name.
    pub fn from_dir(dir: &Path) -> AppResult<Self> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        paths.sort();

        let mut lib = PhotoLibrary::new();
        for p in paths {
            lib.push(PhotoRef::new(p.to_string_lossy()));
        }
        log::info!("loaded {} photos from {}", lib.len(), dir.display());
        Ok(lib)
    }

    pub fn push(&mut self, photo: PhotoRef) {
        log::debug!("photo added: {}", photo);
        self.photos.push(photo);
        self.revision += 1;
    }

    pub fn photos(&self)   -> &[PhotoRef] { &self.photos }
    pub fn revision(&self) -> u64         { self.revision }
    pub fn len(&self)      -> usize       { self.photos.len() }
    pub fn is_empty(&self) -> bool        { self.photos.is_empty() }
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_bumps_revision() {
        let mut lib = PhotoLibrary::new();
        assert_eq!(lib.revision(), 0);
        lib.push(PhotoRef::new("a.png"));
        lib.push(PhotoRef::new("b.png"));
        assert_eq!(lib.revision(), 2);
        assert_eq!(lib.photos()[1].as_str(), "b.png");
    }

    #[test]
    fn image_extensions() {
        assert!(is_image(Path::new("x/IMG_0001.JPG")));
        assert!(is_image(Path::new("tree.webp")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_image(Path::new("README")));
    }

    #[test]
    fn from_dir_sorts_and_filters() {
        let dir = std::env::temp_dir().join(format!("gesture_tree_photos_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["b.png", "a.jpg", "skip.txt"] {
            std::fs::write(dir.join(name), b"").unwrap();
        }
        let lib = PhotoLibrary::from_dir(&dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(lib.len(), 2);
        assert!(lib.photos()[0].as_str().ends_with("a.jpg"));
        assert!(lib.photos()[1].as_str().ends_with("b.png"));
    }

    #[test]
    fn missing_dir_is_io_error() {
        let err = PhotoLibrary::from_dir(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, crate::error::AppError::Io(_)));
    }
}
