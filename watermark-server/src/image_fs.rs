//! Image storage layout.
//!
//! Two sibling roots hold images before and after watermarking; both copies
//! of an image share the same generated file name. Path computation is pure.
//! Directory creation and file I/O happen in the functions that need them.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

/// Extension of every stored image.
pub const IMAGE_EXTENSION: &str = "jpg";

/// Unique, time-ordered file name for one fetched image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageName(String);

impl ImageName {
    /// Generate a fresh name from a UUIDv7.
    ///
    /// Names sort by creation time at millisecond resolution.
    pub fn generate() -> Self {
        Self(format!("{}.{}", Uuid::now_v7().simple(), IMAGE_EXTENSION))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for ImageName {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// Resolves where an image lives before and after watermarking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePaths {
    incoming_root: PathBuf,
    output_root: PathBuf,
    watermark_path: PathBuf,
}

impl ImagePaths {
    pub fn new(
        incoming_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        watermark_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            incoming_root: incoming_root.into(),
            output_root: output_root.into(),
            watermark_path: watermark_path.into(),
        }
    }

    /// Resolve relative entries against `working_root`.
    pub fn rooted_at(
        working_root: &Path,
        incoming_root: &Path,
        output_root: &Path,
        watermark_path: &Path,
    ) -> Self {
        Self::new(
            working_root.join(incoming_root),
            working_root.join(output_root),
            working_root.join(watermark_path),
        )
    }

    pub fn incoming_root(&self) -> &Path {
        &self.incoming_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn original_path(&self, name: &ImageName) -> PathBuf {
        self.incoming_root.join(name)
    }

    pub fn output_path(&self, name: &ImageName) -> PathBuf {
        self.output_root.join(name)
    }

    pub fn watermark_path(&self) -> &Path {
        &self.watermark_path
    }

    /// Create both roots if missing.
    pub async fn ensure_directories(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.incoming_root).await?;
        tokio::fs::create_dir_all(&self.output_root).await?;
        Ok(())
    }
}

// =============================================================================
// Output Management
// =============================================================================

/// File names under the output root, most recent first.
pub async fn list_output_images(output_root: &Path) -> io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(output_root).await?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }

    names.sort_unstable_by(|a, b| b.cmp(a));
    Ok(names)
}

/// Result of removing both copies of an image.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted_from_images: bool,
    pub deleted_from_images_output: bool,
    pub errors: Vec<String>,
}

impl DeleteOutcome {
    /// Neither copy was present.
    pub fn not_found(&self) -> bool {
        !self.deleted_from_images && !self.deleted_from_images_output && self.errors.is_empty()
    }
}

/// Returned when a requested name is not a bare file name.
#[derive(Debug, thiserror::Error)]
#[error("invalid filename: {0}")]
pub struct InvalidFilename(pub String);

/// Accept only a single, normal path component.
pub fn validate_filename(filename: &str) -> Result<&str, InvalidFilename> {
    let path = Path::new(filename);
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) if name == filename && name != "." && name != ".." => Ok(name),
        _ => Err(InvalidFilename(filename.to_string())),
    }
}

/// Delete `filename` from both roots, continuing past individual failures.
pub async fn delete_image(
    paths: &ImagePaths,
    filename: &str,
) -> Result<DeleteOutcome, InvalidFilename> {
    let name = validate_filename(filename)?;
    let mut outcome = DeleteOutcome::default();

    outcome.deleted_from_images =
        remove_if_present(&paths.incoming_root.join(name), "images", &mut outcome.errors).await;
    outcome.deleted_from_images_output =
        remove_if_present(&paths.output_root.join(name), "images-output", &mut outcome.errors)
            .await;

    info!(
        filename = %name,
        deleted_from_images = outcome.deleted_from_images,
        deleted_from_images_output = outcome.deleted_from_images_output,
        error_count = outcome.errors.len(),
        "image_delete_complete"
    );

    Ok(outcome)
}

async fn remove_if_present(path: &Path, label: &str, errors: &mut Vec<String>) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "image_delete_failed");
            errors.push(format!("Failed to delete from {}: {}", label, e));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn paths_in(dir: &Path) -> ImagePaths {
        ImagePaths::new(dir.join("images"), dir.join("images-output"), dir.join("mark.png"))
    }

    #[test]
    fn test_image_name_format() {
        let name = ImageName::generate();
        let (stem, ext) = name.as_str().split_once('.').unwrap();
        assert_eq!(ext, "jpg");
        assert_eq!(stem.len(), 32);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_image_names_unique() {
        let names: Vec<ImageName> = (0..1024).map(|_| ImageName::generate()).collect();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_path_derivation_is_pure() {
        let paths = ImagePaths::new("/srv/images", "/srv/images-output", "/srv/mark.png");
        let name = ImageName::generate();

        assert_eq!(paths.original_path(&name), paths.original_path(&name));
        assert_eq!(paths.output_path(&name), paths.output_path(&name));
        assert_eq!(
            paths.original_path(&name),
            Path::new("/srv/images").join(name.as_str())
        );
        assert_eq!(
            paths.output_path(&name),
            Path::new("/srv/images-output").join(name.as_str())
        );
        assert_ne!(paths.original_path(&name), paths.output_path(&name));
        assert_eq!(paths.watermark_path(), Path::new("/srv/mark.png"));
    }

    #[test]
    fn test_rooted_at_keeps_absolute_entries() {
        let paths = ImagePaths::rooted_at(
            Path::new("/work"),
            Path::new("images"),
            Path::new("/data/out"),
            Path::new("assets/mark.png"),
        );
        assert_eq!(paths.incoming_root(), Path::new("/work/images"));
        assert_eq!(paths.output_root(), Path::new("/data/out"));
        assert_eq!(paths.watermark_path(), Path::new("/work/assets/mark.png"));
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("abc.jpg").is_ok());
        assert!(validate_filename("../abc.jpg").is_err());
        assert!(validate_filename("a/b.jpg").is_err());
        assert!(validate_filename("..").is_err());
        assert!(validate_filename(".").is_err());
        assert!(validate_filename("").is_err());
    }

    #[tokio::test]
    async fn test_list_output_images_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        paths.ensure_directories().await.unwrap();

        let first = ImageName::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = ImageName::generate();
        tokio::fs::write(paths.output_path(&first), b"a").await.unwrap();
        tokio::fs::write(paths.output_path(&second), b"b").await.unwrap();
        tokio::fs::create_dir(paths.output_root().join("nested")).await.unwrap();

        let listed = list_output_images(paths.output_root()).await.unwrap();
        assert_eq!(listed, vec![second.to_string(), first.to_string()]);
    }

    #[tokio::test]
    async fn test_delete_image_both_copies() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        paths.ensure_directories().await.unwrap();

        let name = ImageName::generate();
        tokio::fs::write(paths.original_path(&name), b"a").await.unwrap();
        tokio::fs::write(paths.output_path(&name), b"b").await.unwrap();

        let outcome = delete_image(&paths, name.as_str()).await.unwrap();
        assert!(outcome.deleted_from_images);
        assert!(outcome.deleted_from_images_output);
        assert!(outcome.errors.is_empty());
        assert!(!paths.original_path(&name).exists());
        assert!(!paths.output_path(&name).exists());
    }

    #[tokio::test]
    async fn test_delete_image_missing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        paths.ensure_directories().await.unwrap();

        let outcome = delete_image(&paths, "missing.jpg").await.unwrap();
        assert!(outcome.not_found());
    }

    #[tokio::test]
    async fn test_delete_image_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        assert!(delete_image(&paths, "../secret.jpg").await.is_err());
    }
}
