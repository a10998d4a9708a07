//! Rasterization and word recognition via external tools.
//!
//! A source file is rendered to `page-N.png` images with ImageMagick, then
//! tesseract writes a `page-N.tsv` next to each image.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use super::error::RasterizeError;
use super::page::PageSource;

/// Rendering and recognition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterizeConfig {
    pub magick_binary: String,
    pub tesseract_binary: String,
    /// Render density in DPI.
    pub density: u32,
    /// ImageMagick geometry each page is resized to.
    pub resize: String,
    /// Tesseract language code.
    pub language: String,
}

impl Default for RasterizeConfig {
    fn default() -> Self {
        Self {
            magick_binary: "magick".to_string(),
            tesseract_binary: "tesseract".to_string(),
            density: 600,
            resize: "2481x3508".to_string(),
            language: "eng".to_string(),
        }
    }
}

/// Turns an uploaded file into ordered page sources.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Render `source` into `workdir`. Returned pages are in reading order.
    async fn rasterize(&self, source: &Path, workdir: &Path)
        -> Result<Vec<PageSource>, RasterizeError>;
}

/// [`Rasterizer`] backed by the `magick` and `tesseract` command line tools.
#[derive(Debug, Clone, Default)]
pub struct CommandRasterizer {
    config: RasterizeConfig,
}

impl CommandRasterizer {
    pub fn new(config: RasterizeConfig) -> Self {
        Self { config }
    }

    /// Check that both tools can be found.
    pub fn is_available(&self) -> bool {
        which::which(&self.config.magick_binary).is_ok()
            && which::which(&self.config.tesseract_binary).is_ok()
    }

    async fn render(&self, source: &Path, workdir: &Path) -> Result<(), RasterizeError> {
        let mut command = Command::new(resolve(&self.config.magick_binary)?);
        command
            .arg("-density")
            .arg(self.config.density.to_string())
            .arg(source)
            .args(["-set", "colorspace", "RGB", "-alpha", "off", "-resize"])
            .arg(&self.config.resize)
            .arg(workdir.join("page-%d.png"));
        run(&self.config.magick_binary, command).await
    }

    async fn recognize(&self, image: &Path) -> Result<PathBuf, RasterizeError> {
        let stem = image.with_extension("");
        let mut command = Command::new(resolve(&self.config.tesseract_binary)?);
        command
            .arg(image)
            .arg(&stem)
            .args(["-l", &self.config.language, "tsv"]);
        run(&self.config.tesseract_binary, command).await?;
        Ok(image.with_extension("tsv"))
    }
}

#[async_trait]
impl Rasterizer for CommandRasterizer {
    async fn rasterize(
        &self,
        source: &Path,
        workdir: &Path,
    ) -> Result<Vec<PageSource>, RasterizeError> {
        self.render(source, workdir).await?;

        let images = rendered_images(workdir).await?;
        if images.is_empty() {
            return Err(RasterizeError::NoPages(source.display().to_string()));
        }
        debug!(source = %source.display(), pages = images.len(), "Rendered pages");

        let mut pages = Vec::with_capacity(images.len());
        for (position, (_, image)) in images.into_iter().enumerate() {
            let recognition = self.recognize(&image).await?;
            if !tokio::fs::try_exists(&recognition).await? {
                return Err(RasterizeError::MissingRecognition(position as u32 + 1));
            }
            pages.push(PageSource::files(image, recognition));
        }
        Ok(pages)
    }
}

fn resolve(binary: &str) -> Result<PathBuf, RasterizeError> {
    which::which(binary).map_err(|_| RasterizeError::BinaryNotFound(binary.to_string()))
}

async fn run(name: &str, mut command: Command) -> Result<(), RasterizeError> {
    let output = command.output().await?;
    if output.status.success() {
        Ok(())
    } else {
        Err(RasterizeError::CommandFailed {
            command: name.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// `page-N.png` files in `dir`, ordered by N.
pub async fn rendered_images(dir: &Path) -> Result<Vec<(u32, PathBuf)>, RasterizeError> {
    let mut images = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let index = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix("page-"))
            .and_then(|n| n.strip_suffix(".png"))
            .and_then(|n| n.parse::<u32>().ok());
        if let Some(index) = index {
            images.push((index, path));
        }
    }
    images.sort_by_key(|(index, _)| *index);
    Ok(images)
}

/// Pair already rendered `page-N.png` / `page-N.tsv` files in `dir`.
pub async fn collect_rendered_pages(dir: &Path) -> Result<Vec<PageSource>, RasterizeError> {
    let images = rendered_images(dir).await?;
    if images.is_empty() {
        return Err(RasterizeError::NoPages(dir.display().to_string()));
    }

    let mut pages = Vec::with_capacity(images.len());
    for (index, image) in images {
        let recognition = image.with_extension("tsv");
        if !tokio::fs::try_exists(&recognition).await? {
            return Err(RasterizeError::MissingRecognition(index));
        }
        pages.push(PageSource::files(image, recognition));
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_pages_sorted_numerically() {
        let dir = tempdir().unwrap();
        for n in [10, 2, 0, 1] {
            std::fs::write(dir.path().join(format!("page-{}.png", n)), b"").unwrap();
            std::fs::write(dir.path().join(format!("page-{}.tsv", n)), b"").unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::write(dir.path().join("page-x.png"), b"").unwrap();

        let images = rendered_images(dir.path()).await.unwrap();
        assert_eq!(
            images.iter().map(|(n, _)| *n).collect::<Vec<_>>(),
            vec![0, 1, 2, 10]
        );

        let pages = collect_rendered_pages(dir.path()).await.unwrap();
        assert_eq!(pages.len(), 4);
        match &pages[3] {
            PageSource::Files { image, recognition } => {
                assert!(image.ends_with("page-10.png"));
                assert!(recognition.ends_with("page-10.tsv"));
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_recognition() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("page-1.png"), b"").unwrap();
        assert!(matches!(
            collect_rendered_pages(dir.path()).await,
            Err(RasterizeError::MissingRecognition(1))
        ));
    }

    #[tokio::test]
    async fn test_empty_dir() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            collect_rendered_pages(dir.path()).await,
            Err(RasterizeError::NoPages(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let rasterizer = CommandRasterizer::new(RasterizeConfig {
            magick_binary: "definitely-not-installed-magick".to_string(),
            ..Default::default()
        });
        let dir = tempdir().unwrap();
        assert!(!rasterizer.is_available());
        assert!(matches!(
            rasterizer.rasterize(Path::new("in.pdf"), dir.path()).await,
            Err(RasterizeError::BinaryNotFound(_))
        ));
    }
}
