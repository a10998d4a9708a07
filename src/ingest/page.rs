//! Page assets and single-page persistence.

use std::io::Cursor;
use std::path::PathBuf;

use image::ImageReader;

use super::error::IngestError;
use crate::models::Token;
use crate::repository::document::insert_page_in;
use crate::repository::models::NewDocumentPage;
use crate::repository::util::to_sql_int;
use crate::repository::SqliteConn;

/// Where one page's image and recognition records come from.
#[derive(Debug, Clone)]
pub enum PageSource {
    /// Rendered files on disk, e.g. `page-1.png` and `page-1.tsv`.
    Files { image: PathBuf, recognition: PathBuf },
    /// Already loaded assets.
    Memory { image: Vec<u8>, recognition: String },
}

impl PageSource {
    pub fn files(image: impl Into<PathBuf>, recognition: impl Into<PathBuf>) -> Self {
        Self::Files {
            image: image.into(),
            recognition: recognition.into(),
        }
    }

    /// Read the recognition record stream.
    pub async fn load_recognition(&self, page: u32) -> Result<String, IngestError> {
        match self {
            Self::Files { recognition, .. } => tokio::fs::read_to_string(recognition)
                .await
                .map_err(|source| IngestError::ReadRecognition { page, source }),
            Self::Memory { recognition, .. } => Ok(recognition.clone()),
        }
    }

    /// Read the encoded image bytes.
    pub async fn load_image(&self, page: u32) -> Result<Vec<u8>, IngestError> {
        match self {
            Self::Files { image, .. } => tokio::fs::read(image)
                .await
                .map_err(|source| IngestError::ReadImage { page, source }),
            Self::Memory { image, .. } => Ok(image.clone()),
        }
    }
}

/// Everything stored for one page.
#[derive(Debug, Clone)]
pub struct PageAssets {
    pub width: u32,
    pub height: u32,
    /// Encoded image, stored as-is.
    pub image: Vec<u8>,
    pub image_format: String,
    pub tokens: Vec<Token>,
}

impl PageAssets {
    /// Read the image header for its format and dimensions.
    ///
    /// Only the header is decoded; the bytes are kept unchanged.
    pub fn decode(page: u32, image: Vec<u8>, tokens: Vec<Token>) -> Result<Self, IngestError> {
        let reader = ImageReader::new(Cursor::new(image.as_slice()))
            .with_guessed_format()
            .map_err(|source| IngestError::ReadImage { page, source })?;
        let image_format = reader
            .format()
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("bin")
            .to_string();
        let (width, height) = reader
            .into_dimensions()
            .map_err(|source| IngestError::DecodeImage { page, source })?;

        Ok(Self {
            width,
            height,
            image,
            image_format,
            tokens,
        })
    }
}

/// Write one page row inside the caller's transaction.
pub async fn ingest_page(
    conn: &mut SqliteConn,
    document_id: i32,
    page_number: u32,
    assets: &PageAssets,
) -> Result<(), IngestError> {
    let page = page_number;
    if assets.width == 0 || assets.height == 0 {
        return Err(IngestError::InvalidDimensions {
            page,
            width: assets.width,
            height: assets.height,
        });
    }

    let tokens = serde_json::to_vec(&assets.tokens)
        .map_err(|source| IngestError::EncodeTokens { page, source })?;
    let insert = |source| IngestError::InsertPage { page, source };

    let record = NewDocumentPage {
        document_id,
        page: to_sql_int(page_number).map_err(insert)?,
        height: to_sql_int(assets.height).map_err(insert)?,
        width: to_sql_int(assets.width).map_err(insert)?,
        image: &assets.image,
        image_format: &assets.image_format,
        tokens: &tokens,
    };

    insert_page_in(conn, &record).await.map_err(insert)?;
    tracing::debug!(
        document_id,
        page = page_number,
        tokens = assets.tokens.len(),
        "Stored page"
    );
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::repository::DbContext;
    use tempfile::tempdir;

    /// Encode a blank PNG of the given size.
    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::new(width, height);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_reads_dimensions() {
        let assets = PageAssets::decode(1, png(12, 7), Vec::new()).unwrap();
        assert_eq!((assets.width, assets.height), (12, 7));
        assert_eq!(assets.image_format, "png");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = PageAssets::decode(4, b"not an image".to_vec(), Vec::new()).unwrap_err();
        assert_eq!(err.page(), Some(4));
    }

    #[tokio::test]
    async fn test_zero_dimensions_rejected() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let id = ctx.documents().create("scan.pdf").await.unwrap();

        let assets = PageAssets {
            width: 0,
            height: 10,
            image: Vec::new(),
            image_format: "png".to_string(),
            tokens: Vec::new(),
        };
        let mut conn = ctx.pool().get().await.unwrap();
        let err = ingest_page(&mut conn, id, 1, &assets).await.unwrap_err();
        assert!(matches!(err, IngestError::InvalidDimensions { page: 1, .. }));
        assert_eq!(ctx.documents().count_pages(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_files() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("page-1.png");
        let recognition = dir.path().join("page-1.tsv");
        std::fs::write(&image, png(2, 2)).unwrap();
        std::fs::write(&recognition, "header\n").unwrap();

        let source = PageSource::files(&image, &recognition);
        assert_eq!(source.load_recognition(1).await.unwrap(), "header\n");
        assert_eq!(source.load_image(1).await.unwrap(), png(2, 2));

        let missing = PageSource::files(dir.path().join("x.png"), &recognition);
        assert!(matches!(
            missing.load_image(2).await,
            Err(IngestError::ReadImage { page: 2, .. })
        ));
    }
}
