//! Technical sheet export
//!
//! Builds a [`TechnicalSheet`] from a listing, renders it and writes a PNG
//! or single-page PDF named `{brand}-{model}-{yyyymmdd}.{ext}`.

pub mod contact;
pub mod pdf;
pub mod raster;
mod sheet;

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::data::Listing;
use crate::error::AppError;

pub use contact::SellerContact;
pub use raster::{RasterSheet, decode_data_image, encode_png, rasterize, read_png_text};
pub use sheet::{SheetField, SheetSection, TechnicalSheet, format_price_crc};

/// Output file type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Pdf => "pdf",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            other => Err(AppError::Validation(format!("unknown export format: {other}"))),
        }
    }
}

/// `{brand}-{model}-{yyyymmdd}.{ext}`, lowercased, with every character
/// outside `[a-z0-9-_.]` replaced by `_`
pub fn export_filename(brand: &str, model: &str, date: NaiveDate, extension: &str) -> String {
    format!("{brand}-{model}-{}.{extension}", date.format("%Y%m%d"))
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}

/// A written export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedSheet {
    pub path: PathBuf,
    pub bytes_written: usize,
    pub images_failed: usize,
}

/// Renders sheets and writes them to the export directory
#[derive(Debug, Clone)]
pub struct SheetExporter {
    output_dir: PathBuf,
}

impl SheetExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Render `listing` in memory
    pub async fn render(
        &self,
        listing: &Listing,
        format: ExportFormat,
    ) -> Result<(Vec<u8>, RasterSheet), AppError> {
        let sheet = TechnicalSheet::from_listing(listing);
        let raster = rasterize(&sheet).await?;
        let bytes = match format {
            ExportFormat::Png => encode_png(&raster, &sheet)?,
            ExportFormat::Pdf => pdf::to_pdf(&raster.image, &raster.lines)?,
        };
        Ok((bytes, raster))
    }

    /// Render `listing` and write it under the export directory, named for `date`
    pub async fn export(
        &self,
        listing: &Listing,
        format: ExportFormat,
        date: NaiveDate,
    ) -> Result<ExportedSheet, AppError> {
        let (bytes, raster) = self.render(listing, format).await?;
        let file_name = export_filename(
            listing.brand_name(),
            listing.model_name(),
            date,
            format.extension(),
        );

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AppError::Export(format!("create {}: {e}", self.output_dir.display())))?;
        let path = self.output_dir.join(file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| AppError::Export(format!("write {}: {e}", path.display())))?;

        tracing::info!(
            listing_id = listing.id_cars,
            path = %path.display(),
            bytes = bytes.len(),
            images_failed = raster.images_failed,
            "Technical sheet exported"
        );

        Ok(ExportedSheet {
            path,
            bytes_written: bytes.len(),
            images_failed: raster.images_failed,
        })
    }

    /// Same as [`SheetExporter::export`] dated today
    pub async fn export_today(
        &self,
        listing: &Listing,
        format: ExportFormat,
    ) -> Result<ExportedSheet, AppError> {
        self.export(listing, format, chrono::Local::now().date_naive())
            .await
    }
}
