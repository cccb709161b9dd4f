//! Raster rendering of the technical sheet
//!
//! Paints the sheet layout into an RGBA bitmap: a title band with the price,
//! the gallery as a grid of 4:3 cells and the field blocks in two columns,
//! lettered with the bundled DejaVu Sans face. The sheet text also travels
//! with the PNG as text chunks, so a reloaded export still carries brand,
//! model and price.

use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use ab_glyph::{FontRef, PxScale};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use super::sheet::TechnicalSheet;
use crate::error::AppError;

const SHEET_WIDTH: u32 = 1200;
const MARGIN: u32 = 40;
const GAP: u32 = 16;
const GALLERY_COLUMNS: u32 = 3;
const HEADER_HEIGHT: u32 = 72;
const ROW_HEIGHT: u32 = 28;
const TEXT_COLUMNS: u32 = 2;
const HEADER_PADDING: u32 = 20;

const SHEET_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
const TITLE_SCALE: PxScale = PxScale { x: 30.0, y: 30.0 };
const SECTION_SCALE: PxScale = PxScale { x: 20.0, y: 20.0 };
const FIELD_SCALE: PxScale = PxScale { x: 16.0, y: 16.0 };

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const HEADER: Rgba<u8> = Rgba([18, 53, 91, 255]);
const HEADER_TEXT: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PLACEHOLDER: Rgba<u8> = Rgba([229, 231, 235, 255]);
const SECTION_TITLE: Rgba<u8> = Rgba([18, 53, 91, 255]);
const FIELD_TEXT: Rgba<u8> = Rgba([55, 65, 81, 255]);

/// Accepts `data:` URLs and bare base64, with or without padding
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Keywords of the PNG text chunks
pub mod keywords {
    pub const TITLE: &str = "Title";
    pub const BRAND: &str = "Brand";
    pub const MODEL: &str = "Model";
    pub const PRICE: &str = "Price";
    pub const DESCRIPTION: &str = "Description";
    pub const SOFTWARE: &str = "Software";
}

/// Rendered bitmap plus what happened to the gallery pictures
#[derive(Debug, Clone)]
pub struct RasterSheet {
    pub image: RgbaImage,
    pub lines: Vec<String>,
    pub images_loaded: usize,
    pub images_failed: usize,
}

/// Decode a stored picture
pub fn decode_data_image(source: &str) -> Result<DynamicImage, AppError> {
    let payload = match source.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => data,
        _ => source,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = LENIENT_BASE64
        .decode(cleaned.as_bytes())
        .map_err(|e| AppError::Image(format!("invalid base64 image: {e}")))?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Render the sheet once every gallery picture has loaded or failed
pub async fn rasterize(sheet: &TechnicalSheet) -> Result<RasterSheet, AppError> {
    let loads = sheet.gallery.iter().cloned().map(|source| {
        tokio::task::spawn_blocking(move || decode_data_image(&source))
    });
    let pictures: Vec<Option<DynamicImage>> = futures::future::join_all(loads)
        .await
        .into_iter()
        .enumerate()
        .map(|(index, joined)| match joined {
            Ok(Ok(picture)) => Some(picture),
            Ok(Err(error)) => {
                tracing::warn!(index, %error, "Gallery picture failed to load");
                None
            }
            Err(error) => {
                tracing::warn!(index, %error, "Gallery picture task failed");
                None
            }
        })
        .collect();

    let sheet = sheet.clone();
    tokio::task::spawn_blocking(move || paint(&sheet, &pictures))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
}

fn sheet_font() -> Result<FontRef<'static>, AppError> {
    FontRef::try_from_slice(SHEET_FONT).map_err(|e| AppError::Export(format!("font: {e}")))
}

/// Gallery cell size: three columns of 4:3 cells
fn cell_size() -> (u32, u32) {
    let width = (SHEET_WIDTH - 2 * MARGIN - (GALLERY_COLUMNS - 1) * GAP) / GALLERY_COLUMNS;
    (width, width * 3 / 4)
}

fn section_height(fields: usize) -> u32 {
    ROW_HEIGHT * (fields as u32 + 1) + GAP
}

fn paint(sheet: &TechnicalSheet, pictures: &[Option<DynamicImage>]) -> Result<RasterSheet, AppError> {
    let font = sheet_font()?;
    let (cell_w, cell_h) = cell_size();
    let gallery_rows = (pictures.len() as u32).div_ceil(GALLERY_COLUMNS);
    let gallery_height = gallery_rows * (cell_h + GAP);

    let section_rows: Vec<u32> = sheet
        .sections
        .chunks(TEXT_COLUMNS as usize)
        .map(|row| {
            row.iter()
                .map(|section| section_height(section.fields.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();
    let text_height: u32 = section_rows.iter().sum();

    let height = MARGIN + HEADER_HEIGHT + GAP + gallery_height + text_height + MARGIN;
    let mut canvas = RgbaImage::from_pixel(SHEET_WIDTH, height, BACKGROUND);

    let band_width = SHEET_WIDTH - 2 * MARGIN;
    fill_rect(&mut canvas, MARGIN, MARGIN, band_width, HEADER_HEIGHT, HEADER);

    let (price_width, _) = text_size(TITLE_SCALE, &font, &sheet.price);
    let price_x = (MARGIN + band_width).saturating_sub(HEADER_PADDING + price_width);
    let text_y = MARGIN + (HEADER_HEIGHT - TITLE_SCALE.y as u32) / 2;
    let title_room = price_x.saturating_sub(MARGIN + 2 * HEADER_PADDING);
    let title = fit_text(&font, TITLE_SCALE, &sheet.title, title_room);
    draw_text(&mut canvas, HEADER_TEXT, MARGIN + HEADER_PADDING, text_y, TITLE_SCALE, &font, &title);
    draw_text(&mut canvas, HEADER_TEXT, price_x, text_y, TITLE_SCALE, &font, &sheet.price);

    let gallery_top = MARGIN + HEADER_HEIGHT + GAP;
    let mut loaded = 0;
    for (index, picture) in pictures.iter().enumerate() {
        let index = index as u32;
        let x = MARGIN + (index % GALLERY_COLUMNS) * (cell_w + GAP);
        let y = gallery_top + (index / GALLERY_COLUMNS) * (cell_h + GAP);
        match picture {
            Some(picture) => {
                let cell = picture.resize_to_fill(cell_w, cell_h, FilterType::Triangle);
                imageops::overlay(&mut canvas, &cell.to_rgba8(), i64::from(x), i64::from(y));
                loaded += 1;
            }
            None => fill_rect(&mut canvas, x, y, cell_w, cell_h, PLACEHOLDER),
        }
    }

    let column_width = (SHEET_WIDTH - 2 * MARGIN - (TEXT_COLUMNS - 1) * GAP) / TEXT_COLUMNS;
    let mut row_top = gallery_top + gallery_height;
    for (row, row_height) in sheet.sections.chunks(TEXT_COLUMNS as usize).zip(&section_rows) {
        for (column, section) in row.iter().enumerate() {
            let x = MARGIN + column as u32 * (column_width + GAP);
            let title = fit_text(&font, SECTION_SCALE, section.title, column_width);
            draw_text(&mut canvas, SECTION_TITLE, x, row_top + 4, SECTION_SCALE, &font, &title);

            for (line, field) in section.fields.iter().enumerate() {
                let y = row_top + ROW_HEIGHT * (line as u32 + 1) + 6;
                let text = format!("{}: {}", field.label, field.value);
                let text = fit_text(&font, FIELD_SCALE, &text, column_width);
                draw_text(&mut canvas, FIELD_TEXT, x, y, FIELD_SCALE, &font, &text);
            }
        }
        row_top += row_height;
    }

    Ok(RasterSheet {
        image: canvas,
        lines: sheet.text_lines(),
        images_loaded: loaded,
        images_failed: pictures.len() - loaded,
    })
}

/// `text` cut down with an ellipsis until it fits in `max_width` pixels
fn fit_text(font: &FontRef<'_>, scale: PxScale, text: &str, max_width: u32) -> String {
    if text_size(scale, font, text).0 <= max_width {
        return text.to_string();
    }
    let mut kept = text.to_string();
    while kept.pop().is_some() {
        let candidate = format!("{}…", kept.trim_end());
        if text_size(scale, font, &candidate).0 <= max_width {
            return candidate;
        }
    }
    String::new()
}

fn draw_text(
    canvas: &mut RgbaImage,
    color: Rgba<u8>,
    x: u32,
    y: u32,
    scale: PxScale,
    font: &FontRef<'_>,
    text: &str,
) {
    draw_text_mut(canvas, color, x as i32, y as i32, scale, font, text);
}

fn fill_rect(canvas: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>) {
    draw_filled_rect_mut(canvas, Rect::at(x as i32, y as i32).of_size(width, height), color);
}

fn png_error(e: impl std::fmt::Display) -> AppError {
    AppError::Export(format!("png: {e}"))
}

/// Encode the bitmap as PNG with the sheet text in text chunks
pub fn encode_png(raster: &RasterSheet, sheet: &TechnicalSheet) -> Result<Vec<u8>, AppError> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, raster.image.width(), raster.image.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        // iTXt keeps non Latin-1 text such as the colón sign intact.
        encoder
            .add_itxt_chunk(keywords::TITLE.to_string(), sheet.title.clone())
            .map_err(png_error)?;
        encoder
            .add_itxt_chunk(keywords::BRAND.to_string(), sheet.brand.clone())
            .map_err(png_error)?;
        encoder
            .add_itxt_chunk(keywords::MODEL.to_string(), sheet.model.clone())
            .map_err(png_error)?;
        encoder
            .add_itxt_chunk(keywords::PRICE.to_string(), sheet.price.clone())
            .map_err(png_error)?;
        encoder
            .add_itxt_chunk(keywords::DESCRIPTION.to_string(), raster.lines.join("\n"))
            .map_err(png_error)?;
        encoder
            .add_text_chunk(keywords::SOFTWARE.to_string(), "autolote".to_string())
            .map_err(png_error)?;

        let mut writer = encoder.write_header().map_err(png_error)?;
        writer
            .write_image_data(raster.image.as_raw())
            .map_err(png_error)?;
        writer.finish().map_err(png_error)?;
    }
    Ok(out)
}

/// Text chunks of a PNG, as `(keyword, text)` pairs
pub fn read_png_text(bytes: &[u8]) -> Result<Vec<(String, String)>, AppError> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_ignore_text_chunk(false);
    let reader = decoder.read_info().map_err(png_error)?;
    let info = reader.info();

    let mut chunks: Vec<(String, String)> = info
        .uncompressed_latin1_text
        .iter()
        .map(|chunk| (chunk.keyword.clone(), chunk.text.clone()))
        .collect();
    for chunk in &info.utf8_text {
        chunks.push((chunk.keyword.clone(), chunk.get_text().map_err(png_error)?));
    }
    Ok(chunks)
}
