//! Single-page PDF export
//!
//! The rendered bitmap is JPEG-encoded, scaled to fit an A4 page inside a
//! fixed margin and drawn as an image XObject. An invisible text layer
//! repeats the sheet lines so the document stays searchable.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};

use crate::error::AppError;

/// A4 in points
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const PAGE_MARGIN: f32 = 36.0;
const JPEG_QUALITY: u8 = 85;
const FONT_SIZE: f32 = 10.0;
const LEADING: f32 = 12.0;

/// Placement of the bitmap on the page, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Fit `width` x `height` pixels inside the page margins, top aligned
pub fn fit_to_page(width: u32, height: u32) -> Placement {
    let max_w = PAGE_WIDTH - 2.0 * PAGE_MARGIN;
    let max_h = PAGE_HEIGHT - 2.0 * PAGE_MARGIN;
    let scale = (max_w / width.max(1) as f32).min(max_h / height.max(1) as f32);
    let width = width as f32 * scale;
    let height = height as f32 * scale;

    Placement {
        x: (PAGE_WIDTH - width) / 2.0,
        y: PAGE_HEIGHT - PAGE_MARGIN - height,
        width,
        height,
    }
}

/// Build a one-page PDF showing `image`, with `lines` as its text layer
pub fn to_pdf(image: &RgbaImage, lines: &[String]) -> Result<Vec<u8>, AppError> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode_image(&rgb)?;

    let placement = fit_to_page(image.width(), image.height());
    let content = page_content(&placement, lines);

    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(6);
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    objects.push(b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec());
    objects.push(
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
             /Resources << /Font << /F1 4 0 R >> /XObject << /Im1 5 0 R >> >> /Contents 6 0 R >>"
        )
        .into_bytes(),
    );
    objects.push(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    );
    objects.push(stream(
        &format!(
            "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB \
             /BitsPerComponent 8 /Filter /DCTDecode",
            rgb.width(),
            rgb.height()
        ),
        &jpeg,
    ));
    objects.push(stream("<<", &content));

    Ok(assemble(&objects))
}

fn stream(dictionary_head: &str, data: &[u8]) -> Vec<u8> {
    let mut object = format!("{dictionary_head} /Length {} >>\nstream\n", data.len()).into_bytes();
    object.extend_from_slice(data);
    object.extend_from_slice(b"\nendstream");
    object
}

fn page_content(placement: &Placement, lines: &[String]) -> Vec<u8> {
    let mut content = format!(
        "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/Im1 Do\nQ\n",
        placement.width, placement.height, placement.x, placement.y
    )
    .into_bytes();

    // Render mode 3: glyphs are neither filled nor stroked.
    content.extend_from_slice(
        format!(
            "BT\n/F1 {FONT_SIZE} Tf\n3 Tr\n{LEADING} TL\n{:.2} {:.2} Td\n",
            placement.x,
            placement.y + placement.height - FONT_SIZE
        )
        .as_bytes(),
    );
    for line in lines {
        content.push(b'(');
        content.extend_from_slice(&pdf_string(line));
        content.extend_from_slice(b") Tj T*\n");
    }
    content.extend_from_slice(b"ET");
    content
}

/// Escape a line for a literal string in WinAnsi encoding
fn pdf_string(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            '₡' => out.extend_from_slice(b"CRC "),
            '–' => out.push(0x96),
            c if (c as u32) < 0x20 => out.push(b' '),
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => out.push(c as u8),
            _ => out.push(b'?'),
        }
    }
    out
}

fn assemble(objects: &[Vec<u8>]) -> Vec<u8> {
    let mut pdf = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());

    for (index, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        pdf.extend_from_slice(object);
        pdf.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    pdf
}
