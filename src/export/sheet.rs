//! Technical sheet document
//!
//! The sheet is built once from a fully embedded listing and then rendered
//! to HTML, a raster image or a PDF page.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::contact::SellerContact;
use crate::data::Listing;

/// One labelled value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetField {
    pub label: &'static str,
    pub value: String,
}

/// Titled group of fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetSection {
    pub title: &'static str,
    pub fields: Vec<SheetField>,
}

/// Printable description of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechnicalSheet {
    pub listing_id: i64,
    /// "Toyota – Sedán"
    pub title: String,
    pub brand: String,
    pub model: String,
    /// Formatted price, "₡8 500 000"
    pub price: String,
    /// Picture sources (`data:` URLs or bare base64), in gallery order
    pub gallery: Vec<String>,
    pub sections: Vec<SheetSection>,
    pub seller: Option<SellerContact>,
}

fn field(label: &'static str, value: impl Into<String>) -> SheetField {
    SheetField {
        label,
        value: value.into(),
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "Sí" } else { "No" }
}

fn desc<T>(value: &Option<T>, get: impl Fn(&T) -> &str) -> String {
    value.as_ref().map(get).unwrap_or_default().to_string()
}

impl TechnicalSheet {
    pub fn from_listing(listing: &Listing) -> Self {
        let brand = listing.brand_name().to_string();
        let model = listing.model_name().to_string();
        let style = desc(&listing.styles, |s| s.desc.as_str());
        let price = format_price_crc(listing.price);

        let mut sections = vec![
            SheetSection {
                title: "Especificaciones",
                fields: vec![
                    field("Marca", brand.clone()),
                    field("Modelo", model.clone()),
                    field("Estilo", style.clone()),
                    field("Año", listing.year_label()),
                    field("Color exterior", listing.exterior_color.clone()),
                    field("Color interior", listing.interior_color.clone()),
                ],
            },
            SheetSection {
                title: "Detalles mecánicos",
                fields: vec![
                    field("Transmisión", desc(&listing.transmissions, |t| t.desc.as_str())),
                    field("Cilindraje", desc(&listing.displacements, |d| d.desc.as_str())),
                    field("Combustible", desc(&listing.fuel, |f| f.desc.as_str())),
                    field("Puertas", listing.number_of_doors.to_string()),
                    field("Recibe", yes_no(listing.receives)),
                    field("Negociable", yes_no(listing.negotiable)),
                ],
            },
            SheetSection {
                title: "Estado",
                fields: vec![
                    field("Precio", price.clone()),
                    field("Vendido", yes_no(listing.sold)),
                    field(
                        "Fecha ingreso",
                        format_date(listing.audit.as_ref().and_then(|a| a.created_at)),
                    ),
                ],
            },
        ];

        let seller = listing.users.as_ref().map(SellerContact::from_user);
        if let Some(seller) = &seller {
            sections.push(SheetSection {
                title: "Información del vendedor",
                fields: vec![
                    field("Nombre", seller.name.clone()),
                    field("Correo", seller.email.clone()),
                    field("Teléfono", seller.phone.clone().unwrap_or_default()),
                ],
            });
        }

        Self {
            listing_id: listing.id_cars,
            title: format!("{brand} – {style}"),
            brand,
            model,
            price,
            gallery: listing.images().map(|image| image.image.clone()).collect(),
            sections,
            seller,
        }
    }

    /// Title followed by one "Label: value" line per field
    pub fn text_lines(&self) -> Vec<String> {
        let mut lines = vec![self.title.clone()];
        for section in &self.sections {
            lines.push(section.title.to_string());
            lines.extend(
                section
                    .fields
                    .iter()
                    .map(|field| format!("{}: {}", field.label, field.value)),
            );
        }
        lines
    }

    /// Standalone styled HTML document of the sheet
    pub fn render_html(&self) -> String {
        use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

        let mut html = String::with_capacity(4096);
        html.push_str("<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", text(&self.title)));
        html.push_str(SHEET_STYLE);
        html.push_str("</head>\n<body>\n<article class=\"sheet\">\n");
        html.push_str(&format!("<h1>{}</h1>\n", text(&self.title)));

        html.push_str("<div class=\"gallery\">\n");
        for source in &self.gallery {
            html.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\">\n",
                attr(source),
                attr(&format!("{} {}", self.brand, self.model))
            ));
        }
        html.push_str("</div>\n<div class=\"columns\">\n");

        for section in &self.sections {
            html.push_str(&format!("<section>\n<h3>{}</h3>\n", text(section.title)));
            for field in &section.fields {
                html.push_str(&format!(
                    "<p><strong>{}:</strong> {}</p>\n",
                    text(field.label),
                    text(&field.value)
                ));
            }
            html.push_str("</section>\n");
        }
        html.push_str("</div>\n</article>\n</body>\n</html>\n");
        html
    }
}

const SHEET_STYLE: &str = r#"<style>
body { margin: 0; font-family: Helvetica, Arial, sans-serif; background: #ffffff; color: #1d1d1f; }
.sheet { width: 1200px; padding: 40px; box-sizing: border-box; }
h1 { margin: 0 0 24px; padding: 16px 24px; background: #12355b; color: #ffffff; border-radius: 8px; }
.gallery { display: grid; grid-template-columns: repeat(3, 1fr); gap: 16px; margin-bottom: 24px; }
.gallery img { width: 100%; aspect-ratio: 4 / 3; object-fit: cover; border-radius: 6px; background: #e5e7eb; }
.columns { display: grid; grid-template-columns: 1fr 1fr; gap: 24px; }
h3 { margin: 0 0 8px; color: #12355b; }
p { margin: 4px 0; }
</style>
"#;

/// Whole colones with es-CR digit grouping: `₡8 500 000` (U+00A0 separators)
pub fn format_price_crc(price: i64) -> String {
    let digits = price.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 * 2);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('\u{a0}');
        }
        grouped.push(digit);
    }
    let sign = if price < 0 { "-" } else { "" };
    format!("{sign}₡{grouped}")
}

fn format_date(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|date| date.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}
