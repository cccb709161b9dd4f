//! Seller contact and share links

use serde::Serialize;

use crate::data::User;

/// Country calling code prepended to local phone numbers
pub const COUNTRY_CODE: &str = "506";

/// Seller details shown on the sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellerContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub mailto: Option<String>,
}

impl SellerContact {
    pub fn from_user(user: &User) -> Self {
        Self {
            name: user.full_name(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            whatsapp: user.phone.as_deref().and_then(whatsapp_link),
            mailto: mailto_link(&user.email),
        }
    }
}

fn phone_digits(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    (!digits.is_empty()).then_some(digits)
}

/// `https://wa.me/506{phone}`
pub fn whatsapp_link(phone: &str) -> Option<String> {
    phone_digits(phone).map(|digits| format!("https://wa.me/{COUNTRY_CODE}{digits}"))
}

/// WhatsApp chat with the seller, prefilled with the listing's address
pub fn whatsapp_share_link(phone: &str, page_url: &str) -> Option<String> {
    whatsapp_link(phone).map(|link| format!("{link}/?text={}", urlencoding::encode(page_url)))
}

pub fn mailto_link(email: &str) -> Option<String> {
    let email = email.trim();
    (!email.is_empty()).then(|| format!("mailto:{email}"))
}

pub fn facebook_share_link(page_url: &str) -> String {
    format!(
        "https://www.facebook.com/sharer/sharer.php?u={}",
        urlencoding::encode(page_url)
    )
}
