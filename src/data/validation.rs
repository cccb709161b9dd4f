//! Text rules shared by the publication form and sign-up

use std::sync::LazyLock;

use regex::Regex;

/// Letters (accented Latin included) and spaces only
static ALPHABETIC_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-zÁ-Úá-úñÑüÜ ]+$").expect("static regex compiles"));

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex compiles"));

/// True for names and colors such as "Azul Eléctrico"
pub fn is_alphabetic_text(value: &str) -> bool {
    ALPHABETIC_TEXT.is_match(value)
}

pub fn is_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

/// Parse a whole-currency amount typed by the user ("8500000")
pub fn parse_whole_amount(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabetic_text_accepts_accents_and_spaces() {
        assert!(is_alphabetic_text("Gris Plomo"));
        assert!(is_alphabetic_text("Azul eléctrico"));
        assert!(is_alphabetic_text("Marrón"));
        assert!(!is_alphabetic_text("Rojo 2"));
        assert!(!is_alphabetic_text("negro/gris"));
        assert!(!is_alphabetic_text(""));
    }

    #[test]
    fn email_shape() {
        assert!(is_email("ana@example.com"));
        assert!(!is_email("ana@example"));
        assert!(!is_email("ana example@x.com"));
    }

    #[test]
    fn whole_amount_rejects_decimals_and_signs() {
        assert_eq!(parse_whole_amount(" 8500000 "), Some(8_500_000));
        assert_eq!(parse_whole_amount("85.5"), None);
        assert_eq!(parse_whole_amount("-1"), None);
        assert_eq!(parse_whole_amount(""), None);
        assert_eq!(parse_whole_amount("99999999999999999999999"), None);
    }
}
