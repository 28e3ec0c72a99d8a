//! Shape checks for intake answers.
//!
//! These are deliberately loose: they catch obvious typos, they do not verify
//! that an address or number exists.

/// Minimum number of digits for something to pass as a phone number.
pub const MIN_PHONE_DIGITS: usize = 7;

/// Email shape: contains `@` and `.`, no spaces, longer than 5 characters.
pub fn looks_like_email(text: &str) -> bool {
    let t = text.trim();
    t.contains('@') && t.contains('.') && !t.contains(' ') && t.chars().count() > 5
}

/// Phone shape: at least [`MIN_PHONE_DIGITS`] digits anywhere in the text.
///
/// Any Unicode digit counts, so numbers typed in Persian or Arabic-Indic
/// digits pass too.
pub fn looks_like_phone(text: &str) -> bool {
    text.chars().filter(|c| c.is_numeric()).count() >= MIN_PHONE_DIGITS
}
