// src/outbound/phone.rs
// Phone normalization for the WhatsApp Cloud API: international digits,
// no '+', no punctuation.

use anyhow::{Result, anyhow};

/// Normalize a recipient phone. Strips non-digits and leading zeros; a
/// 10/11-digit local number gets the default country code prefixed.
/// Anything shorter than 12 digits after that is rejected.
pub fn normalize_whatsapp_to(raw: &str, default_country_code: &str) -> Result<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Err(anyhow!("empty phone"));
    }

    let mut phone = digits.to_string();
    if phone.len() == 10 || phone.len() == 11 {
        phone = format!("{}{}", default_country_code, phone);
    }

    if phone.len() < 12 {
        return Err(anyhow!("invalid phone length: {}", phone.len()));
    }
    Ok(phone)
}
