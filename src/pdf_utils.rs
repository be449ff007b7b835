//! Shared PDF parsing utilities used across multiple modules.

use lopdf::{Dictionary, Document, Object, StringFormat};

/// Follow `value` through one indirect reference if it is one.
pub fn resolve<'a>(document: &'a Document, value: &'a Object) -> Option<&'a Object> {
    match value {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Resolve a value that might be an inline dictionary or a reference to one.
pub fn resolve_dict<'a>(document: &'a Document, value: &'a Object) -> Option<&'a Dictionary> {
    resolve(document, value).and_then(|o| o.as_dict().ok())
}

/// Resolve a value that might be an inline array or a reference to one.
pub fn resolve_array<'a>(document: &'a Document, value: &'a Object) -> Option<&'a Vec<Object>> {
    resolve(document, value).and_then(|o| o.as_array().ok())
}

/// Decode a PDF text string: UTF-16BE when it starts with a BOM, otherwise
/// UTF-8 with a Latin-1 fallback.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Encode `text` as a PDF string object: a plain literal for ASCII,
/// UTF-16BE with a BOM otherwise.
pub fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Read a text value (string or name) from `dict[key]`, following one
/// indirect reference.
///
/// Returns `None` when the key is absent or holds any other object type.
pub fn extract_text_from_dict(
    document: &Document,
    dict: &Dictionary,
    key: &[u8],
) -> Option<String> {
    match resolve(document, dict.get(key).ok()?)? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}
