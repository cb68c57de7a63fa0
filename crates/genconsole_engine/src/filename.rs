use sha2::{Digest, Sha256};

const MAX_STEM_LEN: usize = 64;

/// Portable, deterministic filename: `{sanitized_label}--{short_hash(key)}.{extension}`.
///
/// `key` should identify the artefact (session and step), so two labels that
/// sanitize to the same stem still get distinct names.
pub fn deterministic_filename(label: &str, key: &str, extension: &str) -> String {
    let stem = sanitize_label(label);
    let hash = short_hash(key);
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        format!("{stem}--{hash}")
    } else {
        format!("{stem}--{hash}.{extension}")
    }
}

/// Best guess at a file extension for generated step content.
pub fn extension_for_content(content: &str) -> &'static str {
    let head = content.trim_start();
    if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
        "svg"
    } else if head.starts_with("<!DOCTYPE html") || head.starts_with("<html") {
        "html"
    } else if (head.starts_with('{') || head.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(content).is_ok()
    {
        "json"
    } else {
        "md"
    }
}

fn sanitize_label(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    for c in input.chars() {
        let c = if is_forbidden(c) || c.is_whitespace() { '_' } else { c };
        if c == '_' && cleaned.ends_with('_') {
            continue;
        }
        cleaned.push(c);
    }

    let mut stem: String = cleaned
        .trim_matches(&['_', '.', '-'][..])
        .chars()
        .take(MAX_STEM_LEN)
        .collect();
    if stem.is_empty() {
        stem = "untitled".to_string();
    }
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    stem
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().take(4).map(|byte| format!("{byte:02x}")).collect()
}
