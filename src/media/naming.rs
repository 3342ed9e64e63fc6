//! Filename and folder name derivation.

use std::collections::HashSet;

use url::Url;

/// Extension used when the content type is unknown.
const FALLBACK_EXTENSION: &str = "bin";

/// Replace every character outside `[A-Za-z0-9_.]` with an underscore.
pub fn clean_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Last path segment of a URL, percent-decoded and cleaned.
pub fn filename_from_url(url: &str) -> String {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
            .unwrap_or_default(),
        // Not absolute; strip query and fragment by hand
        Err(_) => url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .unwrap_or_default()
            .to_string(),
    };

    let decoded = urlencoding::decode(&segment)
        .map(|s| s.into_owned())
        .unwrap_or(segment);

    clean_filename(&decoded)
}

/// Derive the blob filename for a fetched URL.
///
/// Depends only on the URL and the declared content type, so re-deriving
/// for the same response always yields the same name.
pub fn derive_filename(url: &str, content_type: Option<&str>) -> String {
    let mut filename = filename_from_url(url);
    if filename.is_empty() {
        filename.push_str("file");
    }

    if !filename.contains('.') {
        let extension = content_type
            .map(extension_for_content_type)
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
        filename.push('.');
        filename.push_str(&extension);
    }

    filename
}

/// Map a `Content-Type` header value to a canonical file extension.
pub fn extension_for_content_type(content_type: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    if let Some(ext) = mime_to_extension(&essence) {
        return ext.to_string();
    }

    mime_guess::get_mime_extensions_str(&essence)
        .and_then(|exts| exts.first())
        .map(|ext| ext.to_string())
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// Preferred extensions for the media types this pipeline usually sees.
fn mime_to_extension(mimetype: &str) -> Option<&'static str> {
    let ext = match mimetype {
        // Images
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "image/avif" => "avif",

        // Videos
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",

        // Audio
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",

        "application/octet-stream" => FALLBACK_EXTENSION,
        _ => return None,
    };
    Some(ext)
}

/// Sanitize an author name into a single storage-folder segment.
///
/// Word characters and CJK ideographs are kept, everything else becomes `_`.
pub fn sanitize_folder_segment(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || is_cjk_ideograph(c) {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized
    }
}

fn is_cjk_ideograph(c: char) -> bool {
    matches!(c,
        '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}')
}

/// Return `name` or, if already taken, the first free `stem_N.ext` variant.
///
/// The returned name is recorded in `taken`.
pub fn unique_filename(name: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    };

    let mut counter = 1;
    loop {
        let candidate = format!("{}_{}{}", stem, counter, ext);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}
