//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on file extension.

/// Fallback for names without a known extension
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Get MIME Content-Type based on file extension (lowercase, without the dot)
///
/// # Examples
/// ```
/// use cidserve::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("html")), "text/html; charset=utf-8");
/// assert_eq!(get_content_type(Some("jpg")), "image/jpeg");
/// assert_eq!(get_content_type(None), "application/octet-stream");
/// ```
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    match extension {
        // Text
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",

        // JavaScript/WASM
        Some("js" | "mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("wasm") => "application/wasm",

        // Images
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",

        // Video
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("ogg" | "ogv") => "video/ogg",
        Some("mov") => "video/quicktime",

        // Audio
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",

        // Documents
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz" | "gzip") => "application/gzip",
        Some("tar") => "application/x-tar",

        // Default
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Content-Type for a file name, matching the extension case-insensitively
pub fn content_type_for_name(name: Option<&str>) -> &'static str {
    let extension = name
        .and_then(|n| n.rsplit_once('.'))
        .map(|(stem, ext)| (stem, ext.to_ascii_lowercase()))
        .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty());

    get_content_type(extension.as_ref().map(|(_, ext)| ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_types() {
        assert_eq!(content_type_for_name(Some("pp.txt")), "text/plain; charset=utf-8");
        assert_eq!(content_type_for_name(Some("cat.jpg")), "image/jpeg");
        assert_eq!(content_type_for_name(Some("cat.jpeg")), "image/jpeg");
        assert_eq!(content_type_for_name(Some("index.html")), "text/html; charset=utf-8");
        assert_eq!(content_type_for_name(Some("hexagons.svg")), "image/svg+xml");
        assert_eq!(content_type_for_name(Some("hexagons-xml.svg")), "image/svg+xml");
    }

    #[test]
    fn test_common_types() {
        assert_eq!(get_content_type(Some("css")), "text/css");
        assert_eq!(get_content_type(Some("js")), "application/javascript");
        assert_eq!(get_content_type(Some("json")), "application/json");
        assert_eq!(get_content_type(Some("png")), "image/png");
        assert_eq!(get_content_type(Some("mp4")), "video/mp4");
    }

    #[test]
    fn test_extension_case_insensitive() {
        assert_eq!(content_type_for_name(Some("PHOTO.JPG")), "image/jpeg");
        assert_eq!(content_type_for_name(Some("Readme.Txt")), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(get_content_type(Some("xyz")), DEFAULT_CONTENT_TYPE);
        assert_eq!(get_content_type(None), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_for_name(None), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_for_name(Some("Makefile")), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_for_name(Some(".bashrc")), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_for_name(Some("trailing.")), DEFAULT_CONTENT_TYPE);
    }
}
