//! Path utilities: content types by extension and stored-path normalization.
//!
//! Content types come from a static extension table. A file is a video iff its
//! content type starts with `video/`, an image iff it starts with `image/`.

use std::path::Path;

/// Fallback for extensions missing from [`CONTENT_TYPES`].
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Extension → content type table, lowercase extensions.
const CONTENT_TYPES: &[(&str, &str)] = &[
    // video
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("wmv", "video/x-ms-wmv"),
    ("flv", "video/x-flv"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("ts", "video/mp2t"),
    ("3gp", "video/3gpp"),
    ("ogv", "video/ogg"),
    // image
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("heic", "image/heic"),
    ("avif", "image/avif"),
    ("ico", "image/x-icon"),
    // audio
    ("mp3", "audio/mpeg"),
    ("m4a", "audio/mp4"),
    ("flac", "audio/flac"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("opus", "audio/opus"),
    ("aac", "audio/aac"),
    // streaming
    ("m3u8", "application/vnd.apple.mpegurl"),
    // documents and archives
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("tar", "application/x-tar"),
    ("7z", "application/x-7z-compressed"),
    ("rar", "application/vnd.rar"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("srt", "application/x-subrip"),
    ("vtt", "text/vtt"),
];

/// Image extensions browsers render natively.
const WEB_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Content type for a path, from its extension.
///
/// ```
/// use std::path::Path;
/// use fileserve_common::paths::content_type;
///
/// assert_eq!(content_type(Path::new("a/b/photo.JPG")), "image/jpeg");
/// assert_eq!(content_type(Path::new("notes.unknown")), "application/octet-stream");
/// ```
pub fn content_type(path: &Path) -> &'static str {
    extension(path)
        .and_then(|ext| {
            CONTENT_TYPES
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, mime)| *mime)
        })
        .unwrap_or(OCTET_STREAM)
}

pub fn is_video_file(path: &Path) -> bool {
    content_type(path).starts_with("video/")
}

pub fn is_image_file(path: &Path) -> bool {
    content_type(path).starts_with("image/")
}

/// An image a browser can display inline.
pub fn is_web_image(path: &Path) -> bool {
    is_image_file(path)
        && extension(path)
            .map(|ext| WEB_IMAGE_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
}

/// Last segment of a stored forward-slash path.
pub fn stored_basename(stored: &str) -> &str {
    stored.rsplit('/').next().unwrap_or(stored)
}

/// Normalize a path for storage: backslashes become forward slashes, `.` and
/// empty segments are dropped and `..` is resolved lexically.
///
/// Absolute paths never climb above `/`. A trailing slash is preserved.
///
/// ```
/// use fileserve_common::paths::normalize_stored_path;
///
/// assert_eq!(normalize_stored_path(r"C:\media\a.mp4"), "C:/media/a.mp4");
/// assert_eq!(normalize_stored_path("/srv//media/./x/../a.mp4"), "/srv/media/a.mp4");
/// ```
pub fn normalize_stored_path(raw: &str) -> String {
    let slashed = raw.replace('\\', "/");
    if slashed.is_empty() {
        return ".".to_string();
    }
    let absolute = slashed.starts_with('/');
    let trailing = slashed.len() > 1 && slashed.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in slashed.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let mut normalized = segments.join("/");
    if absolute {
        normalized.insert(0, '/');
    }
    if normalized.is_empty() {
        normalized.push('.');
    }
    if trailing && !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type(Path::new("movie.mkv")), "video/x-matroska");
        assert_eq!(content_type(Path::new("clip.MOV")), "video/quicktime");
        assert_eq!(content_type(Path::new("seg-001.ts")), "video/mp2t");
        assert_eq!(content_type(Path::new("song.mp3")), "audio/mpeg");
        assert_eq!(content_type(Path::new("README")), OCTET_STREAM);
        assert_eq!(content_type(Path::new("archive.xyz")), OCTET_STREAM);
    }

    #[test]
    fn file_kinds() {
        assert!(is_video_file(Path::new("/srv/a.mp4")));
        assert!(!is_video_file(Path::new("/srv/a.png")));
        assert!(is_image_file(Path::new("scan.tiff")));
        assert!(!is_image_file(Path::new("doc.pdf")));
    }

    #[test]
    fn web_images() {
        for name in ["a.png", "a.jpg", "a.JPEG", "a.gif", "a.webp"] {
            assert!(is_web_image(Path::new(name)), "{name}");
        }
        assert!(!is_web_image(Path::new("a.tiff")));
        assert!(!is_web_image(Path::new("a.heic")));
        assert!(!is_web_image(Path::new("a.mp4")));
    }

    #[test]
    fn basename_of_stored_path() {
        assert_eq!(stored_basename("/srv/media/a.mp4"), "a.mp4");
        assert_eq!(stored_basename("a.mp4"), "a.mp4");
    }

    #[test]
    fn normalize_resolves_dots() {
        assert_eq!(normalize_stored_path("/a/b/../c"), "/a/c");
        assert_eq!(normalize_stored_path("/../a"), "/a");
        assert_eq!(normalize_stored_path("a/../../b"), "../b");
        assert_eq!(normalize_stored_path("./a/./b"), "a/b");
        assert_eq!(normalize_stored_path("/"), "/");
        assert_eq!(normalize_stored_path(""), ".");
    }

    #[test]
    fn normalize_keeps_trailing_slash() {
        assert_eq!(normalize_stored_path("/srv/media/"), "/srv/media/");
        assert_eq!(normalize_stored_path("a\\b\\"), "a/b/");
    }
}
