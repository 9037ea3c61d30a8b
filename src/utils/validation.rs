use std::fmt;

/// Longest sanitized name we stage. Leaves room for the id prefix within a 255 byte
/// filesystem name limit.
pub const MAX_FILENAME_BYTES: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Sanitizes a client supplied filename so it can be used as one path component.
///
/// Only the last component survives (both `/` and `\` count as separators), anything
/// outside alphanumerics and `-_.` becomes `_`, and leading dots are stripped so the
/// result can never be `.`, `..` or a hidden file.
pub fn sanitize_filename(filename: &str) -> Result<String, ValidationError> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path components stripped from filename: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.').to_string();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '_' || c == '.') {
        return Err(ValidationError {
            code: "INVALID_FILENAME",
            message: format!("filename '{}' has no usable characters", filename),
        });
    }

    Ok(truncate_keeping_extension(sanitized))
}

fn truncate_keeping_extension(name: String) -> String {
    if name.len() <= MAX_FILENAME_BYTES {
        return name;
    }

    let ext = file_extension_raw(&name);
    // keep ".ext" only if it is reasonably short
    let suffix = if !ext.is_empty() && ext.len() < 16 {
        format!(".{}", ext)
    } else {
        String::new()
    };

    let mut end = MAX_FILENAME_BYTES - suffix.len();
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &name[..end], suffix)
}

fn file_extension_raw(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[idx + 1..],
        _ => "",
    }
}

/// Lowercased text after the last `.`, or empty when there is none.
pub fn file_extension(filename: &str) -> String {
    file_extension_raw(filename).to_lowercase()
}

/// The filename without its final extension.
pub fn file_stem(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    }
}

/// Lowercases the requested target format. Empty after trimming means "not given".
pub fn normalize_target_format(target_format: &str) -> Option<String> {
    let normalized = target_format.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("movie.mp4").unwrap(), "movie.mp4");
        assert_eq!(sanitize_filename("my clip.MOV").unwrap(), "my_clip.MOV");
        assert_eq!(
            sanitize_filename("test<script>.wav").unwrap(),
            "test_script_.wav"
        );
        assert_eq!(sanitize_filename("日本語.mp4").unwrap(), "日本語.mp4");

        // Path traversal
        assert_eq!(sanitize_filename("../../../etc/passwd").unwrap(), "passwd");
        assert_eq!(
            sanitize_filename("..\\..\\windows\\song.flac").unwrap(),
            "song.flac"
        );

        // Hidden files lose their leading dots
        assert_eq!(sanitize_filename(".hidden.mp3").unwrap(), "hidden.mp3");
    }

    #[test]
    fn test_sanitize_rejects_unusable_names() {
        assert!(sanitize_filename("").is_err());
        assert!(sanitize_filename(".").is_err());
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename("../").is_err());
        assert!(sanitize_filename("???").is_err());

        let err = sanitize_filename("/").unwrap_err();
        assert_eq!(err.code, "INVALID_FILENAME");
    }

    #[test]
    fn test_sanitize_truncates_long_names() {
        let long = format!("{}.mp4", "a".repeat(400));
        let sanitized = sanitize_filename(&long).unwrap();
        assert_eq!(sanitized.len(), MAX_FILENAME_BYTES);
        assert!(sanitized.ends_with(".mp4"));

        let long_unicode = format!("{}.wav", "é".repeat(300));
        let sanitized = sanitize_filename(&long_unicode).unwrap();
        assert!(sanitized.len() <= MAX_FILENAME_BYTES);
        assert!(sanitized.ends_with(".wav"));
    }

    #[test]
    fn test_extension_and_stem() {
        assert_eq!(file_extension("movie.MP4"), "mp4");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("noext"), "");
        assert_eq!(file_extension("trailing."), "");

        assert_eq!(file_stem("movie.mp4"), "movie");
        assert_eq!(file_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(file_stem("noext"), "noext");
    }

    #[test]
    fn test_normalize_target_format() {
        assert_eq!(normalize_target_format("MP3"), Some("mp3".to_string()));
        assert_eq!(normalize_target_format(" flac "), Some("flac".to_string()));
        assert_eq!(normalize_target_format(""), None);
        assert_eq!(normalize_target_format("   "), None);
    }
}
