//! The fixed catalogue of dictionary segment files and URL/name mapping.

/// Logical names of every dictionary segment, in load order.
pub const SEGMENT_NAMES: [&str; 12] = [
    "base",
    "cc",
    "check",
    "tid",
    "tid_map",
    "tid_pos",
    "unk",
    "unk_char",
    "unk_compat",
    "unk_invoke",
    "unk_map",
    "unk_pos",
];

/// Record count at which the cache is considered complete.
pub const EXPECTED_SEGMENT_COUNT: u64 = SEGMENT_NAMES.len() as u64;

/// File extension of a segment file.
pub const SEGMENT_SUFFIX: &str = ".dat";

/// Derive the logical segment name from a URL.
///
/// Takes the final path component and drops its last four characters
/// (the extension), so `https://host/dict/tid_map.dat` maps to `tid_map`.
pub fn segment_name(url: &str) -> Option<&str> {
    let file = url.rsplit('/').next().unwrap_or(url);
    let end = file.len().checked_sub(SEGMENT_SUFFIX.len())?;
    file.get(..end).filter(|name| !name.is_empty())
}

/// Build the URL of a segment under `base_path`.
pub fn segment_url(base_path: Option<&str>, name: &str) -> String {
    match base_path.map(|b| b.trim_end_matches('/')) {
        Some(base) if !base.is_empty() => format!("{}/{}{}", base, name, SEGMENT_SUFFIX),
        _ => format!("{}{}", name, SEGMENT_SUFFIX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_name_from_url() {
        assert_eq!(segment_name("https://host/dict/base.dat"), Some("base"));
        assert_eq!(segment_name("https://host/dict/tid_map.dat"), Some("tid_map"));
        assert_eq!(segment_name("dict/unk_invoke.dat"), Some("unk_invoke"));
        assert_eq!(segment_name("cc.dat"), Some("cc"));
    }

    #[test]
    fn test_segment_name_too_short() {
        assert_eq!(segment_name("https://host/dict/.dat"), None);
        assert_eq!(segment_name("https://host/dict/"), None);
        assert_eq!(segment_name("abc"), None);
    }

    #[test]
    fn test_segment_url() {
        assert_eq!(
            segment_url(Some("https://host/dict/"), "base"),
            "https://host/dict/base.dat"
        );
        assert_eq!(segment_url(Some("dict"), "cc"), "dict/cc.dat");
        assert_eq!(segment_url(None, "check"), "check.dat");
        assert_eq!(segment_url(Some(""), "tid"), "tid.dat");
    }

    #[test]
    fn test_catalogue_round_trips_through_url() {
        for name in SEGMENT_NAMES {
            let url = segment_url(Some("https://cdn.example.com/dict"), name);
            assert_eq!(segment_name(&url), Some(name));
        }
        assert_eq!(EXPECTED_SEGMENT_COUNT, 12);
    }
}
