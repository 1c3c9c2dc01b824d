//! # Storage Naming
//!
//! Directory and object names derived from submission fields. Every
//! caller-supplied component is sanitized before it touches the filesystem.

/// Length of a lowercase hex SHA-256 digest.
pub const CONTENT_HASH_HEX_LEN: usize = 64;

/// Longest file name common filesystems accept, in bytes.
pub const MAX_OBJECT_NAME_BYTES: usize = 255;

/// Used when sanitizing leaves nothing to name a directory with.
const EMPTY_COMPONENT: &str = "_";

/// Keep ASCII letters and digits, `_`, `-` and CJK Unified Ideographs
/// U+4E00..=U+9FA5. Everything else becomes `_`.
pub fn sanitize_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric()
                || c == '_'
                || c == '-'
                || ('\u{4E00}'..='\u{9FA5}').contains(&c)
            {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `{projectId}` or `{projectId}-{description}`, both sanitized.
pub fn project_dir_name(project_id: &str, description: Option<&str>) -> String {
    let mut dir = sanitize_component(project_id);
    if dir.is_empty() {
        dir.push_str(EMPTY_COMPONENT);
    }

    if let Some(description) = description.filter(|d| !d.is_empty()) {
        dir.push('-');
        dir.push_str(&sanitize_component(description));
    }
    dir
}

/// `{contentHash}_{arrivalMillis}_{sanitizedOriginalName}`
///
/// The name component is cut on a character boundary so the whole object
/// name fits in [`MAX_OBJECT_NAME_BYTES`].
pub fn object_name(content_hash: &str, arrival_ms: i64, original_name: &str) -> String {
    let mut name = format!("{}_{}_", content_hash, arrival_ms);
    let budget = MAX_OBJECT_NAME_BYTES.saturating_sub(name.len());
    let sanitized = sanitize_component(original_name);
    name.push_str(truncate_to_bytes(&sanitized, budget));
    name
}

/// Longest prefix of `s` that is at most `max_bytes` long.
fn truncate_to_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Split an object name into its content hash and arrival time.
///
/// Returns `None` for anything that is not a committed object, including
/// staging files.
pub fn parse_object_name(name: &str) -> Option<(&str, i64)> {
    let (hash, rest) = name.split_once('_')?;
    if hash.len() != CONTENT_HASH_HEX_LEN
        || !hash.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return None;
    }

    let (millis, _) = rest.split_once('_')?;
    if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((hash, millis.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_component("a.txt"), "a_txt");
        assert_eq!(sanitize_component("../../etc/passwd"), "______etc_passwd");
        assert_eq!(sanitize_component("my file (1).csv"), "my_file__1__csv");
        assert_eq!(sanitize_component("Data_2024-v2"), "Data_2024-v2");
    }

    #[test]
    fn test_sanitize_keeps_cjk_ideographs_only() {
        assert_eq!(sanitize_component("项目数据"), "项目数据");
        // Full-width punctuation and kana are outside the kept range
        assert_eq!(sanitize_component("数据，データ"), "数据____");
        assert_eq!(sanitize_component("é"), "_");
    }

    #[test]
    fn test_project_dir_name() {
        assert_eq!(project_dir_name("p1", None), "p1");
        assert_eq!(project_dir_name("p1", Some("")), "p1");
        assert_eq!(project_dir_name("p1", Some("Soil samples")), "p1-Soil_samples");
        assert_eq!(project_dir_name("p/1", None), "p_1");
        assert_eq!(project_dir_name("", None), "_");
    }

    #[test]
    fn test_object_name_parses_back() {
        let hash = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        let name = object_name(hash, 1_700_000_000_123, "a.txt");

        assert_eq!(name, format!("{hash}_1700000000123_a_txt"));
        assert_eq!(parse_object_name(&name), Some((hash, 1_700_000_000_123)));
    }

    #[test]
    fn test_object_name_truncates_long_names() {
        let hash = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        let name = object_name(hash, 1_700_000_000_123, &"a".repeat(200));

        assert_eq!(name.len(), MAX_OBJECT_NAME_BYTES);
        assert!(name.starts_with(&format!("{hash}_1700000000123_aaa")));
        assert_eq!(parse_object_name(&name), Some((hash, 1_700_000_000_123)));
    }

    #[test]
    fn test_object_name_truncates_cjk_on_char_boundary() {
        let hash = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        let name = object_name(hash, 1_700_000_000_123, &"数据".repeat(100));

        assert!(name.len() <= MAX_OBJECT_NAME_BYTES);
        // 255 - 79 = 176 bytes of budget holds 58 three-byte ideographs
        let tail = name.rsplit_once('_').map(|(_, t)| t).unwrap_or_default();
        assert_eq!(tail.chars().count(), 58);
        assert!(tail.chars().all(|c| c == '数' || c == '据'));
    }

    #[test]
    fn test_short_names_are_not_truncated() {
        let name = object_name(&"b".repeat(64), 5, "项目.csv");
        assert!(name.ends_with("_5_项目_csv"));
    }

    #[test]
    fn test_parse_object_name_rejects_foreign_files() {
        assert_eq!(parse_object_name(".staging-abc123"), None);
        assert_eq!(parse_object_name("notes.txt"), None);
        assert_eq!(parse_object_name(&format!("{}_12_a", "A".repeat(64))), None);
        assert_eq!(parse_object_name(&format!("{}_x_a", "a".repeat(64))), None);
        assert_eq!(parse_object_name(&format!("{}_12", "a".repeat(64))), None);
    }
}
