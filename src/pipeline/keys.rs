use uuid::Uuid;

pub const DEFAULT_SEGMENT: &str = "image";
pub const MAX_SEGMENT_LEN: usize = 50;

/// Reduces a free-text label to a key-safe segment: ASCII letters, digits,
/// `-`, `_` and spaces are kept, spaces become `_`, the result is capped at
/// [`MAX_SEGMENT_LEN`] characters and never empty.
pub fn sanitize_label(label: &str) -> String {
    let segment: String = label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' '))
        .map(|c| if c == ' ' { '_' } else { c })
        .take(MAX_SEGMENT_LEN)
        .collect();

    if segment.is_empty() {
        DEFAULT_SEGMENT.to_string()
    } else {
        segment
    }
}

/// Eight lowercase hex characters.
pub fn random_suffix() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// `{prefix}/{segment}_{suffix}.{extension}`
pub fn object_key(prefix: &str, label: &str, extension: &str) -> String {
    join_key(
        prefix,
        &format!("{}_{}.{}", sanitize_label(label), random_suffix(), extension),
    )
}

/// `{prefix}/{segment}_{hint}.{extension}`: the caller's hint takes the place
/// of the random suffix. Any extension on the hint is replaced. A hint with no
/// usable characters falls back to [`object_key`].
pub fn hinted_key(prefix: &str, label: &str, hint: &str, extension: &str) -> String {
    let hint = sanitize_hint(hint);
    if hint.is_empty() {
        return object_key(prefix, label, extension);
    }
    join_key(
        prefix,
        &format!("{}_{}.{}", sanitize_label(label), hint, extension),
    )
}

fn sanitize_hint(hint: &str) -> String {
    let hint = hint.trim().trim_matches('/');
    let stem = match hint.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.contains('/') => stem,
        _ => hint,
    };
    stem.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' '))
        .map(|c| if c == ' ' { '_' } else { c })
        .take(MAX_SEGMENT_LEN)
        .collect()
}

fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sanitize_strips_and_collapses() {
        assert_eq!(sanitize_label("A/b*c  d"), "Abc__d");
        assert_eq!(sanitize_label("red-test_image 1"), "red-test_image_1");
    }

    #[test]
    fn test_sanitize_falls_back_to_default() {
        assert_eq!(sanitize_label(""), "image");
        assert_eq!(sanitize_label("红色测试图片"), "image");
        assert_eq!(sanitize_label("*/?"), "image");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(80);
        assert_eq!(sanitize_label(&long).len(), MAX_SEGMENT_LEN);
        let mixed = format!("{}{}", "é".repeat(10), "y".repeat(60));
        assert_eq!(sanitize_label(&mixed), "y".repeat(50));
    }

    #[test]
    fn test_object_key_shape() {
        let key = object_key("jimeng/batch/", "sunset beach", "png");
        let name = key.strip_prefix("jimeng/batch/sunset_beach_").unwrap();
        let (suffix, ext) = name.split_once('.').unwrap();
        assert_eq!(ext, "png");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_keys_are_unique_for_same_label() {
        let keys: HashSet<String> = (0..500).map(|_| object_key("p", "same", "png")).collect();
        assert_eq!(keys.len(), 500);
    }

    #[test]
    fn test_hinted_key_keeps_label_and_replaces_extension() {
        assert_eq!(
            hinted_key("jimeng/batch", "cat", "/hero.png", "jpg"),
            "jimeng/batch/cat_hero.jpg"
        );
        assert_eq!(hinted_key("", "big dog", "v2 final", "png"), "big_dog_v2_final.png");
        assert_eq!(
            hinted_key("p", "cat", "covers/final.webp", "webp"),
            "p/cat_coversfinal.webp"
        );
    }

    #[test]
    fn test_blank_hint_falls_back_to_random_suffix() {
        let key = hinted_key("p", "cat", " *** ", "png");
        let name = key.strip_prefix("p/cat_").unwrap();
        assert_eq!(name.len(), "12345678.png".len());
    }
}
