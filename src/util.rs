use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const STORE_HASH_LEN: usize = 32;

/// Strips a `<32-char hash>-` prefix from a store path, returning the name part.
///
/// The hash may appear anywhere in the id (e.g. after `/nix/store/`); the
/// leftmost match wins. Ids without such a prefix are returned unchanged.
pub fn display_name(id: &str) -> &str {
    let bytes = id.as_bytes();
    if bytes.len() < STORE_HASH_LEN + 2 {
        return id;
    }

    for start in 0..=(bytes.len() - STORE_HASH_LEN - 2) {
        let hash = &bytes[start..start + STORE_HASH_LEN];
        let is_hash = hash
            .iter()
            .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit());
        if is_hash && bytes[start + STORE_HASH_LEN] == b'-' {
            return &id[start + STORE_HASH_LEN + 1..];
        }
    }

    id
}

pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::bare("0123456789abcdefghijklmnopqrstuv-hello-2.12.drv", "hello-2.12.drv")]
    #[case::store_path(
        "/nix/store/0123456789abcdefghijklmnopqrstuv-bash-5.2.sh",
        "bash-5.2.sh"
    )]
    #[case::no_hash("hello.drv", "hello.drv")]
    #[case::uppercase_hash("0123456789ABCDEFGHIJKLMNOPQRSTUV-hello", "0123456789ABCDEFGHIJKLMNOPQRSTUV-hello")]
    #[case::short_hash("0123456789abcdef-hello", "0123456789abcdef-hello")]
    #[case::nothing_after_dash("0123456789abcdefghijklmnopqrstuv-", "0123456789abcdefghijklmnopqrstuv-")]
    #[case::empty("", "")]
    fn display_name_strips_hash_prefix(#[case] id: &str, #[case] expected: &str) {
        assert_eq!(display_name(id), expected);
    }

    #[test]
    fn display_name_handles_multibyte_ids() {
        assert_eq!(display_name("påth-ü"), "påth-ü");
    }

    #[test]
    fn stable_pair_is_deterministic_and_bounded() {
        let (x, y) = stable_pair("a");
        assert_eq!((x, y), stable_pair("a"));
        assert!((-1.0..=1.0).contains(&x));
        assert!((-1.0..=1.0).contains(&y));
    }
}
