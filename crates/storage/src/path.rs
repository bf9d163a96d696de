//! Object key validation.
//!
//! Object stores treat keys as opaque strings, but the local and in-memory
//! buckets map them onto relative paths. Keys are normalised here so that a
//! key can never escape the bucket root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates an object key and normalises it into a relative path.
///
/// > **Note:** Null bytes are rejected; no other character filtering happens.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use glean_storage::validate_key;
/// assert!(validate_key("2024/holiday/IMG_0001.jpg").is_ok());
/// assert!(validate_key("../secrets.jpg").is_err());
/// assert!(validate_key("a\0b").is_err());
/// assert_eq!(validate_key("photos//./raw/../IMG_0002.jpg").unwrap(), Path::new("photos/IMG_0002.jpg"));
/// ```
pub fn validate(key: impl AsRef<Path>) -> Result<PathBuf> {
    let key = key.as_ref();
    let mut components = Vec::new();
    for component in key.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(key.to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(key.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(key.to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(key.to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Converts a validated relative path back into an object key.
///
/// Keys always use `/` as the separator, whatever the platform.
pub(crate) fn to_key(path: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => {
                parts.push(s.to_str().ok_or_else(|| exn::Exn::from(ErrorKind::InvalidPath(path.to_path_buf())))?)
            },
            _ => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
        }
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("IMG_0001.jpg", "IMG_0001.jpg")]
    #[case("2024/holiday/IMG_0001.jpg", "2024/holiday/IMG_0001.jpg")]
    #[case("2024//holiday/./IMG_0001.jpg", "2024/holiday/IMG_0001.jpg")]
    #[case("/leading/slash.jpg", "leading/slash.jpg")]
    #[case("raw/../IMG_0001.jpg", "IMG_0001.jpg")]
    #[case("trailing/", "trailing")]
    fn test_valid_keys(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(validate(key).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("../escape.jpg")]
    #[case("a/../../escape.jpg")]
    #[case("..")]
    #[case("a\0b.jpg")]
    #[case("")]
    #[case(".")]
    #[case("//")]
    fn test_invalid_keys(#[case] key: &str) {
        let err = validate(key).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[test]
    fn test_to_key_uses_forward_slashes() {
        let path = validate("2024/holiday/IMG_0001.jpg").unwrap();
        assert_eq!(to_key(&path).unwrap(), "2024/holiday/IMG_0001.jpg");
    }
}
