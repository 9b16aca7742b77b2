//! Validation of logical project paths.

use crate::error::{BuildError, Result};

/// Splits a slash-delimited project path into its segments.
///
/// Paths are relative (`src/App.tsx`). Empty paths, empty segments
/// (`a//b`, `/a`, `a/`), `.` and `..` segments, and NUL bytes are rejected
/// with [`BuildError::InvalidPath`].
pub fn segments(path: &str) -> Result<Vec<&str>> {
    if path.is_empty() {
        return Err(BuildError::invalid_path(path).with_reason("path is empty"));
    }
    if path.contains('\0') {
        return Err(BuildError::invalid_path(path).with_reason("path contains a NUL byte"));
    }

    path.split('/')
        .map(|segment| match segment {
            "" => Err(BuildError::invalid_path(path).with_reason("path has an empty segment")),
            "." | ".." => Err(BuildError::invalid_path(path)
                .with_reason(format!("path segment '{segment}' is not allowed"))),
            _ => Ok(segment),
        })
        .collect()
}

/// Node path for a relative path: `src/App.tsx` becomes `/src/App.tsx`.
pub fn node_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert_eq!(segments("src/App.tsx").unwrap(), vec!["src", "App.tsx"]);
        assert_eq!(segments("README.md").unwrap(), vec!["README.md"]);
        assert_eq!(segments(".env").unwrap(), vec![".env"]);
    }

    #[test]
    fn test_rejected_paths() {
        for bad in ["", "a//b", "/a", "a/", "../etc/passwd", "a/./b", "a\0b"] {
            let err = segments(bad).unwrap_err();
            assert!(
                matches!(err, BuildError::InvalidPath { .. }),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_node_path() {
        assert_eq!(node_path("src/App.tsx"), "/src/App.tsx");
        assert_eq!(node_path("/src"), "/src");
    }
}
