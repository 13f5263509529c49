use crate::SinkError;

/// Checks that an object path is a relative, `/`-separated name that stays
/// inside the sink's root on every platform.
///
/// Each segment must be non-empty, must not be `..`, and must not contain
/// a backslash or a colon, so Windows drive letters (`C:`) and UNC shares
/// (`\\server\share`) are refused even when running elsewhere.
pub fn validate_object_path(object_path: &str) -> Result<(), SinkError> {
    let invalid = |reason: &str| SinkError::InvalidPath(format!("{reason}: {object_path:?}"));

    if object_path.is_empty() {
        return Err(SinkError::InvalidPath("empty path".into()));
    }
    if object_path.starts_with('/') {
        return Err(invalid("absolute path not allowed"));
    }

    for segment in object_path.split('/') {
        match segment {
            "" => return Err(invalid("empty path segment")),
            ".." => return Err(invalid("parent directory traversal not allowed")),
            s if s.contains('\\') => return Err(invalid("backslash not allowed")),
            s if s.contains(':') => return Err(invalid("drive or stream prefix not allowed")),
            _ => {}
        }
    }

    Ok(())
}
