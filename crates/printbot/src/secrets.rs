//! Client secret resolution.
//!
//! The application secret can be supplied in two ways, checked in order:
//!
//! 1. **Direct value** - `CLIENT_SECRET`, convenient for local runs
//! 2. **File reference** - `CLIENT_SECRET_FILE`, for the Docker/systemd secrets pattern

use secrecy::SecretString;
use std::fs;
use std::path::PathBuf;

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need a direct value or a file path)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{}': {source}", .path.display())]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Secret file '{}' is empty", .path.display())]
    EmptyFile { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from a direct value, else from the contents of a file.
///
/// Empty strings count as absent. File contents are trimmed so a trailing
/// newline written by `echo` does not end up in the credential.
pub fn resolve_secret(direct: Option<&str>, file_path: Option<&str>) -> Result<SecretString> {
    if let Some(value) = direct.map(str::trim).filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let expanded = expand_home(path);
        let content = fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
            path: expanded.clone(),
            source: e,
        })?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(SecretError::EmptyFile { path: expanded });
        }
        return Ok(SecretString::from(trimmed.to_string()));
    }

    Err(SecretError::NoSourceProvided)
}

/// True when at least one non-empty source is configured.
pub fn has_secret_source(direct: Option<&str>, file_path: Option<&str>) -> bool {
    direct.is_some_and(|s| !s.trim().is_empty()) || file_path.is_some_and(|s| !s.is_empty())
}

/// Expands a leading `~` to the home directory. `~user/...` is left alone.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_direct_value_takes_priority() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "from-file").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let secret = resolve_secret(Some("direct"), Some(&path)).unwrap();
        assert_eq!(secret.expose_secret(), "direct");
    }

    #[test]
    fn test_file_content_trimmed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  s3cr3t  ").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let secret = resolve_secret(None, Some(&path)).unwrap();
        assert_eq!(secret.expose_secret(), "s3cr3t");
    }

    #[test]
    fn test_empty_direct_value_falls_through_to_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "from-file").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let secret = resolve_secret(Some("  "), Some(&path)).unwrap();
        assert_eq!(secret.expose_secret(), "from-file");
    }

    #[test]
    fn test_no_source_error() {
        assert!(matches!(
            resolve_secret(None, None),
            Err(SecretError::NoSourceProvided)
        ));
        assert!(matches!(
            resolve_secret(Some(""), Some("")),
            Err(SecretError::NoSourceProvided)
        ));
    }

    #[test]
    fn test_file_not_found_error() {
        let result = resolve_secret(None, Some("/nonexistent/printbot/secret"));
        assert!(matches!(result, Err(SecretError::FileReadError { .. })));
    }

    #[test]
    fn test_empty_file_error() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();
        assert!(matches!(
            resolve_secret(None, Some(&path)),
            Err(SecretError::EmptyFile { .. })
        ));
    }

    #[test]
    fn test_has_secret_source() {
        assert!(has_secret_source(Some("x"), None));
        assert!(has_secret_source(None, Some("/run/secrets/client")));
        assert!(!has_secret_source(Some(" "), Some("")));
        assert!(!has_secret_source(None, None));
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/run/secrets/x"), PathBuf::from("/run/secrets/x"));
        assert_eq!(expand_home("~alice/x"), PathBuf::from("~alice/x"));
    }
}
