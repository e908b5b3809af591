use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::config::schema::*;
use crate::error::ConfigError;
use crate::secrets::{has_secret_source, resolve_secret};

/// Maximum page size accepted by the mail provider.
const MAX_BATCH_SIZE: usize = 1000;

/// Loads settings from the process environment.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(|name| std::env::var(name).ok())
}

/// Loads settings through `lookup`, which maps a variable name to its value.
///
/// Every missing required variable is reported in a single error.
pub fn load_settings_from<F>(lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let mut missing = Vec::new();
    let mut require = |name: &str| {
        let value = get(name);
        if value.is_none() {
            missing.push(name.to_string());
        }
        value.unwrap_or_default()
    };

    let tenant_id = require("TENANT_ID");
    let client_id = require("CLIENT_ID");
    let mailbox_upn = require("MAILBOX_UPN");
    let printer_name = require("PRINTER_NAME");

    let secret_direct = lookup("CLIENT_SECRET");
    let secret_file = lookup("CLIENT_SECRET_FILE");
    if !has_secret_source(secret_direct.as_deref(), secret_file.as_deref()) {
        missing.push("CLIENT_SECRET".to_string());
    }

    if !missing.is_empty() {
        return Err(ConfigError::MissingSettings { names: missing });
    }

    let client_secret = resolve_secret(secret_direct.as_deref(), secret_file.as_deref())
        .map_err(|e| ConfigError::Secret {
            name: "CLIENT_SECRET".to_string(),
            source: e,
        })?;

    let mut settings = Settings::with_required(
        tenant_id,
        client_id,
        client_secret,
        mailbox_upn,
        printer_name,
    );

    if let Some(folder) = get("MAIL_FOLDER") {
        settings.mail_folder = folder;
    }
    settings.filter_sender = get("FILTER_SENDER");
    if let Some(folder) = get("PRINTED_FOLDER") {
        settings.printed_folder = folder;
    }
    settings.state_dir = state_dir_from(&lookup);
    settings.dry_run = get("DRY_RUN").is_some_and(|v| parse_flag(&v));
    if let Some(command) = get("PRINT_COMMAND") {
        settings.print_command = command;
    }
    if let Some(url) = get("GRAPH_BASE_URL") {
        settings.graph_base_url = url;
    }
    if let Some(url) = get("AUTHORITY_URL") {
        settings.authority_url = url;
    }

    settings.poll_interval = seconds(&get, "POLL_SECONDS", DEFAULT_POLL_SECONDS)?;
    settings.error_backoff =
        seconds(&get, "ERROR_BACKOFF_SECONDS", DEFAULT_ERROR_BACKOFF_SECONDS)?;
    settings.print_timeout =
        seconds(&get, "PRINT_TIMEOUT_SECONDS", DEFAULT_PRINT_TIMEOUT_SECONDS)?;
    settings.http_timeout = seconds(&get, "HTTP_TIMEOUT_SECONDS", DEFAULT_HTTP_TIMEOUT_SECONDS)?;

    let batch_size: usize = parse_or(&get, "BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
    if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::InvalidValue {
            name: "BATCH_SIZE".to_string(),
            reason: format!("must be between 1 and {}", MAX_BATCH_SIZE),
        });
    }
    settings.batch_size = batch_size;

    Ok(settings)
}

/// State directory from `STATE_DIR`, or the default.
pub fn state_dir_from<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup("STATE_DIR")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
}

/// `true`, `1` and `yes` (any case) enable a flag; anything else disables it.
fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_or<T, G>(get: &G, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("'{}': {}", raw, e),
        }),
    }
}

fn seconds<G>(get: &G, name: &str, default: u64) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_or(get, name, default)?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: "must be at least 1 second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("TENANT_ID", "tenant"),
        ("CLIENT_ID", "client"),
        ("CLIENT_SECRET", "secret"),
        ("MAILBOX_UPN", "orders@contoso.example"),
        ("PRINTER_NAME", "Office"),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend_from_slice(extra);
        pairs
    }

    #[test]
    fn test_defaults() {
        let settings = load_settings_from(env(REQUIRED)).unwrap();
        assert_eq!(settings.mail_folder, "PrintOrders");
        assert_eq!(settings.printed_folder, "Printed");
        assert_eq!(settings.filter_sender, None);
        assert_eq!(settings.poll_interval, Duration::from_secs(60));
        assert_eq!(settings.error_backoff, Duration::from_secs(10));
        assert_eq!(settings.batch_size, 10);
        assert_eq!(settings.state_dir, PathBuf::from("/var/lib/printbot"));
        assert_eq!(
            settings.state_db_path(),
            PathBuf::from("/var/lib/printbot/state.db")
        );
        assert!(!settings.dry_run);
        assert_eq!(settings.print_command, "lp");
        assert_eq!(settings.client_secret.expose_secret(), "secret");
    }

    #[test]
    fn test_all_missing_names_reported() {
        let err = load_settings_from(env(&[("TENANT_ID", "t"), ("PRINTER_NAME", "  ")])).unwrap_err();
        match err {
            ConfigError::MissingSettings { names } => assert_eq!(
                names,
                vec!["CLIENT_ID", "MAILBOX_UPN", "PRINTER_NAME", "CLIENT_SECRET"]
            ),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_message_lists_names() {
        let err = load_settings_from(env(&[])).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Missing required settings:"));
        assert!(message.contains("TENANT_ID"));
        assert!(!message.contains("FILTER_SENDER"));
    }

    #[test]
    fn test_secret_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_secret");
        std::fs::write(&path, "from-file\n").unwrap();
        let path = path.to_string_lossy().to_string();

        let pairs: Vec<(&str, &str)> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "CLIENT_SECRET")
            .chain(std::iter::once(("CLIENT_SECRET_FILE", path.as_str())))
            .collect();
        let settings = load_settings_from(env(&pairs)).unwrap();
        assert_eq!(settings.client_secret.expose_secret(), "from-file");
    }

    #[test]
    fn test_unreadable_secret_file() {
        let pairs: Vec<(&str, &str)> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "CLIENT_SECRET")
            .chain(std::iter::once(("CLIENT_SECRET_FILE", "/nonexistent/secret")))
            .collect();
        let err = load_settings_from(env(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Secret { .. }));
    }

    #[test]
    fn test_overrides() {
        let settings = load_settings_from(env(&with(&[
            ("MAIL_FOLDER", "Orders"),
            ("FILTER_SENDER", "shop@example.com"),
            ("PRINTED_FOLDER", "Done"),
            ("POLL_SECONDS", "15"),
            ("BATCH_SIZE", "25"),
            ("STATE_DIR", "/tmp/pb"),
            ("DRY_RUN", "YES"),
            ("PRINT_TIMEOUT_SECONDS", "5"),
        ])))
        .unwrap();

        assert_eq!(settings.mail_folder, "Orders");
        assert_eq!(settings.filter_sender.as_deref(), Some("shop@example.com"));
        assert_eq!(settings.printed_folder, "Done");
        assert_eq!(settings.poll_interval, Duration::from_secs(15));
        assert_eq!(settings.batch_size, 25);
        assert_eq!(settings.state_dir, PathBuf::from("/tmp/pb"));
        assert!(settings.dry_run);
        assert_eq!(settings.print_mode(), crate::print::PrintMode::DryRun);
        assert_eq!(settings.print_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_empty_sender_filter_is_none() {
        let settings = load_settings_from(env(&with(&[("FILTER_SENDER", " ")]))).unwrap();
        assert_eq!(settings.filter_sender, None);
    }

    #[test]
    fn test_dry_run_flag_values() {
        for (value, expected) in [("true", true), ("1", true), ("Yes", true), ("false", false), ("0", false), ("on", false)] {
            let settings = load_settings_from(env(&with(&[("DRY_RUN", value)]))).unwrap();
            assert_eq!(settings.dry_run, expected, "DRY_RUN={}", value);
        }
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let err = load_settings_from(env(&with(&[("POLL_SECONDS", "soon")]))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "POLL_SECONDS"));

        let err = load_settings_from(env(&with(&[("POLL_SECONDS", "0")]))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = load_settings_from(env(&with(&[("BATCH_SIZE", "0")]))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "BATCH_SIZE"));
    }

    #[test]
    fn test_state_dir_from() {
        assert_eq!(state_dir_from(env(&[])), PathBuf::from("/var/lib/printbot"));
        assert_eq!(
            state_dir_from(env(&[("STATE_DIR", "/srv/printbot")])),
            PathBuf::from("/srv/printbot")
        );
    }
}
