//! Configuration lifecycle: load file config, merge CLI, build engine settings.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use uuid2asset_core::default_extensions;
use uuid2asset_core::download::{
    DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_CONCURRENCY, DEFAULT_PROGRESS_INTERVAL, DEFAULT_RETRY_DELAY,
    EngineConfig, RetryPolicy,
};

use crate::app_config::{FileConfig, load_default_file_config};
use crate::cli::Args;

/// Effective settings for one invocation.
#[derive(Debug, Clone)]
pub(crate) struct RunSettings {
    pub(crate) engine: EngineConfig,
    pub(crate) extensions: Vec<String>,
    pub(crate) output_dir: PathBuf,
}

/// Loads the default config file and merges it under the CLI flags.
pub(crate) fn resolve_config(args: &Args) -> Result<RunSettings> {
    let loaded = load_default_file_config()?;
    if let (Some(path), Some(_)) = (&loaded.path, &loaded.config) {
        tracing::debug!(path = %path.display(), "loaded config file");
    }
    merge_settings(args, loaded.config.as_ref())
}

/// Precedence: CLI flag, then config file, then built-in default.
pub(crate) fn merge_settings(args: &Args, file: Option<&FileConfig>) -> Result<RunSettings> {
    let file = file.cloned().unwrap_or_default();

    let concurrency = args
        .concurrency
        .or(file.concurrency)
        .map_or(DEFAULT_CONCURRENCY, usize::from);
    let attempt_timeout = args
        .timeout
        .or(file.timeout_secs)
        .map_or(DEFAULT_ATTEMPT_TIMEOUT, Duration::from_secs);
    let retry_delay = args
        .retry_delay
        .or(file.retry_delay_secs)
        .map_or(DEFAULT_RETRY_DELAY, Duration::from_secs);
    let max_attempts = args.max_attempts.or(file.max_attempts).unwrap_or(0);

    let extensions = match args.extensions.clone().or(file.extensions) {
        Some(raw) => normalize_extensions(&raw)?,
        None => default_extensions(),
    };

    let output_dir = args
        .output_dir
        .clone()
        .or(file.output_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(RunSettings {
        engine: EngineConfig {
            concurrency,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            retry_policy: RetryPolicy::new(attempt_timeout, retry_delay)
                .with_max_attempts(max_attempts),
        },
        extensions,
        output_dir,
    })
}

/// Trims entries, adds a missing leading dot and drops duplicates.
fn normalize_extensions(raw: &[String]) -> Result<Vec<String>> {
    let mut extensions: Vec<String> = Vec::with_capacity(raw.len());
    for ext in raw.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        let ext = if ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{ext}")
        };
        if !extensions.contains(&ext) {
            extensions.push(ext);
        }
    }
    if extensions.is_empty() {
        bail!("No usable extensions given.\n  Suggestion: pass e.g. --extensions .png,.json");
    }
    Ok(extensions)
}

/// Default log level from verbosity flags (used when `RUST_LOG` is unset).
pub(crate) fn resolve_default_log_level(args: &Args) -> &'static str {
    if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["uuid2asset"];
        argv.extend_from_slice(extra);
        argv.extend_from_slice(&["http://h", "m.json"]);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_merge_defaults_without_file() {
        let settings = merge_settings(&args(&[]), None).unwrap();
        assert_eq!(settings.engine.concurrency, 400);
        assert_eq!(settings.engine.progress_interval, 50);
        assert_eq!(settings.engine.retry_policy, RetryPolicy::default());
        assert_eq!(settings.extensions, default_extensions());
        assert_eq!(settings.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_file_values_apply_when_flags_absent() {
        let file = FileConfig {
            concurrency: Some(32),
            timeout_secs: Some(12),
            retry_delay_secs: Some(1),
            max_attempts: Some(4),
            output_dir: Some(PathBuf::from("bundles")),
            extensions: Some(vec!["png".to_string()]),
        };
        let settings = merge_settings(&args(&[]), Some(&file)).unwrap();
        assert_eq!(settings.engine.concurrency, 32);
        let policy = &settings.engine.retry_policy;
        assert_eq!(policy.attempt_timeout(), Duration::from_secs(12));
        assert_eq!(policy.retry_delay(), Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), Some(4));
        assert_eq!(settings.extensions, vec![".png".to_string()]);
        assert_eq!(settings.output_dir, PathBuf::from("bundles"));
    }

    #[test]
    fn test_cli_flags_override_file_values() {
        let file = FileConfig {
            concurrency: Some(32),
            max_attempts: Some(4),
            output_dir: Some(PathBuf::from("bundles")),
            ..FileConfig::default()
        };
        let settings = merge_settings(
            &args(&["-c", "8", "--max-attempts", "0", "-o", "cli-out"]),
            Some(&file),
        )
        .unwrap();
        assert_eq!(settings.engine.concurrency, 8);
        assert_eq!(settings.engine.retry_policy.max_attempts(), None);
        assert_eq!(settings.output_dir, PathBuf::from("cli-out"));
    }

    #[test]
    fn test_extensions_are_normalized() {
        let settings = merge_settings(&args(&["-e", " png,.json,,png "]), None).unwrap();
        assert_eq!(settings.extensions, vec![".png".to_string(), ".json".to_string()]);
    }

    #[test]
    fn test_blank_extensions_rejected() {
        let err = merge_settings(&args(&["-e", ","]), None).unwrap_err();
        assert!(err.to_string().contains("extensions"));
    }

    #[test]
    fn test_default_log_level() {
        assert_eq!(resolve_default_log_level(&args(&[])), "info");
        assert_eq!(resolve_default_log_level(&args(&["-v"])), "debug");
        assert_eq!(resolve_default_log_level(&args(&["-vvv"])), "trace");
        assert_eq!(resolve_default_log_level(&args(&["-q", "-v"])), "error");
    }
}
