//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Rebuild asset bundles from a game server's content tree.
///
/// For every manifest, uuid2asset decodes the packed identifiers, probes the
/// server for each candidate file and writes `<name>-bundle.zip` with the
/// files that exist.
#[derive(Parser, Debug)]
#[command(name = "uuid2asset")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output and the progress bar
    #[arg(short, long)]
    pub quiet: bool,

    /// Maximum concurrent requests (1-4096) [default: 400]
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u16).range(1..=4096))]
    pub concurrency: Option<u16>,

    /// Per-attempt timeout in seconds (1-3600) [default: 30]
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Fixed delay between attempts in seconds (0-3600) [default: 5]
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(0..=3600))]
    pub retry_delay: Option<u64>,

    /// Give up on a file after this many attempts (0 retries forever) [default: 0]
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Comma-separated candidate extensions, replacing the built-in list
    #[arg(short = 'e', long, value_delimiter = ',', value_name = "EXT,...")]
    pub extensions: Option<Vec<String>>,

    /// Directory the bundle archives are written to [default: .]
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Asset root of the game server, e.g. https://example.com/game/v1
    #[arg(value_name = "SERVER_URL")]
    pub server_url: String,

    /// Bundle manifest files, processed in order
    #[arg(value_name = "MANIFEST", required = true, num_args = 1..)]
    pub manifests: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: [&str; 3] = ["uuid2asset", "https://cdn.test/game", "config.json"];

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        let mut argv: Vec<&str> = vec![BASE[0]];
        argv.extend_from_slice(extra);
        argv.extend_from_slice(&BASE[1..]);
        Args::try_parse_from(argv)
    }

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.concurrency, None);
        assert_eq!(args.timeout, None);
        assert_eq!(args.extensions, None);
        assert_eq!(args.server_url, "https://cdn.test/game");
        assert_eq!(args.manifests, vec![PathBuf::from("config.json")]);
    }

    #[test]
    fn test_cli_missing_positionals_is_usage_error() {
        let err = Args::try_parse_from(["uuid2asset"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let err = Args::try_parse_from(["uuid2asset", "https://cdn.test"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_multiple_manifests_keep_order() {
        let args =
            Args::try_parse_from(["uuid2asset", "http://h", "b.json", "a.json", "c.json"]).unwrap();
        let names: Vec<_> = args.manifests.iter().map(|p| p.to_string_lossy()).collect();
        assert_eq!(names, vec!["b.json", "a.json", "c.json"]);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        assert_eq!(parse(&["-v"]).unwrap().verbose, 1);
        assert_eq!(parse(&["-vv"]).unwrap().verbose, 2);
        assert_eq!(parse(&["--verbose", "--verbose"]).unwrap().verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        assert!(parse(&["-q"]).unwrap().quiet);
        assert!(parse(&["--quiet"]).unwrap().quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["uuid2asset", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["uuid2asset", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = parse(&["--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    // ==================== Concurrency Tests ====================

    #[test]
    fn test_cli_concurrency_short_and_long_flag() {
        assert_eq!(parse(&["-c", "5"]).unwrap().concurrency, Some(5));
        assert_eq!(parse(&["--concurrency", "20"]).unwrap().concurrency, Some(20));
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        assert_eq!(parse(&["-c", "1"]).unwrap().concurrency, Some(1));
        assert_eq!(parse(&["-c", "4096"]).unwrap().concurrency, Some(4096));

        for bad in ["0", "4097"] {
            let err = parse(&["-c", bad]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        }
    }

    // ==================== Retry Tests ====================

    #[test]
    fn test_cli_timeout_and_retry_delay() {
        let args = parse(&["--timeout", "10", "--retry-delay", "0"]).unwrap();
        assert_eq!(args.timeout, Some(10));
        assert_eq!(args.retry_delay, Some(0));
    }

    #[test]
    fn test_cli_timeout_zero_rejected() {
        let err = parse(&["--timeout", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_max_attempts() {
        assert_eq!(parse(&["--max-attempts", "3"]).unwrap().max_attempts, Some(3));
        assert_eq!(parse(&["--max-attempts", "0"]).unwrap().max_attempts, Some(0));
    }

    // ==================== Output Tests ====================

    #[test]
    fn test_cli_extensions_comma_separated() {
        let args = parse(&["-e", ".png,.json"]).unwrap();
        assert_eq!(
            args.extensions,
            Some(vec![".png".to_string(), ".json".to_string()])
        );
    }

    #[test]
    fn test_cli_output_dir() {
        let args = parse(&["-o", "out/bundles"]).unwrap();
        assert_eq!(args.output_dir, Some(PathBuf::from("out/bundles")));
    }

    #[test]
    fn test_cli_combined_all_flags() {
        let args = parse(&[
            "-v",
            "-c",
            "64",
            "--timeout",
            "15",
            "--retry-delay",
            "2",
            "--max-attempts",
            "10",
            "--extensions",
            ".bin",
            "--output-dir",
            "/tmp/out",
        ])
        .unwrap();
        assert_eq!(args.verbose, 1);
        assert_eq!(args.concurrency, Some(64));
        assert_eq!(args.timeout, Some(15));
        assert_eq!(args.retry_delay, Some(2));
        assert_eq!(args.max_attempts, Some(10));
        assert_eq!(args.extensions, Some(vec![".bin".to_string()]));
        assert_eq!(args.output_dir, Some(PathBuf::from("/tmp/out")));
    }
}
