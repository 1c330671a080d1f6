//! Configuration types for corpus-extract
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::corpus::CorpusFilter;
use crate::error::ConfigError;
use crate::pipeline::RecordModel;
use clap::Parser;
use regex::Regex;
use std::path::PathBuf;

/// Maximum reasonable worker count
pub const MAX_WORKERS: usize = 512;

/// Model used when no `--pattern` is given: numeric quantities with a unit
pub const DEFAULT_MODEL: &str =
    r"quantity=(?P<value>-?\d+(?:\.\d+)?)\s*(?P<unit>°C|K|nm|µm|mm|mg|g|kg|mL|L|mmol|mol|M|h|min|s|%)(?:\W|$)";

/// Parallel, resumable structured extraction over a document corpus
#[derive(Parser, Debug, Clone)]
#[command(
    name = "corpus-extract",
    version,
    about = "Parallel, resumable structured extraction over a document corpus",
    long_about = "Runs every document in a corpus directory through an extraction pipeline \
                  and writes one SQLite database of records per document.\n\n\
                  Documents whose output already exists are skipped, so an interrupted run \
                  can simply be restarted. A document that fails is logged and left without \
                  output; the rest of the run continues.",
    after_help = "EXAMPLES:\n    \
        corpus-extract papers/ -o extracted\n    \
        corpus-extract papers/ -w 16 --cache-dir .parsed\n    \
        corpus-extract papers/ --pattern 'temp=(?P<value>\\d+)\\s*°C' --exclude '\\.pdf$'\n    \
        corpus-extract papers/ -n 100 -w 1 -v"
)]
pub struct CliArgs {
    /// Directory containing the documents to extract
    #[arg(value_name = "CORPUS_DIR")]
    pub corpus_dir: PathBuf,

    /// Output directory (one <name>.db per document)
    #[arg(short, long, default_value = "extracted", value_name = "DIR")]
    pub output: PathBuf,

    /// Directory for cached parsed documents
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Number of worker threads (1 runs sequentially)
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Process at most this many pending documents
    #[arg(short = 'n', long, value_name = "NUM")]
    pub limit: Option<usize>,

    /// Ignore corpus files matching pattern (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Record model as NAME=REGEX; named groups become fields (can be repeated)
    #[arg(long = "pattern", value_name = "NAME=REGEX", action = clap::ArgAction::Append)]
    pub patterns: Vec<String>,

    /// Reject documents with fewer characters of text than this
    #[arg(long, value_name = "CHARS")]
    pub min_chars: Option<usize>,

    /// Drop duplicate records within a document before writing
    #[arg(long)]
    pub dedupe: bool,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (per-document debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_workers() -> usize {
    num_cpus::get()
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Corpus directory
    pub corpus_dir: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Parsed-document cache directory
    pub cache_dir: Option<PathBuf>,

    /// Number of execution units
    pub worker_count: usize,

    /// Cap on pending documents
    pub limit: Option<usize>,

    /// Compiled exclude patterns
    pub exclude_patterns: Vec<Regex>,

    /// Record models for the built-in pipeline
    pub models: Vec<RecordModel>,

    /// Minimum document text length
    pub min_chars: Option<usize>,

    /// Drop duplicate records
    pub dedupe: bool,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl ExtractConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if !args.corpus_dir.is_dir() {
            let reason = if args.corpus_dir.exists() {
                "not a directory"
            } else {
                "does not exist"
            };
            return Err(ConfigError::InvalidCorpusDir {
                path: args.corpus_dir,
                reason: reason.into(),
            });
        }

        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        if let Some(limit) = args.limit {
            if limit == 0 {
                return Err(ConfigError::InvalidLimit { limit });
            }
        }

        // Output directory is created on demand, but its parent must exist
        if let Some(parent) = args.output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(ConfigError::InvalidOutputPath {
                    path: args.output,
                    reason: "parent directory does not exist".into(),
                });
            }
        }
        if args.output.is_file() {
            return Err(ConfigError::InvalidOutputPath {
                path: args.output,
                reason: "is a file, expected a directory".into(),
            });
        }

        let exclude_patterns = args
            .exclude_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::InvalidExcludePattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let models = if args.patterns.is_empty() {
            vec![RecordModel::parse(DEFAULT_MODEL)?]
        } else {
            args.patterns
                .iter()
                .map(|spec| RecordModel::parse(spec))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            corpus_dir: args.corpus_dir,
            output_dir: args.output,
            cache_dir: args.cache_dir,
            worker_count: args.workers,
            limit: args.limit,
            exclude_patterns,
            models,
            min_chars: args.min_chars,
            dedupe: args.dedupe,
            show_progress: !args.quiet,
            verbose: args.verbose,
        })
    }

    /// Filter for files in the corpus directory that are never documents
    pub fn corpus_filter(&self) -> CorpusFilter {
        CorpusFilter::new(self.exclude_patterns.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(corpus: &std::path::Path) -> CliArgs {
        CliArgs::parse_from(["corpus-extract", corpus.to_str().unwrap()])
    }

    #[test]
    fn test_defaults() {
        let dir = tempdir().unwrap();
        let config = ExtractConfig::from_args(args(dir.path())).unwrap();

        assert_eq!(config.output_dir, PathBuf::from("extracted"));
        assert_eq!(config.worker_count, num_cpus::get());
        assert!(config.show_progress);
        assert_eq!(config.models.len(), 1);
        assert_eq!(config.models[0].name, "quantity");
    }

    #[test]
    fn test_repeated_flags() {
        let dir = tempdir().unwrap();
        let corpus = dir.path().to_str().unwrap();
        let cli = CliArgs::parse_from([
            "corpus-extract",
            corpus,
            "-w",
            "4",
            "-n",
            "10",
            "--exclude",
            r"\.pdf$",
            "--exclude",
            "draft",
            "--pattern",
            r"year=(?P<year>\d{4})",
            "--pattern",
            r"doi=10\.\d+/\S+",
            "-q",
        ]);
        let config = ExtractConfig::from_args(cli).unwrap();

        assert_eq!(config.worker_count, 4);
        assert_eq!(config.limit, Some(10));
        assert_eq!(config.exclude_patterns.len(), 2);
        assert_eq!(config.models.len(), 2);
        assert!(!config.show_progress);
        assert!(config.corpus_filter().is_auxiliary("paper.pdf"));
    }

    #[test]
    fn test_invalid_worker_count() {
        let dir = tempdir().unwrap();
        let mut cli = args(dir.path());

        cli.workers = 0;
        assert!(matches!(
            ExtractConfig::from_args(cli.clone()),
            Err(ConfigError::InvalidWorkerCount { count: 0, .. })
        ));

        cli.workers = MAX_WORKERS + 1;
        assert!(matches!(
            ExtractConfig::from_args(cli),
            Err(ConfigError::InvalidWorkerCount { .. })
        ));
    }

    #[test]
    fn test_invalid_limit() {
        let dir = tempdir().unwrap();
        let mut cli = args(dir.path());
        cli.limit = Some(0);
        assert!(matches!(
            ExtractConfig::from_args(cli),
            Err(ConfigError::InvalidLimit { limit: 0 })
        ));
    }

    #[test]
    fn test_missing_corpus() {
        let cli = CliArgs::parse_from(["corpus-extract", "/no/such/corpus"]);
        assert!(matches!(
            ExtractConfig::from_args(cli),
            Err(ConfigError::InvalidCorpusDir { .. })
        ));
    }

    #[test]
    fn test_bad_patterns() {
        let dir = tempdir().unwrap();

        let mut cli = args(dir.path());
        cli.exclude_patterns = vec!["(unclosed".into()];
        assert!(matches!(
            ExtractConfig::from_args(cli),
            Err(ConfigError::InvalidExcludePattern { .. })
        ));

        let mut cli = args(dir.path());
        cli.patterns = vec!["no-equals-sign".into()];
        assert!(matches!(
            ExtractConfig::from_args(cli),
            Err(ConfigError::InvalidModel { .. })
        ));
    }

    #[test]
    fn test_output_parent_must_exist() {
        let dir = tempdir().unwrap();
        let mut cli = args(dir.path());
        cli.output = dir.path().join("missing").join("out");
        assert!(matches!(
            ExtractConfig::from_args(cli),
            Err(ConfigError::InvalidOutputPath { .. })
        ));
    }
}
