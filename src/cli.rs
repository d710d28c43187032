use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ghsumm::problem::PROBLEM_NAME;
use ghsumm::{generate_samples, DataError, DatasetSplit, GithubIssueProblem, Registry, Sample};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "ghsumm")]
#[command(about = "GitHub issue title/body dataset for seq2seq training", long_about = None)]
struct Cli {
    /// Registered problem to operate on
    #[arg(long, global = true, default_value = PROBLEM_NAME)]
    problem: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the problem's vocabulary and split declaration as JSON
    Info,
    /// List registered problems
    List,
    /// Write samples as JSON lines
    Generate {
        /// Dataset root (accepted for compatibility, unused)
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,
        /// Scratch directory (accepted for compatibility, unused)
        #[arg(long, default_value = "/tmp")]
        tmp_dir: PathBuf,
        /// Split being generated; every split gets the same stream
        #[arg(long, value_enum, default_value_t = DatasetSplit::Train)]
        split: DatasetSplit,
        /// Override the issue CSV location
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Override the sample cap
        #[arg(long)]
        max_samples: Option<usize>,
        /// Output file (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let registry = Registry::with_defaults();

    match cli.command {
        Commands::List => {
            for name in registry.names() {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Info => {
            let problem = registry.problem(&cli.problem)?;
            let info = problem.info(&cli.problem);
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
        Commands::Generate {
            data_dir,
            tmp_dir,
            split,
            csv,
            max_samples,
            output,
        } => {
            let problem = resolve_problem(&registry, &cli.problem, csv, max_samples)?;

            let writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(
                    File::create(path)
                        .with_context(|| format!("failed to create {}", path.display()))?,
                ),
                None => Box::new(io::stdout().lock()),
            };

            let samples = generate_samples(&problem, &data_dir, &tmp_dir, split)?;
            let written = write_jsonl(samples, &problem.csv_path, writer)?;

            info!(written, "done");
            Ok(())
        }
    }
}

/// Looks up `name` and applies the `--csv` / `--max-samples` overrides.
fn resolve_problem(
    registry: &Registry,
    name: &str,
    csv: Option<PathBuf>,
    max_samples: Option<usize>,
) -> Result<GithubIssueProblem> {
    let mut problem = registry.problem(name)?.clone();
    if let Some(csv) = csv {
        problem.csv_path = csv;
    }
    if let Some(max_samples) = max_samples {
        problem.max_samples = max_samples;
    }
    Ok(problem)
}

/// Writes one JSON object per sample and line. Returns the number written.
fn write_jsonl<I, W>(samples: I, source: &Path, writer: W) -> Result<usize>
where
    I: IntoIterator<Item = std::result::Result<Sample, DataError>>,
    W: Write,
{
    let mut writer = BufWriter::new(writer);
    let mut written = 0usize;
    for sample in samples {
        let sample = sample
            .with_context(|| format!("reading {} after {written} samples", source.display()))?;
        serde_json::to_writer(&mut writer, &sample)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghsumm::Samples;

    fn lines(out: &[u8]) -> Vec<Sample> {
        std::str::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn one_json_object_per_line() {
        let csv = "1,Fix bug,\"Crashes\non startup\"\n2,Docs,Typo in README\n";
        let mut out = Vec::new();
        let written = write_jsonl(
            Samples::from_reader(csv.as_bytes(), 10),
            Path::new("issues.csv"),
            &mut out,
        )
        .unwrap();

        assert_eq!(written, 2);
        let text = String::from_utf8(out.clone()).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            r#"{"inputs":"Crashes\non startup","targets":"Fix bug"}"#
        );
        assert!(text.ends_with('\n'));
        assert_eq!(
            lines(&out),
            vec![
                Sample {
                    inputs: "Crashes\non startup".to_string(),
                    targets: "Fix bug".to_string(),
                },
                Sample {
                    inputs: "Typo in README".to_string(),
                    targets: "Docs".to_string(),
                },
            ]
        );
    }

    #[test]
    fn short_row_stops_the_writer() {
        let csv = "1,a,b\n2,c,d\n3,only title\n4,e,f\n";
        let mut out = Vec::new();
        let err = write_jsonl(
            Samples::from_reader(csv.as_bytes(), 10),
            Path::new("issues.csv"),
            &mut out,
        )
        .unwrap_err();

        assert!(err.to_string().contains("after 2 samples"));
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::ShortRow { line: 3, fields: 2 })
        ));
        // rows before the bad one still reach the sink
        assert_eq!(lines(&out).len(), 2);
    }

    #[test]
    fn empty_source_writes_nothing() {
        let mut out = Vec::new();
        let written =
            write_jsonl(Samples::from_reader(&b""[..], 10), Path::new("x.csv"), &mut out).unwrap();
        assert_eq!(written, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn overrides_replace_source_and_cap() {
        let registry = Registry::with_defaults();
        let problem = resolve_problem(
            &registry,
            PROBLEM_NAME,
            Some(PathBuf::from("gh_data/small.csv")),
            Some(25),
        )
        .unwrap();
        assert_eq!(problem.csv_path, PathBuf::from("gh_data/small.csv"));
        assert_eq!(problem.max_samples, 25);
    }

    #[test]
    fn no_overrides_keep_defaults() {
        let registry = Registry::with_defaults();
        let problem = resolve_problem(&registry, PROBLEM_NAME, None, None).unwrap();
        assert_eq!(problem, GithubIssueProblem::default());
    }

    #[test]
    fn unknown_problem_is_an_error() {
        let registry = Registry::with_defaults();
        assert!(resolve_problem(&registry, "translate_ende", None, None).is_err());
    }

    #[test]
    fn generate_flags_parse() {
        let cli = Cli::try_parse_from([
            "ghsumm",
            "generate",
            "--split",
            "eval",
            "--csv",
            "issues.csv.gz",
            "--max-samples",
            "100",
        ])
        .unwrap();
        assert_eq!(cli.problem, PROBLEM_NAME);
        match cli.command {
            Commands::Generate {
                split,
                csv,
                max_samples,
                output,
                ..
            } => {
                assert_eq!(split, DatasetSplit::Eval);
                assert_eq!(csv, Some(PathBuf::from("issues.csv.gz")));
                assert_eq!(max_samples, Some(100));
                assert_eq!(output, None);
            }
            _ => panic!("expected generate"),
        }
    }
}
