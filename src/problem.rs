use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::data::{open_source, Samples};
use crate::error::DataError;

/// Name the problem is registered under.
pub const PROBLEM_NAME: &str = "poetry_line_problem";
pub const APPROX_VOCAB_SIZE: usize = 1 << 13;
pub const MAX_SUBTOKEN_LENGTH: usize = 4;
pub const DEFAULT_CSV_PATH: &str = "gh_data/github_issues.csv";
pub const MAX_SAMPLES: usize = 1_500_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatasetSplit {
    Train,
    Eval,
}

impl fmt::Display for DatasetSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSplit::Train => f.write_str("train"),
            DatasetSplit::Eval => f.write_str("eval"),
        }
    }
}

/// A split and the number of output shards it is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitSpec {
    pub split: DatasetSplit,
    pub shards: usize,
}

/// Predict a GitHub issue title from its body.
///
/// The accessors are constants read by the training framework. `csv_path`
/// and `max_samples` only exist so the source can be pointed elsewhere; the
/// defaults are the real dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubIssueProblem {
    pub csv_path: PathBuf,
    pub max_samples: usize,
}

impl Default for GithubIssueProblem {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            max_samples: MAX_SAMPLES,
        }
    }
}

impl GithubIssueProblem {
    pub fn approx_vocab_size(&self) -> usize {
        APPROX_VOCAB_SIZE
    }

    /// The framework must not split the stream itself; `dataset_splits`
    /// decides how samples land in TRAIN and EVAL.
    pub fn is_generate_per_split(&self) -> bool {
        false
    }

    pub fn max_subtoken_length(&self) -> usize {
        MAX_SUBTOKEN_LENGTH
    }

    /// 90 train shards to 10 eval shards, i.e. 10% evaluation data.
    pub fn dataset_splits(&self) -> [SplitSpec; 2] {
        [
            SplitSpec {
                split: DatasetSplit::Train,
                shards: 90,
            },
            SplitSpec {
                split: DatasetSplit::Eval,
                shards: 10,
            },
        ]
    }

    pub fn info(&self, name: &str) -> ProblemInfo {
        ProblemInfo {
            name: name.to_owned(),
            approx_vocab_size: self.approx_vocab_size(),
            is_generate_per_split: self.is_generate_per_split(),
            max_subtoken_length: self.max_subtoken_length(),
            dataset_splits: self.dataset_splits().to_vec(),
            csv_path: self.csv_path.clone(),
            max_samples: self.max_samples,
        }
    }
}

/// Serializable snapshot of a problem's declaration.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemInfo {
    pub name: String,
    pub approx_vocab_size: usize,
    pub is_generate_per_split: bool,
    pub max_subtoken_length: usize,
    pub dataset_splits: Vec<SplitSpec>,
    pub csv_path: PathBuf,
    pub max_samples: usize,
}

/// Streams samples from the problem's CSV source.
///
/// `data_dir`, `tmp_dir` and `split` are part of the framework's calling
/// convention and do not affect the output: every split gets the same stream.
pub fn generate_samples(
    problem: &GithubIssueProblem,
    data_dir: &Path,
    tmp_dir: &Path,
    split: DatasetSplit,
) -> Result<Samples<Box<dyn Read + Send>>, DataError> {
    info!(
        csv = %problem.csv_path.display(),
        data_dir = %data_dir.display(),
        tmp_dir = %tmp_dir.display(),
        %split,
        max_samples = problem.max_samples,
        "generating samples"
    );
    let source = open_source(&problem.csv_path)?;
    Ok(Samples::from_reader(source, problem.max_samples))
}
