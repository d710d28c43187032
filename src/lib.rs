//! GitHub issue summarization dataset: (body, title) pairs streamed from a
//! CSV dump, plus the vocabulary and split parameters a seq2seq trainer needs.

pub mod data;
pub mod error;
pub mod problem;
pub mod registry;

pub use data::{Sample, Samples};
pub use error::{DataError, RegistryError};
pub use problem::{generate_samples, DatasetSplit, GithubIssueProblem, SplitSpec};
pub use registry::Registry;
