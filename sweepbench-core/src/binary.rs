//! Benchmark Executable Identity

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// The native executable a benchmark drives.
///
/// The name is mandatory: constructing a binary without one fails immediately
/// instead of surfacing later as a broken command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkBinary {
    benchmark: String,
    name: String,
    bin_dir: PathBuf,
}

impl BenchmarkBinary {
    /// Create a binary identity for `benchmark`, located in `bin_dir`.
    pub fn new(
        benchmark: impl Into<String>,
        name: impl Into<String>,
        bin_dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let benchmark = benchmark.into();
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigError::BinaryNameNotSet { benchmark });
        }
        Ok(Self {
            benchmark,
            name,
            bin_dir: bin_dir.into(),
        })
    }

    /// Benchmark this binary belongs to
    pub fn benchmark(&self) -> &str {
        &self.benchmark
    }

    /// Executable file name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding the executable
    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Full path to the executable
    pub fn path(&self) -> PathBuf {
        self.bin_dir.join(&self.name)
    }
}
