use nanorand::{WyRand, RNG};
use std::{
    fs, io,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{DatasetPreparer, PrepareError};

/// Subdirectories of `dir`, in lexicographic order of their names.
///
/// Anything that is not a directory is skipped.
pub fn sorted_chunks(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(entries
        .into_iter()
        .filter(|path| {
            let is_dir = path.is_dir();
            if !is_dir {
                debug!(path = %path.display(), "skipping non-directory item");
            }
            is_dir
        })
        .collect())
}

/// Runs an external preparation program with `--seed N` appended.
pub struct CommandPreparer {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandPreparer {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        CommandPreparer {
            program: program.into(),
            args,
        }
    }

    /// Splits a shell-like `"python prep.py --flag"` line on whitespace.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(CommandPreparer::new(program, parts.collect()))
    }

    fn command(&self, seed: u64) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).arg("--seed").arg(seed.to_string());
        command
    }
}

impl DatasetPreparer for CommandPreparer {
    fn prepare(&mut self, seed: u64) -> Result<(), PrepareError> {
        info!(seed, program = %self.program.display(), "preparing datasets");
        let status = self.command(seed).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(PrepareError::Tool(status.to_string()))
        }
    }
}

/// Shuffles the images below `source` and deals them into chunk directories.
///
/// Every chunk gets a `training` and a `testing` directory. Files in
/// subdirectories are renamed `dir.file` so the label survives flattening.
pub struct SeededPartitioner {
    source: PathBuf,
    output: PathBuf,
    chunks: usize,
    test_fraction: f64,
}

impl SeededPartitioner {
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>, chunks: usize) -> Self {
        SeededPartitioner {
            source: source.into(),
            output: output.into(),
            chunks,
            test_fraction: 0.2,
        }
    }

    pub fn test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction.max(0.0).min(1.0);
        self
    }

    fn collect_files(&self) -> Result<Vec<PathBuf>, PrepareError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.source).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_file() {
                let relative = entry
                    .path()
                    .strip_prefix(&self.source)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| entry.path().to_path_buf());
                files.push(relative);
            }
        }
        Ok(files)
    }
}

/// Absolute form of `path`, resolved through its nearest existing ancestor.
fn resolve(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let mut missing = Vec::new();
    let mut existing = absolute.as_path();
    loop {
        match existing.canonicalize() {
            Ok(resolved) => return Ok(missing.iter().rev().fold(resolved, |dir, part| dir.join(part))),
            Err(error) => match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name.to_os_string());
                    existing = parent;
                }
                _ => return Err(error),
            },
        }
    }
}

fn flat_name(relative: &Path) -> String {
    relative
        .iter()
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(".")
}

impl DatasetPreparer for SeededPartitioner {
    fn prepare(&mut self, seed: u64) -> Result<(), PrepareError> {
        if self.chunks == 0 {
            return Err(PrepareError::NoChunks);
        }
        if !self.source.is_dir() {
            return Err(PrepareError::NotADirectory(self.source.clone()));
        }
        let (input, output) = (resolve(&self.source)?, resolve(&self.output)?);
        if input.starts_with(&output) || output.starts_with(&input) {
            return Err(PrepareError::Overlap { input, output });
        }
        let mut files = self.collect_files()?;
        WyRand::new_seed(seed).shuffle(&mut files);

        if self.output.exists() {
            fs::remove_dir_all(&self.output)?;
        }
        let width = (self.chunks - 1).to_string().len();
        let per_chunk = files.len() / self.chunks;
        let remainder = files.len() % self.chunks;

        let mut remaining = files.as_slice();
        for chunk in 0..self.chunks {
            let size = per_chunk + usize::from(chunk < remainder);
            let (members, rest) = remaining.split_at(size);
            remaining = rest;

            let chunk_dir = self.output.join(format!("chunk_{:0width$}", chunk, width = width));
            let testing = (members.len() as f64 * self.test_fraction).round() as usize;
            for (index, relative) in members.iter().enumerate() {
                let category = if index < testing { "testing" } else { "training" };
                let target_dir = chunk_dir.join(category);
                fs::create_dir_all(&target_dir)?;
                fs::copy(self.source.join(relative), target_dir.join(flat_name(relative)))?;
            }
            fs::create_dir_all(&chunk_dir)?;
        }
        info!(seed, files = files.len(), chunks = self.chunks, output = %self.output.display(), "dataset partitioned");
        Ok(())
    }
}
