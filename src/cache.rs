//! On-disk cache of compiled programs.
//!
//! Entries are keyed by a SHA-256 digest of everything that determines the
//! compiled output: the format version, the dialect bits, the file name and
//! the source text. An entry that fails to decode is discarded and rebuilt.
//!
//! The host's set of predeclared names is not part of the key. Instead a hit
//! is checked against it: every name the entry binds as predeclared must
//! still be predeclared, and no name it binds from the universe may now be
//! shadowed by a predeclared one. Entries that fail the check are rebuilt.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};
use starlet_engine::codec::VERSION;
use starlet_engine::{FileOptions, Program};
use tracing::{debug, info, warn};

use crate::error::Result;

const EXTENSION: &str = "slc";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Cache of encoded programs in a directory.
#[derive(Debug, Clone)]
pub struct ProgramCache {
    dir: PathBuf,
}

impl ProgramCache {
    /// Creates a cache in `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Get the cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the cache key for a source file.
    pub fn key(filename: &str, src: &str, options: FileOptions) -> String {
        let mut hasher = Sha256::new();
        hasher.update(VERSION.to_le_bytes());
        hasher.update(options.to_bits().to_le_bytes());
        hasher.update((filename.len() as u64).to_le_bytes());
        hasher.update(filename.as_bytes());
        hasher.update(src.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Returns the cached program for `src`, compiling and storing it when
    /// there is no usable entry.
    pub fn load_or_compile(
        &self,
        filename: &str,
        src: &str,
        options: FileOptions,
        is_predeclared: &dyn Fn(&str) -> bool,
    ) -> Result<Program> {
        let key = Self::key(filename, src, options);
        let path = self.entry_path(&key);

        match std::fs::read(&path) {
            Ok(bytes) => match Program::decode(&bytes) {
                Ok(program) if binds_like(&program, is_predeclared) => {
                    debug!(filename, key = %key, bytes = bytes.len(), "program cache hit");
                    return Ok(program);
                }
                Ok(_) => {
                    warn!(
                        path = %path.display(),
                        "cached program was resolved against other predeclared names, compiling from source"
                    );
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        kind = err.kind(),
                        error = %err,
                        "discarding unusable cached program, compiling from source"
                    );
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(filename, key = %key, "program cache miss");
            }
            Err(err) => return Err(err.into()),
        }

        let (_, program) = starlet_engine::source_program_options(options, filename, src, is_predeclared)?;
        self.store(&path, &program)?;
        Ok(program)
    }

    /// Removes every cached program.
    pub fn clear(&self) -> Result<()> {
        info!("Clearing program cache at {}", self.dir.display());
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == EXTENSION) {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, EXTENSION))
    }

    /// Writes the encoding next to its final path and renames it into place,
    /// so readers never observe a partial entry.
    fn store(&self, path: &Path, program: &Program) -> Result<()> {
        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{}.tmp", std::process::id(), n));
        let bytes = program.encode();
        std::fs::write(&tmp, &bytes)?;
        if let Err(err) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(err.into());
        }
        debug!(path = %path.display(), bytes = bytes.len(), "stored compiled program");
        Ok(())
    }
}

/// Reports whether resolving the program's source against `is_predeclared`
/// would bind its predeclared and universal names the same way.
fn binds_like(program: &Program, is_predeclared: &dyn Fn(&str) -> bool) -> bool {
    program.predeclared.iter().all(|name| is_predeclared(name))
        && !program.universals.iter().any(|name| is_predeclared(name))
}
