//! Per-payload XML files under the log directory.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use soaptap_core::error::{Result, TapError};

use super::{type_tag, CapturedPayload, Variant};
use crate::diag::DiagnosticSink;

/// Characters of the correlation id kept in file names.
pub const CORRELATION_FRAGMENT_LEN: usize = 8;

// Suffixes tried when a generated name already exists.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Outcome of resolving the directory to write into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ensured {
    pub path: PathBuf,
    /// This call created the directory.
    pub created: bool,
}

/// Primary log directory plus a single fixed fallback, created lazily.
#[derive(Debug, Clone)]
pub struct LogDirectory {
    primary: PathBuf,
    fallback: PathBuf,
}

impl LogDirectory {
    pub fn new(primary: impl Into<PathBuf>, fallback: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    pub fn primary(&self) -> &Path {
        &self.primary
    }

    /// Directory to write into, creating it if missing. `None` means neither
    /// the primary nor the fallback is usable; the failure is already
    /// reported to `diag`.
    pub fn ensure(&self, diag: &dyn DiagnosticSink) -> Option<Ensured> {
        if self.primary.is_dir() {
            return Some(Ensured {
                path: self.primary.clone(),
                created: false,
            });
        }

        // create_dir_all treats a directory created by a racing caller as success.
        match fs::create_dir_all(&self.primary) {
            Ok(()) => {
                diag.info(&format!("created log directory: {}", self.primary.display()));
                return Some(Ensured {
                    path: self.primary.clone(),
                    created: true,
                });
            }
            Err(e) => diag.error(
                &format!("failed to create log directory {}", self.primary.display()),
                Some(&e),
            ),
        }

        if self.fallback == self.primary {
            return None;
        }
        if self.fallback.is_dir() {
            return Some(Ensured {
                path: self.fallback.clone(),
                created: false,
            });
        }
        match fs::create_dir_all(&self.fallback) {
            Ok(()) => {
                diag.info(&format!("created fallback log directory: {}", self.fallback.display()));
                Some(Ensured {
                    path: self.fallback.clone(),
                    created: true,
                })
            }
            Err(e) => {
                diag.error(
                    &format!("failed to create fallback log directory {}", self.fallback.display()),
                    Some(&e),
                );
                None
            }
        }
    }
}

/// Result of one file write.
#[derive(Debug, Clone)]
pub struct Written {
    pub path: PathBuf,
    pub created_dir: bool,
}

#[derive(Debug, Clone)]
pub struct FileSink {
    dir: LogDirectory,
}

impl FileSink {
    pub fn new(dir: LogDirectory) -> Self {
        Self { dir }
    }

    pub fn directory(&self) -> &LogDirectory {
        &self.dir
    }

    /// Write `content` to a new file. Never overwrites: a colliding name gets
    /// a numeric suffix.
    pub fn write(
        &self,
        variant: Variant,
        payload: &CapturedPayload<'_>,
        content: &str,
        diag: &dyn DiagnosticSink,
    ) -> Result<Written> {
        let ensured = self.dir.ensure(diag).ok_or_else(|| {
            TapError::Io(io::Error::new(io::ErrorKind::NotFound, "no usable log directory"))
        })?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = ensured.path.join(file_name(payload, variant, attempt));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    write_new(&path, file, content.as_bytes())?;
                    if attempt > 0 {
                        diag.warn(&format!(
                            "log file name collision for {}; wrote {}",
                            payload.operation,
                            path.display()
                        ));
                    }
                    return Ok(Written {
                        path,
                        created_dir: ensured.created,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(TapError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free log file name after {MAX_NAME_ATTEMPTS} attempts"),
        )))
    }
}

/// Fill a file just created at `path`. A partial file is removed on failure.
fn write_new(path: &Path, mut file: impl Write, content: &[u8]) -> io::Result<()> {
    let result = file.write_all(content).and_then(|()| file.flush());
    if result.is_err() {
        drop(file);
        let _ = fs::remove_file(path);
    }
    result
}

/// `{operation}_{tag}_{HHMMSS}_{fragment}.xml`, with `_{attempt}` before the
/// extension on collisions.
pub fn file_name(payload: &CapturedPayload<'_>, variant: Variant, attempt: u32) -> String {
    let operation: String = payload
        .operation
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '.') { c } else { '_' })
        .collect();
    let tag = type_tag(variant, payload.direction);
    let time = payload.captured_at.format("%H%M%S");
    let fragment: String = payload.correlation_id.chars().take(CORRELATION_FRAGMENT_LEN).collect();

    if attempt == 0 {
        format!("{operation}_{tag}_{time}_{fragment}.xml")
    } else {
        format!("{operation}_{tag}_{time}_{fragment}_{attempt}.xml")
    }
}
