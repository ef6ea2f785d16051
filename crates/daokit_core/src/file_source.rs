//! Concrete line sources: buffered files and in-memory fixtures.

use crate::error::{InfraError, InfraResult};
use crate::line_fold::{LineSource, LineSourceFactory};
use crate::release::Release;
use log::debug;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Line source over any buffered reader.
///
/// Strips `\n` and `\r\n` terminators. Closing drops the reader.
pub struct ReaderLineSource<R> {
    reader: Option<R>,
}

pub type FileLineSource = ReaderLineSource<BufReader<File>>;

impl<R: BufRead> ReaderLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }
}

impl<R: BufRead> LineSource for ReaderLineSource<R> {
    fn next_line(&mut self) -> InfraResult<Option<String>> {
        let reader = self.reader.as_mut().ok_or(InfraError::Released {
            resource: "line_source",
        })?;

        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

impl<R> Release for ReaderLineSource<R> {
    fn close(&mut self) -> InfraResult<()> {
        self.reader.take();
        Ok(())
    }
}

/// Opens files as line sources.
///
/// Relative locators resolve against `base_dir` when one is configured.
#[derive(Debug, Clone, Default)]
pub struct FileLineSourceFactory {
    base_dir: Option<PathBuf>,
}

impl FileLineSourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    pub fn resolve(&self, locator: &str) -> PathBuf {
        let path = Path::new(locator);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl LineSourceFactory for FileLineSourceFactory {
    type Source = FileLineSource;

    fn new_line_source(&self, locator: &str) -> InfraResult<FileLineSource> {
        let path = self.resolve(locator);
        let file = File::open(&path)?;
        debug!(
            "event=line_source_open module=file_source status=ok path={}",
            path.display()
        );
        Ok(ReaderLineSource::new(BufReader::new(file)))
    }
}

/// Line source over an owned list of lines.
pub struct MemoryLineSource {
    lines: Option<std::vec::IntoIter<String>>,
}

impl MemoryLineSource {
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines: Some(lines.into_iter()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lines.is_none()
    }
}

impl LineSource for MemoryLineSource {
    fn next_line(&mut self) -> InfraResult<Option<String>> {
        let lines = self.lines.as_mut().ok_or(InfraError::Released {
            resource: "line_source",
        })?;
        Ok(lines.next())
    }
}

impl Release for MemoryLineSource {
    fn close(&mut self) -> InfraResult<()> {
        self.lines.take();
        Ok(())
    }
}

/// Serves fixed line lists keyed by locator.
#[derive(Debug, Clone, Default)]
pub struct MemoryLineSourceFactory {
    sources: HashMap<String, Vec<String>>,
}

impl MemoryLineSourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source<I, L>(mut self, locator: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        self.sources
            .insert(locator.into(), lines.into_iter().map(Into::into).collect());
        self
    }
}

impl LineSourceFactory for MemoryLineSourceFactory {
    type Source = MemoryLineSource;

    fn new_line_source(&self, locator: &str) -> InfraResult<MemoryLineSource> {
        let lines = self.sources.get(locator).cloned().ok_or_else(|| {
            InfraError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no in-memory source named `{locator}`"),
            ))
        })?;
        Ok(MemoryLineSource::new(lines))
    }
}
