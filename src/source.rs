use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("error opening file: {0}")]
    Open(io::Error),
    #[error("error reading file: {0}")]
    Read(io::Error),
}

impl SourceError {
    pub fn is_open(&self) -> bool {
        matches!(self, SourceError::Open(_))
    }

    pub fn is_read(&self) -> bool {
        matches!(self, SourceError::Read(_))
    }
}

/// A readable input handed to the pipeline.
///
/// `size_hint` feeds the progress estimate only; it never affects statistics.
pub trait InputSource: Send {
    fn name(&self) -> &str;
    fn size_hint(&self) -> u64;
    fn into_reader(self: Box<Self>) -> Box<dyn BufRead + Send>;
}

pub struct FileSource {
    name: String,
    file: File,
    len: u64,
}

impl FileSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(SourceError::Open)?;
        let metadata = file.metadata().map_err(SourceError::Open)?;
        if metadata.is_dir() {
            return Err(SourceError::Open(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", path.display()),
            )));
        }
        Ok(Self {
            name: path.display().to_string(),
            file,
            len: metadata.len(),
        })
    }
}

impl InputSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size_hint(&self) -> u64 {
        self.len
    }

    fn into_reader(self: Box<Self>) -> Box<dyn BufRead + Send> {
        Box::new(BufReader::new(self.file))
    }
}

/// In-memory source, mostly useful for tests and piping pre-loaded text.
pub struct MemorySource {
    name: String,
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

impl InputSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size_hint(&self) -> u64 {
        self.data.len() as u64
    }

    fn into_reader(self: Box<Self>) -> Box<dyn BufRead + Send> {
        Box::new(Cursor::new(self.data))
    }
}

pub fn open_source(path: &Path) -> Result<Box<dyn InputSource>, SourceError> {
    let src = FileSource::open(path)?;
    Ok(Box::new(src))
}
