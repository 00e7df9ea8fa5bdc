use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::bridge::RowSource;
#[cfg(feature = "xls")]
use crate::bridge::LegacyBridge;
#[cfg(feature = "xlsx")]
use crate::bridge::XmlBridge;
use crate::error::{SheetError, SheetResult};
use crate::format::ContainerFormat;

use super::options::ReaderOptions;

/// Where a workbook comes from.
pub enum Source {
    /// A file on disk, opened read-only.
    Path(PathBuf),
    /// Any byte stream. It is copied into an anonymous temporary file first, because both
    /// containers need random access.
    Reader(Box<dyn Read + Send>),
    /// A workbook already in memory.
    Bytes(Vec<u8>),
}

impl Source {
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self::Reader(Box::new(reader))
    }

    /// Label used in observer contexts.
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Reader(_) => "<stream>".to_string(),
            Self::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Reader(_) => f.write_str("Reader(..)"),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
        }
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for Source {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// An opened container ready to be pulled from.
pub(crate) struct Opened {
    pub(crate) rows: Box<dyn RowSource>,
    pub(crate) format: ContainerFormat,
}

pub(crate) fn open_source(source: Source, options: &ReaderOptions) -> SheetResult<Opened> {
    match source {
        Source::Path(path) => {
            let file = File::open(&path)?;
            build(file, options)
        }
        Source::Reader(reader) => build(spool(reader, options.spool_dir.as_deref())?, options),
        Source::Bytes(bytes) => build(Cursor::new(bytes), options),
    }
}

/// Copy a forward-only stream into a temporary file that is deleted once closed.
fn spool(mut reader: Box<dyn Read + Send>, dir: Option<&Path>) -> SheetResult<File> {
    let mut file = match dir {
        Some(dir) => tempfile::tempfile_in(dir)?,
        None => tempfile::tempfile()?,
    };
    let copied = io::copy(&mut reader, &mut file)
        .map_err(|e| SheetError::not_supported(format!("input stream could not be read: {e}")))?;
    file.seek(SeekFrom::Start(0))?;
    log::debug!("spooled {copied} bytes to a temporary file");
    Ok(file)
}

fn build<RS>(mut input: RS, options: &ReaderOptions) -> SheetResult<Opened>
where
    RS: Read + Seek + Send + 'static,
{
    let format = match options.format {
        Some(format) => format,
        None => ContainerFormat::detect(&mut input)?,
    };
    let rows: Box<dyn RowSource> = match format {
        #[cfg(feature = "xls")]
        ContainerFormat::Xls => Box::new(LegacyBridge::open(input)?),
        #[cfg(feature = "xlsx")]
        ContainerFormat::Xlsx => Box::new(XmlBridge::spawn(input, options.handoff_capacity)?),
        #[allow(unreachable_patterns)]
        other => {
            return Err(SheetError::not_supported(format!(
                "{other} support is not compiled in"
            )));
        }
    };
    log::debug!("opened {format} workbook");
    Ok(Opened { rows, format })
}
