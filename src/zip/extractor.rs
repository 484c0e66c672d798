use crate::io::ByteSource;
use crate::{Error, Result};

use super::decompress::{Decompressors, FilterLimits};
use super::locator::EocdLocation;
use super::options::ArchiveOptions;
use super::parser::{ScanMode, ScanOutcome, ZipParser};
use super::structures::*;

/// Which entry list a name lookup searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lookup {
    /// The central directory, which is authoritative.
    #[default]
    CentralDirectory,
    /// Local entries in file order.
    Local,
}

/// An entry in either of its two forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRef<'a> {
    Local(&'a LocalFileEntry),
    Central(&'a CentralDirectoryEntry),
}

impl EntryRef<'_> {
    pub fn file_name(&self) -> &str {
        match self {
            EntryRef::Local(entry) => &entry.file_name,
            EntryRef::Central(entry) => &entry.file_name,
        }
    }

    pub fn compression_method(&self) -> u16 {
        match self {
            EntryRef::Local(entry) => entry.compression_method,
            EntryRef::Central(entry) => entry.compression_method,
        }
    }

    pub fn crc32(&self) -> u32 {
        match self {
            EntryRef::Local(entry) => entry.crc32,
            EntryRef::Central(entry) => entry.crc32,
        }
    }

    pub fn compressed_size(&self) -> u64 {
        match self {
            EntryRef::Local(entry) => entry.compressed_size,
            EntryRef::Central(entry) => entry.compressed_size,
        }
    }

    pub fn uncompressed_size(&self) -> u64 {
        match self {
            EntryRef::Local(entry) => entry.uncompressed_size,
            EntryRef::Central(entry) => entry.uncompressed_size,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.file_name().ends_with('/')
    }

    pub fn mod_date(&self) -> (u16, u8, u8) {
        match self {
            EntryRef::Local(entry) => entry.mod_date(),
            EntryRef::Central(entry) => entry.mod_date(),
        }
    }

    pub fn mod_time(&self) -> (u8, u8, u8) {
        match self {
            EntryRef::Local(entry) => entry.mod_time(),
            EntryRef::Central(entry) => entry.mod_time(),
        }
    }
}

impl<'a> From<&'a LocalFileEntry> for EntryRef<'a> {
    fn from(entry: &'a LocalFileEntry) -> Self {
        EntryRef::Local(entry)
    }
}

impl<'a> From<&'a CentralDirectoryEntry> for EntryRef<'a> {
    fn from(entry: &'a CentralDirectoryEntry) -> Self {
        EntryRef::Central(entry)
    }
}

/// Extracted entry content tagged with the caller's content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Blob {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// In-memory ZIP archive.
///
/// ```
/// use zipscan::{ScanMode, ZipArchive};
///
/// # async fn run(bytes: Vec<u8>) -> zipscan::Result<()> {
/// let mut archive = ZipArchive::open(bytes);
/// archive.read(ScanMode::Sequential);
///
/// if archive.end_of_central_directory().is_none() {
///     eprintln!("no central directory, listing local entries only");
/// }
/// for entry in archive.entries() {
///     println!("{}", entry.file_name);
/// }
/// if let Some(blob) = archive.extract_by_name("word/document.xml", Default::default()).await? {
///     println!("{} bytes", blob.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ZipArchive {
    parser: ZipParser,
    decompressors: Decompressors,
}

impl ZipArchive {
    /// Wrap `bytes` without reading anything yet.
    pub fn open(bytes: impl Into<ByteSource>) -> Self {
        Self::with_options(bytes, ArchiveOptions::default())
    }

    pub fn with_options(bytes: impl Into<ByteSource>, options: ArchiveOptions) -> Self {
        Self {
            parser: ZipParser::new(bytes.into(), options),
            decompressors: Decompressors::default(),
        }
    }

    /// Replace the decompression filters used by [`extract`](Self::extract).
    pub fn with_decompressors(mut self, decompressors: Decompressors) -> Self {
        self.decompressors = decompressors;
        self
    }

    pub fn decompressors_mut(&mut self) -> &mut Decompressors {
        &mut self.decompressors
    }

    /// Scan the archive. See [`ZipParser::read`].
    pub fn read(&mut self, mode: ScanMode) -> ScanOutcome {
        self.parser.read(mode)
    }

    pub fn source(&self) -> &ByteSource {
        self.parser.source()
    }

    /// Local entries in file order.
    pub fn entries(&self) -> &[LocalFileEntry] {
        &self.parser.state().local_entries
    }

    pub fn central_directory(&self) -> &[CentralDirectoryEntry] {
        &self.parser.state().central_directory
    }

    /// The EOCD record, or `None` when neither the scan nor the locator found one.
    pub fn end_of_central_directory(&self) -> Option<&EndOfCentralDirectory> {
        self.parser.state().eocd.as_ref()
    }

    pub fn eocd_location(&self) -> Option<EocdLocation> {
        self.parser.state().eocd_location
    }

    pub fn comment(&self) -> Option<&str> {
        self.end_of_central_directory().map(|eocd| eocd.comment.as_str())
    }

    /// How the last [`read`](Self::read) ended.
    pub fn scan_outcome(&self) -> Option<ScanOutcome> {
        self.parser.state().outcome
    }

    /// All entries of one list, in order.
    pub fn list(&self, lookup: Lookup) -> Vec<EntryRef<'_>> {
        match lookup {
            Lookup::CentralDirectory => self
                .central_directory()
                .iter()
                .map(EntryRef::Central)
                .collect(),
            Lookup::Local => self.entries().iter().map(EntryRef::Local).collect(),
        }
    }

    /// Find an entry by exact file name.
    pub fn find(&self, name: &str, lookup: Lookup) -> Option<EntryRef<'_>> {
        match lookup {
            Lookup::CentralDirectory => self
                .central_directory()
                .iter()
                .find(|entry| entry.file_name == name)
                .map(EntryRef::Central),
            Lookup::Local => self
                .entries()
                .iter()
                .find(|entry| entry.file_name == name)
                .map(EntryRef::Local),
        }
    }

    /// Decompress an entry's content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCompression`] if no filter handles the
    /// entry's method, [`Error::InvalidSignature`] if a central directory
    /// entry points at something other than a Local File Header, and
    /// [`Error::OutOfBounds`] if the compressed data runs past the archive.
    pub async fn extract<'a>(
        &'a self,
        entry: impl Into<EntryRef<'a>>,
        content_type: Option<&str>,
    ) -> Result<Blob> {
        let entry = entry.into();
        let method = entry.compression_method();
        let filter = self
            .decompressors
            .get(method)
            .ok_or(Error::UnsupportedCompression(method))?;

        let (start, len) = self.data_range(entry)?;
        let compressed = self
            .source()
            .get(start..start + len)
            .ok_or(Error::OutOfBounds {
                start,
                len,
                source_len: self.source().len(),
            })?;

        log::debug!(
            "Extracting {:?}: method {method}, {len} bytes @{start:#x}",
            entry.file_name()
        );
        let data = filter
            .decompress(compressed, FilterLimits::from(self.parser.options()))
            .await?;

        Ok(Blob {
            content_type: content_type.map(str::to_owned),
            data,
        })
    }

    /// Find `name` and extract it. `Ok(None)` means no such entry.
    pub async fn extract_by_name(&self, name: &str, lookup: Lookup) -> Result<Option<Blob>> {
        match self.find(name, lookup) {
            Some(entry) => self.extract(entry, None).await.map(Some),
            None => Ok(None),
        }
    }

    /// Offset and length of an entry's compressed data.
    fn data_range(&self, entry: EntryRef<'_>) -> Result<(usize, usize)> {
        let (start, size) = match entry {
            EntryRef::Local(local) => {
                let size = if local.compressed_size == 0 && local.needs_data_descriptor() {
                    self.central_directory()
                        .iter()
                        .find(|cd| cd.local_header_offset == local.offset)
                        .map_or(0, |cd| cd.compressed_size)
                } else {
                    local.compressed_size
                };
                (local.starts_at, size)
            }
            EntryRef::Central(central) => {
                let (local, _) =
                    LocalFileEntry::read(self.source().as_slice(), central.local_header_offset)?;
                let size = if local.compressed_size == 0 || local.needs_data_descriptor() {
                    central.compressed_size
                } else {
                    local.compressed_size
                };
                (local.starts_at, size)
            }
        };

        let len = size as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.source().len() => Ok((start, len)),
            _ => Err(Error::OutOfBounds {
                start,
                len,
                source_len: self.source().len(),
            }),
        }
    }
}
