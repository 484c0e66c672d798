//! Forward scanner over an in-memory ZIP archive.
//!
//! ## Parsing Strategy
//!
//! Unlike readers that start from the End of Central Directory, this parser
//! walks the archive from offset 0, dispatching on each record signature:
//!
//! 1. Local File Headers are collected and their data skipped
//! 2. Data Descriptors patch the entry right before them
//! 3. Central Directory headers are collected
//! 4. The EOCD record ends the scan
//!
//! Streamed entries (general-purpose bit 3) do not declare their size up
//! front, so a plain scan must stop at them. The archive can then be
//! re-scanned in [`ScanMode::CentralDirectory`], which takes each streamed
//! entry's size from the central directory recovered by the
//! [`EocdLocator`](super::locator::EocdLocator).

use crate::io::ByteSource;

use super::locator::{EocdLocation, EocdLocator, LocatePhase};
use super::options::ArchiveOptions;
use super::structures::*;

/// How the scanner treats streamed entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanMode {
    /// Trust local headers only; stop at the first streamed entry.
    #[default]
    Sequential,
    /// Bridge streamed entries with sizes from the central directory, and
    /// stop once the local section ends.
    CentralDirectory,
}

/// Why a scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Fewer than four bytes remained at `offset`.
    Completed { offset: usize },
    /// Central directory mode reached the first central directory header.
    ReachedCentralDirectory { offset: usize },
    /// The EOCD record at `offset` was decoded.
    HaltedAtEocd { offset: usize },
    /// Local entry number `entry` is streamed and its size is unknown.
    HaltedNeedsDescriptor { offset: usize, entry: usize },
    /// `signature` at `offset` is not a record this scanner understands.
    HaltedUnknownSignature { offset: usize, signature: u32 },
    /// A `kind` record at `offset` runs past the end of the buffer. For a
    /// local file header this includes its data; such an entry is not kept.
    Truncated { offset: usize, kind: RecordKind },
}

impl ScanOutcome {
    /// Whether the scan walked the whole archive structure.
    pub fn is_complete(&self) -> bool {
        matches!(
            self,
            ScanOutcome::Completed { .. }
                | ScanOutcome::ReachedCentralDirectory { .. }
                | ScanOutcome::HaltedAtEocd { .. }
        )
    }

    /// Whether a central directory mode re-scan may get further.
    pub fn needs_descriptor(&self) -> bool {
        matches!(self, ScanOutcome::HaltedNeedsDescriptor { .. })
    }
}

/// Everything recovered from an archive so far.
#[derive(Debug, Clone, Default)]
pub struct ArchiveState {
    pub cursor: usize,
    pub local_entries: Vec<LocalFileEntry>,
    pub central_directory: Vec<CentralDirectoryEntry>,
    pub eocd: Option<EndOfCentralDirectory>,
    pub eocd_location: Option<EocdLocation>,
    pub outcome: Option<ScanOutcome>,
}

/// Low-level ZIP parser.
///
/// Owns the archive bytes and the state recovered from them. Typically used
/// through [`ZipArchive`](super::ZipArchive) rather than directly.
///
/// ```
/// use zipscan::{ByteSource, ScanMode, ZipParser};
///
/// let mut parser = ZipParser::new(ByteSource::from(vec![0u8; 8]), Default::default());
/// let outcome = parser.read(ScanMode::Sequential);
/// assert!(!outcome.is_complete());
/// assert!(parser.state().local_entries.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ZipParser {
    source: ByteSource,
    options: ArchiveOptions,
    state: ArchiveState,
}

impl ZipParser {
    /// Create a new parser over `source`.
    ///
    /// # Arguments
    ///
    /// * `source` - The complete archive bytes
    /// * `options` - Locator and recovery settings
    ///
    /// # Returns
    ///
    /// A parser with empty state; nothing is read until [`read`](Self::read).
    pub fn new(source: ByteSource, options: ArchiveOptions) -> Self {
        Self {
            source,
            options,
            state: ArchiveState::default(),
        }
    }

    pub fn source(&self) -> &ByteSource {
        &self.source
    }

    pub fn options(&self) -> &ArchiveOptions {
        &self.options
    }

    pub fn state(&self) -> &ArchiveState {
        &self.state
    }

    /// Populate the archive state.
    ///
    /// [`ScanMode::Sequential`] starts from scratch: it clears everything,
    /// scans forward and, if no EOCD turned up, runs the locator. When the
    /// scan stopped on a streamed entry and the locator recovered a central
    /// directory, the archive is re-scanned in central directory mode unless
    /// [`ArchiveOptions::recover_streamed_entries`] is off.
    ///
    /// [`ScanMode::CentralDirectory`] keeps the central directory, locating it
    /// first if none is known yet, and re-scans the local entries.
    ///
    /// # Arguments
    ///
    /// * `mode` - How streamed entries are handled
    ///
    /// # Returns
    ///
    /// Why the final scan stopped. The same value is kept in
    /// [`ArchiveState::outcome`]. Malformed input never produces an error;
    /// whatever was recovered before the problem stays in the state.
    pub fn read(&mut self, mode: ScanMode) -> ScanOutcome {
        let outcome = match mode {
            ScanMode::Sequential => {
                self.state = ArchiveState::default();
                let outcome = self.scan(ScanMode::Sequential);
                if self.state.eocd.is_none() {
                    self.locate();
                }

                if outcome.needs_descriptor()
                    && self.options.recovers_streamed_entries()
                    && !self.state.central_directory.is_empty()
                {
                    log::debug!("Re-scanning with central directory sizes after {outcome:?}");
                    self.rescan_with_central_directory()
                } else {
                    outcome
                }
            }
            ScanMode::CentralDirectory => {
                if self.state.central_directory.is_empty() && self.state.eocd.is_none() {
                    self.locate();
                }
                self.rescan_with_central_directory()
            }
        };

        self.state.outcome = Some(outcome);
        outcome
    }

    fn rescan_with_central_directory(&mut self) -> ScanOutcome {
        self.state.cursor = 0;
        self.state.local_entries.clear();
        self.scan(ScanMode::CentralDirectory)
    }

    /// Run the EOCD locator from the current cursor and store what it finds.
    ///
    /// Only offsets at or after the cursor are searched, so bytes already
    /// consumed as local entries are never mistaken for an EOCD.
    ///
    /// # Returns
    ///
    /// Where the EOCD was found and by which phase, or `None` if every
    /// candidate failed validation. On success the EOCD and its central
    /// directory replace whatever the state held.
    pub fn locate(&mut self) -> Option<EocdLocation> {
        let found = EocdLocator::new(&self.source)
            .probe_hot_spots(self.options.probes_hot_spots())
            .locate(self.state.cursor);

        let Some(found) = found else {
            log::debug!(
                "No EOCD found between {:#x} and the end of the archive",
                self.state.cursor
            );
            return None;
        };

        self.state.eocd = Some(found.eocd);
        self.state.central_directory = found.entries;
        self.state.eocd_location = Some(found.location);
        Some(found.location)
    }

    /// Scan forward from the current cursor until a record stops the scan.
    ///
    /// Unlike [`read`](Self::read) this neither resets the state nor runs the
    /// locator, so it can resume after a halt.
    ///
    /// # Arguments
    ///
    /// * `mode` - [`ScanMode::CentralDirectory`] bridges streamed entries with
    ///   central directory sizes and stops at the first central header
    ///
    /// # Returns
    ///
    /// The reason the scan stopped. After an unknown signature or truncation
    /// the cursor still points at the offending record.
    pub fn scan(&mut self, mode: ScanMode) -> ScanOutcome {
        let outcome = loop {
            let offset = self.state.cursor;
            let Some(signature) = self.source.signature_at(offset) else {
                break ScanOutcome::Completed { offset };
            };

            let Some(kind) = RecordKind::from_signature(signature) else {
                log::warn!("Unrecognized signature {signature:#010x} @{offset:#x}");
                break ScanOutcome::HaltedUnknownSignature { offset, signature };
            };

            let step = match kind {
                RecordKind::LocalFileHeader => self.scan_local_file(offset, mode),
                RecordKind::DataDescriptor => self.scan_data_descriptor(offset),
                RecordKind::CentralDirectoryHeader => {
                    if mode == ScanMode::CentralDirectory {
                        break ScanOutcome::ReachedCentralDirectory { offset };
                    }
                    self.scan_central_directory(offset)
                }
                RecordKind::EndOfCentralDirectory => self.scan_eocd(offset),
            };

            match step {
                Step::Continue => continue,
                Step::Halt(outcome) => break outcome,
                Step::Truncated => {
                    log::warn!("Truncated {kind:?} @{offset:#x}");
                    break ScanOutcome::Truncated { offset, kind };
                }
            }
        };

        log::debug!(
            "{mode:?} scan stopped: {outcome:?}, {} local / {} central entries",
            self.state.local_entries.len(),
            self.state.central_directory.len()
        );
        outcome
    }

    fn scan_local_file(&mut self, offset: usize, mode: ScanMode) -> Step {
        let Ok((entry, len)) = LocalFileEntry::read(self.source.as_slice(), offset) else {
            return Step::Truncated;
        };

        let index = self.state.local_entries.len();
        let starts_at = entry.starts_at;

        if !entry.needs_data_descriptor() {
            let Some(end) = self.data_end(starts_at, entry.compressed_size) else {
                log::warn!(
                    "Data of {:?} @{offset:#x} runs past the end of the archive",
                    entry.file_name
                );
                return Step::Truncated;
            };
            self.state.local_entries.push(entry);
            self.state.cursor = end;
            return Step::Continue;
        }

        self.state.local_entries.push(entry);
        self.state.cursor = offset + len;
        if mode == ScanMode::Sequential {
            return Step::Halt(ScanOutcome::HaltedNeedsDescriptor {
                offset,
                entry: index,
            });
        }

        let Some(central) = self.central_entry_for(index).cloned() else {
            log::warn!(
                "Streamed entry {:?} @{offset:#x} is missing from the central directory",
                self.state.local_entries[index].file_name
            );
            return Step::Halt(ScanOutcome::HaltedNeedsDescriptor {
                offset,
                entry: index,
            });
        };

        let Some(end) = self.data_end(starts_at, central.compressed_size) else {
            log::warn!(
                "Data of {:?} @{offset:#x} runs past the end of the archive",
                central.file_name
            );
            self.state.local_entries.pop();
            self.state.cursor = offset;
            return Step::Truncated;
        };
        self.state.cursor = end;
        self.skip_unsigned_descriptor(index, &central);
        Step::Continue
    }

    /// End of `size` bytes of entry data at `starts_at`, if they fit the buffer.
    fn data_end(&self, starts_at: usize, size: u64) -> Option<usize> {
        usize::try_from(size)
            .ok()
            .and_then(|size| starts_at.checked_add(size))
            .filter(|&end| end <= self.source.len())
    }

    /// Descriptors may omit their signature. After bridging a streamed entry,
    /// accept 12 bytes that start with the expected CRC and are followed by a
    /// known record as such a descriptor.
    fn skip_unsigned_descriptor(&mut self, index: usize, central: &CentralDirectoryEntry) {
        let at = self.state.cursor;
        if self
            .source
            .signature_at(at)
            .and_then(RecordKind::from_signature)
            .is_some()
        {
            return;
        }
        if self.source.read_u32(at) != Some(central.crc32) {
            return;
        }
        let followed_by_record = self
            .source
            .signature_at(at + 12)
            .and_then(RecordKind::from_signature)
            .is_some();
        let (Some(compressed_size), Some(uncompressed_size), true) = (
            self.source.read_u32(at + 4),
            self.source.read_u32(at + 8),
            followed_by_record,
        ) else {
            return;
        };

        log::debug!("Unsigned data descriptor @{at:#x}");
        self.state.local_entries[index].apply_descriptor(&DataDescriptorEntry {
            signature: 0,
            crc32: central.crc32,
            compressed_size: compressed_size as u64,
            uncompressed_size: uncompressed_size as u64,
        });
        self.state.cursor = at + 12;
    }

    fn central_entry_for(&self, index: usize) -> Option<&CentralDirectoryEntry> {
        let local = &self.state.local_entries[index];
        let directory = &self.state.central_directory;
        directory
            .iter()
            .find(|cd| cd.local_header_offset == local.offset && cd.file_name == local.file_name)
            .or_else(|| directory.iter().find(|cd| cd.file_name == local.file_name))
    }

    fn scan_data_descriptor(&mut self, offset: usize) -> Step {
        let Ok((descriptor, len)) = DataDescriptorEntry::read(self.source.as_slice(), offset)
        else {
            return Step::Truncated;
        };

        match self.state.local_entries.last_mut() {
            Some(entry) => entry.apply_descriptor(&descriptor),
            None => log::warn!("Data descriptor @{offset:#x} precedes any local entry"),
        }
        self.state.cursor = offset + len;
        Step::Continue
    }

    fn scan_central_directory(&mut self, offset: usize) -> Step {
        let Ok((entry, len)) = CentralDirectoryEntry::read(self.source.as_slice(), offset) else {
            return Step::Truncated;
        };

        self.state.central_directory.push(entry);
        self.state.cursor = offset + len;
        Step::Continue
    }

    fn scan_eocd(&mut self, offset: usize) -> Step {
        let Ok((eocd, len)) = EndOfCentralDirectory::read(self.source.as_slice(), offset) else {
            return Step::Truncated;
        };

        self.state.eocd = Some(eocd);
        self.state.eocd_location = Some(EocdLocation {
            offset,
            phase: LocatePhase::Scanned,
        });
        self.state.cursor = offset + len;
        Step::Halt(ScanOutcome::HaltedAtEocd { offset })
    }
}

enum Step {
    Continue,
    Halt(ScanOutcome),
    Truncated,
}
