//! Recovery of the End of Central Directory record.
//!
//! Used when a forward scan never reached the EOCD, typically because a
//! streamed entry left its compressed size unknown. Candidates are tried at
//! the usual offsets first, then every offset walking backwards from the end
//! of the buffer. A candidate is accepted only when:
//!
//! 1. it starts with the EOCD signature,
//! 2. its comment ends exactly at the end of the buffer, and
//! 3. its central directory offset points at a Central Directory header.

use crate::io::ByteSource;

use super::structures::*;

/// Largest comment length the EOCD can declare, plus one.
const MAX_COMMENT_SPAN: usize = 65536;

/// How the EOCD record was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatePhase {
    /// Decoded in line by the forward scan.
    Scanned,
    /// Accepted at one of the probed offsets.
    HotSpot,
    /// Accepted during the backward byte-by-byte scan.
    BruteForce,
}

/// Where the EOCD record sits and how it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EocdLocation {
    pub offset: usize,
    pub phase: LocatePhase,
}

/// A validated EOCD with the central directory it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedDirectory {
    pub location: EocdLocation,
    pub eocd: EndOfCentralDirectory,
    pub entries: Vec<CentralDirectoryEntry>,
}

pub struct EocdLocator<'a> {
    source: &'a ByteSource,
    probe_hot_spots: bool,
}

impl<'a> EocdLocator<'a> {
    pub fn new(source: &'a ByteSource) -> Self {
        Self {
            source,
            probe_hot_spots: true,
        }
    }

    pub fn probe_hot_spots(mut self, enabled: bool) -> Self {
        self.probe_hot_spots = enabled;
        self
    }

    /// Offsets tried before the backward scan: a record with no comment, and
    /// one whose comment spans the maximum distance from the end.
    pub fn hot_spots(len: usize) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(2);
        if let Some(offset) = len.checked_sub(EndOfCentralDirectory::MIN_SIZE) {
            offsets.push(offset);
        }
        if len > MAX_COMMENT_SPAN + EndOfCentralDirectory::MIN_SIZE {
            offsets.push(len - MAX_COMMENT_SPAN - EndOfCentralDirectory::MIN_SIZE);
        }
        offsets
    }

    /// Search for the EOCD, scanning backwards no further than `lower_bound`.
    pub fn locate(&self, lower_bound: usize) -> Option<LocatedDirectory> {
        let len = self.source.len();
        let probed = if self.probe_hot_spots {
            Self::hot_spots(len)
        } else {
            Vec::new()
        };

        for &offset in &probed {
            log::debug!("Probing EOCD hot spot @{offset:#x}");
            if let Some(found) = self.validate(offset, LocatePhase::HotSpot) {
                return Some(found);
            }
        }

        let start = len.checked_sub(EndOfCentralDirectory::MIN_SIZE)?;
        log::debug!("Scanning backwards for EOCD from {start:#x} to {lower_bound:#x}");
        (lower_bound..=start)
            .rev()
            .filter(|offset| !probed.contains(offset))
            .find_map(|offset| self.validate(offset, LocatePhase::BruteForce))
    }

    /// Accept `offset` as the EOCD if all three checks pass, and read the
    /// central directory it points to.
    pub fn validate(&self, offset: usize, phase: LocatePhase) -> Option<LocatedDirectory> {
        if self.source.signature_at(offset)? != END_OF_CENTRAL_DIRECTORY_SIGNATURE {
            return None;
        }

        let (eocd, len) = EndOfCentralDirectory::read(self.source.as_slice(), offset).ok()?;
        if len != self.source.len() - offset {
            log::debug!(
                "EOCD candidate @{offset:#x} spans {len} bytes, {} remain",
                self.source.len() - offset
            );
            return None;
        }

        let cd_offset = eocd.cd_offset as usize;
        if self.source.signature_at(cd_offset) != Some(CENTRAL_DIRECTORY_SIGNATURE) {
            log::debug!("EOCD candidate @{offset:#x} points at no central directory ({cd_offset:#x})");
            return None;
        }

        log::debug!("Found EOCD @{offset:#x} via {phase:?}");
        let entries = self.read_central_directory(cd_offset, offset);
        Some(LocatedDirectory {
            location: EocdLocation { offset, phase },
            eocd,
            entries,
        })
    }

    /// Decode central directory headers from `start` until `end`.
    fn read_central_directory(&self, start: usize, end: usize) -> Vec<CentralDirectoryEntry> {
        let mut entries = Vec::new();
        let mut offset = start;

        while offset < end {
            match CentralDirectoryEntry::read(self.source.as_slice(), offset) {
                Ok((entry, len)) => {
                    entries.push(entry);
                    offset += len;
                }
                Err(e) => {
                    log::warn!("Central directory stops early @{offset:#x}: {e}");
                    break;
                }
            }
        }

        entries
    }
}
