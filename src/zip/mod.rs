//! ZIP archive parsing and extraction.
//!
//! This module reads ZIP archives held entirely in memory, including archives
//! written by streaming encoders that leave entry sizes out of the local
//! headers, and archives whose EOCD record is not where readers expect it.
//!
//! ## Architecture
//!
//! - [`decoder`]: one schema-driven routine that reads every record kind
//! - [`structures`]: record layouts (local header, data descriptor, central directory, EOCD)
//! - [`parser`]: forward scan from offset 0 that collects entries
//! - [`locator`]: EOCD recovery when the scan could not reach it
//! - [`decompress`]: pluggable decompression filters per method
//! - [`extractor`]: high-level archive handle for lookup and extraction
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file, optionally
//!    followed by a data descriptor
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! ## Limitations
//!
//! - No encryption support
//! - No ZIP64 or multi-disk support (fields are read, not acted on)
//! - Only STORED and DEFLATE are registered by default

pub mod decoder;
mod decompress;
mod extractor;
mod locator;
mod options;
mod parser;
mod structures;

pub use decompress::{
    DecompressionFilter, Decompressors, FilterLimits, RawDeflateFilter, StoreFilter,
};
pub use extractor::{Blob, EntryRef, Lookup, ZipArchive};
pub use locator::{EocdLocation, EocdLocator, LocatePhase, LocatedDirectory};
pub use options::{ArchiveOptions, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_OUTPUT_SIZE};
pub use parser::{ArchiveState, ScanMode, ScanOutcome, ZipParser};
pub use structures::*;
