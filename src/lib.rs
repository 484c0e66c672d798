//! # zipscan
//!
//! An in-memory ZIP reader built to recover entries from archives that
//! stricter readers reject.
//!
//! Office suites and other streaming encoders often write entries without
//! sizes in their local headers, append the real sizes in a data descriptor,
//! and may leave the End of Central Directory (EOCD) record somewhere other
//! than the last 22 bytes. This library scans such archives forward from the
//! first byte, falls back to searching for the EOCD when the scan cannot
//! finish, and decompresses individual members on demand.
//!
//! ## Features
//!
//! - Forward scan of local headers, data descriptors and the central directory
//! - EOCD recovery by probing likely offsets, then scanning backwards
//! - Central directory mode to bridge streamed entries with unknown sizes
//! - STORED and raw DEFLATE extraction, with pluggable filters for other methods
//!
//! ## Example
//!
//! ```no_run
//! use zipscan::{ByteSource, Lookup, ScanMode, ZipArchive};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = ByteSource::from_file("report.docx").await?;
//!     let mut archive = ZipArchive::open(source);
//!
//!     let outcome = archive.read(ScanMode::Sequential);
//!     println!("scan ended with {outcome:?}");
//!
//!     for entry in archive.entries() {
//!         println!("{} ({} bytes)", entry.file_name, entry.uncompressed_size);
//!     }
//!
//!     if let Some(blob) = archive.extract_by_name("[Content_Types].xml", Lookup::Local).await? {
//!         println!("{}", String::from_utf8_lossy(&blob.data));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, Result};
pub use io::ByteSource;
pub use zip::{
    ArchiveOptions, Blob, CentralDirectoryEntry, EntryRef, EocdLocation, LocalFileEntry,
    LocatePhase, Lookup, ScanMode, ScanOutcome, ZipArchive, ZipParser,
};
