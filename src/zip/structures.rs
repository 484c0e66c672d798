use byteorder::{ByteOrder, LittleEndian};

use super::decoder::{FieldSpec, RawRecord, decode, latin1};
use crate::{Error, Result};

pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x04034b50;
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x08074b50;
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x02014b50;
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x06054b50;

/// General-purpose flag bit 3: CRC and sizes follow the data in a descriptor.
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// The four record kinds the scanner understands, keyed by signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    LocalFileHeader,
    DataDescriptor,
    CentralDirectoryHeader,
    EndOfCentralDirectory,
}

impl RecordKind {
    pub fn from_signature(signature: u32) -> Option<Self> {
        match signature {
            LOCAL_FILE_HEADER_SIGNATURE => Some(RecordKind::LocalFileHeader),
            DATA_DESCRIPTOR_SIGNATURE => Some(RecordKind::DataDescriptor),
            CENTRAL_DIRECTORY_SIGNATURE => Some(RecordKind::CentralDirectoryHeader),
            END_OF_CENTRAL_DIRECTORY_SIGNATURE => Some(RecordKind::EndOfCentralDirectory),
            _ => None,
        }
    }

    pub fn signature(self) -> u32 {
        match self {
            RecordKind::LocalFileHeader => LOCAL_FILE_HEADER_SIGNATURE,
            RecordKind::DataDescriptor => DATA_DESCRIPTOR_SIGNATURE,
            RecordKind::CentralDirectoryHeader => CENTRAL_DIRECTORY_SIGNATURE,
            RecordKind::EndOfCentralDirectory => END_OF_CENTRAL_DIRECTORY_SIGNATURE,
        }
    }
}

/// A record type with a fixed layout and signature.
pub trait Record: Sized {
    const KIND: RecordKind;
    const SCHEMA: &'static [FieldSpec];

    /// Build the typed record from decoded fields found at `offset` spanning `len` bytes.
    fn from_raw(raw: &RawRecord, offset: usize, len: usize) -> Self;

    /// Decode the record at `offset`, checking its signature first.
    ///
    /// Returns the record and the number of bytes it occupies.
    fn read(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let expected = Self::KIND.signature();
        let signature = data
            .get(offset..)
            .and_then(|tail| tail.get(..4))
            .map(LittleEndian::read_u32);
        if let Some(actual) = signature.filter(|&actual| actual != expected) {
            return Err(Error::InvalidSignature {
                expected,
                actual,
                offset,
            });
        }

        let (raw, len) = decode(Self::SCHEMA, data, offset)?;
        log::trace!("{:?} at {offset:#x}, {len} bytes", Self::KIND);
        Ok((Self::from_raw(&raw, offset, len), len))
    }
}

/// Local File Header - 30 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileEntry {
    pub signature: u32,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub file_name: String,
    pub extra_field: Vec<u8>,
    /// Offset of the header itself.
    pub offset: usize,
    /// Offset where the compressed payload begins.
    pub starts_at: usize,
    /// Set once a trailing data descriptor has patched the sizes and CRC.
    pub has_data_descriptor: bool,
}

impl LocalFileEntry {
    pub const MIN_SIZE: usize = 30;

    /// Whether bit 3 defers this entry's sizes to a data descriptor.
    pub fn needs_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    pub fn header_len(&self) -> usize {
        self.starts_at - self.offset
    }

    /// Copy CRC and sizes from the descriptor that follows this entry's data.
    pub fn apply_descriptor(&mut self, descriptor: &DataDescriptorEntry) {
        self.crc32 = descriptor.crc32;
        self.compressed_size = descriptor.compressed_size;
        self.uncompressed_size = descriptor.uncompressed_size;
        self.has_data_descriptor = true;
    }

    pub fn compression(&self) -> CompressionMethod {
        CompressionMethod::from_u16(self.compression_method)
    }

    pub fn is_directory(&self) -> bool {
        self.file_name.ends_with('/')
    }

    pub fn mod_date(&self) -> (u16, u8, u8) {
        dos_date(self.last_mod_date)
    }

    pub fn mod_time(&self) -> (u8, u8, u8) {
        dos_time(self.last_mod_time)
    }
}

impl Record for LocalFileEntry {
    const KIND: RecordKind = RecordKind::LocalFileHeader;
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::int("signature", 4),
        FieldSpec::int("version_needed", 2),
        FieldSpec::int("flags", 2),
        FieldSpec::int("compression_method", 2),
        FieldSpec::int("last_mod_time", 2),
        FieldSpec::int("last_mod_date", 2),
        FieldSpec::int("crc32", 4),
        FieldSpec::int("compressed_size", 4),
        FieldSpec::int("uncompressed_size", 4),
        FieldSpec::int("file_name_length", 2),
        FieldSpec::int("extra_field_length", 2),
        FieldSpec::text("file_name", "file_name_length"),
        FieldSpec::text("extra_field", "extra_field_length"),
    ];

    fn from_raw(raw: &RawRecord, offset: usize, len: usize) -> Self {
        Self {
            signature: raw.int("signature") as u32,
            version_needed: raw.int("version_needed") as u16,
            flags: raw.int("flags") as u16,
            compression_method: raw.int("compression_method") as u16,
            last_mod_time: raw.int("last_mod_time") as u16,
            last_mod_date: raw.int("last_mod_date") as u16,
            crc32: raw.int("crc32") as u32,
            compressed_size: raw.int("compressed_size"),
            uncompressed_size: raw.int("uncompressed_size"),
            file_name_length: raw.int("file_name_length") as u16,
            extra_field_length: raw.int("extra_field_length") as u16,
            file_name: latin1(raw.bytes("file_name")),
            extra_field: raw.bytes("extra_field").to_vec(),
            offset,
            starts_at: offset + len,
            has_data_descriptor: false,
        }
    }
}

/// Central Directory File Header - 46 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryEntry {
    pub signature: u32,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub file_comment_length: u16,
    pub disk_number_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    /// Offset of the matching Local File Header.
    pub local_header_offset: usize,
    pub file_name: String,
    pub extra_field: Vec<u8>,
    pub file_comment: String,
    /// Offset of this central directory header.
    pub offset: usize,
}

impl CentralDirectoryEntry {
    pub const MIN_SIZE: usize = 46;

    pub fn needs_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    pub fn compression(&self) -> CompressionMethod {
        CompressionMethod::from_u16(self.compression_method)
    }

    pub fn is_directory(&self) -> bool {
        self.file_name.ends_with('/')
    }

    pub fn mod_date(&self) -> (u16, u8, u8) {
        dos_date(self.last_mod_date)
    }

    pub fn mod_time(&self) -> (u8, u8, u8) {
        dos_time(self.last_mod_time)
    }
}

impl Record for CentralDirectoryEntry {
    const KIND: RecordKind = RecordKind::CentralDirectoryHeader;
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::int("signature", 4),
        FieldSpec::int("version_made_by", 2),
        FieldSpec::int("version_needed", 2),
        FieldSpec::int("flags", 2),
        FieldSpec::int("compression_method", 2),
        FieldSpec::int("last_mod_time", 2),
        FieldSpec::int("last_mod_date", 2),
        FieldSpec::int("crc32", 4),
        FieldSpec::int("compressed_size", 4),
        FieldSpec::int("uncompressed_size", 4),
        FieldSpec::int("file_name_length", 2),
        FieldSpec::int("extra_field_length", 2),
        FieldSpec::int("file_comment_length", 2),
        FieldSpec::int("disk_number_start", 2),
        FieldSpec::int("internal_attrs", 2),
        FieldSpec::int("external_attrs", 4),
        FieldSpec::int("local_header_offset", 4),
        FieldSpec::text("file_name", "file_name_length"),
        FieldSpec::text("extra_field", "extra_field_length"),
        FieldSpec::text("file_comment", "file_comment_length"),
    ];

    fn from_raw(raw: &RawRecord, offset: usize, _len: usize) -> Self {
        Self {
            signature: raw.int("signature") as u32,
            version_made_by: raw.int("version_made_by") as u16,
            version_needed: raw.int("version_needed") as u16,
            flags: raw.int("flags") as u16,
            compression_method: raw.int("compression_method") as u16,
            last_mod_time: raw.int("last_mod_time") as u16,
            last_mod_date: raw.int("last_mod_date") as u16,
            crc32: raw.int("crc32") as u32,
            compressed_size: raw.int("compressed_size"),
            uncompressed_size: raw.int("uncompressed_size"),
            file_name_length: raw.int("file_name_length") as u16,
            extra_field_length: raw.int("extra_field_length") as u16,
            file_comment_length: raw.int("file_comment_length") as u16,
            disk_number_start: raw.int("disk_number_start") as u16,
            internal_attrs: raw.int("internal_attrs") as u16,
            external_attrs: raw.int("external_attrs") as u32,
            local_header_offset: raw.int("local_header_offset") as usize,
            file_name: latin1(raw.bytes("file_name")),
            extra_field: raw.bytes("extra_field").to_vec(),
            file_comment: latin1(raw.bytes("file_comment")),
            offset,
        }
    }
}

/// Data Descriptor with signature - 16 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptorEntry {
    pub signature: u32,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

impl DataDescriptorEntry {
    pub const SIZE: usize = 16;
}

impl Record for DataDescriptorEntry {
    const KIND: RecordKind = RecordKind::DataDescriptor;
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::int("signature", 4),
        FieldSpec::int("crc32", 4),
        FieldSpec::int("compressed_size", 4),
        FieldSpec::int("uncompressed_size", 4),
    ];

    fn from_raw(raw: &RawRecord, _offset: usize, _len: usize) -> Self {
        Self {
            signature: raw.int("signature") as u32,
            crc32: raw.int("crc32") as u32,
            compressed_size: raw.int("compressed_size"),
            uncompressed_size: raw.int("uncompressed_size"),
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub signature: u32,
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
    pub comment: String,
    /// Offset of this record in the archive.
    pub offset: usize,
}

impl EndOfCentralDirectory {
    pub const MIN_SIZE: usize = 22;

    /// Whether any field holds a ZIP64 sentinel. ZIP64 records are not followed.
    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }
}

impl Record for EndOfCentralDirectory {
    const KIND: RecordKind = RecordKind::EndOfCentralDirectory;
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::int("signature", 4),
        FieldSpec::int("disk_number", 2),
        FieldSpec::int("disk_with_cd", 2),
        FieldSpec::int("disk_entries", 2),
        FieldSpec::int("total_entries", 2),
        FieldSpec::int("cd_size", 4),
        FieldSpec::int("cd_offset", 4),
        FieldSpec::int("comment_len", 2),
        FieldSpec::text("comment", "comment_len"),
    ];

    fn from_raw(raw: &RawRecord, offset: usize, _len: usize) -> Self {
        Self {
            signature: raw.int("signature") as u32,
            disk_number: raw.int("disk_number") as u16,
            disk_with_cd: raw.int("disk_with_cd") as u16,
            disk_entries: raw.int("disk_entries") as u16,
            total_entries: raw.int("total_entries") as u16,
            cd_size: raw.int("cd_size") as u32,
            cd_offset: raw.int("cd_offset") as u32,
            comment_len: raw.int("comment_len") as u16,
            comment: latin1(raw.bytes("comment")),
            offset,
        }
    }
}

/// Packed MS-DOS date to (year, month, day)
fn dos_date(date: u16) -> (u16, u8, u8) {
    let day = (date & 0x1F) as u8;
    let month = ((date >> 5) & 0x0F) as u8;
    let year = ((date >> 9) & 0x7F) + 1980;
    (year, month, day)
}

/// Packed MS-DOS time to (hour, minute, second)
fn dos_time(time: u16) -> (u8, u8, u8) {
    let second = ((time & 0x1F) * 2) as u8;
    let minute = ((time >> 5) & 0x3F) as u8;
    let hour = ((time >> 11) & 0x1F) as u8;
    (hour, minute, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_header(name: &[u8], flags: u16) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes());
        data.extend_from_slice(&20u16.to_le_bytes());
        data.extend_from_slice(&flags.to_le_bytes());
        data.extend_from_slice(&8u16.to_le_bytes());
        // 10:30:20 on 2024-03-15
        data.extend_from_slice(&((10 << 11) | (30 << 5) | 10u16).to_le_bytes());
        data.extend_from_slice(&(((2024 - 1980) << 9) | (3 << 5) | 15u16).to_le_bytes());
        data.extend_from_slice(&0x12345678u32.to_le_bytes());
        data.extend_from_slice(&7u32.to_le_bytes());
        data.extend_from_slice(&9u32.to_le_bytes());
        data.extend_from_slice(&(name.len() as u16).to_le_bytes());
        data.extend_from_slice(&4u16.to_le_bytes());
        data.extend_from_slice(name);
        data.extend_from_slice(&[0xAA; 4]);
        data
    }

    #[test]
    fn test_local_header() {
        let mut data = vec![0u8; 5];
        data.extend(local_header(b"dir/file.txt", 0));

        let (entry, len) = LocalFileEntry::read(&data, 5).unwrap();

        assert_eq!(len, LocalFileEntry::MIN_SIZE + 12 + 4);
        assert_eq!(entry.file_name, "dir/file.txt");
        assert_eq!(entry.extra_field, vec![0xAA; 4]);
        assert_eq!(entry.compression(), CompressionMethod::Deflate);
        assert_eq!(entry.crc32, 0x12345678);
        assert_eq!(entry.compressed_size, 7);
        assert_eq!(entry.uncompressed_size, 9);
        assert_eq!(entry.starts_at, 5 + len);
        assert_eq!(entry.header_len(), len);
        assert_eq!(entry.mod_date(), (2024, 3, 15));
        assert_eq!(entry.mod_time(), (10, 30, 20));
        assert!(!entry.needs_data_descriptor());
        assert!(!entry.is_directory());
    }

    #[test]
    fn test_descriptor_patches_local_entry() {
        let data = local_header(b"streamed", FLAG_DATA_DESCRIPTOR);
        let (mut entry, _) = LocalFileEntry::read(&data, 0).unwrap();
        assert!(entry.needs_data_descriptor());

        let mut descriptor = Vec::new();
        for value in [DATA_DESCRIPTOR_SIGNATURE, 0xCAFEBABE, 100, 250] {
            descriptor.extend_from_slice(&value.to_le_bytes());
        }
        let (dd, len) = DataDescriptorEntry::read(&descriptor, 0).unwrap();
        assert_eq!(len, DataDescriptorEntry::SIZE);

        entry.apply_descriptor(&dd);
        assert_eq!(entry.crc32, 0xCAFEBABE);
        assert_eq!(entry.compressed_size, 100);
        assert_eq!(entry.uncompressed_size, 250);
        assert!(entry.has_data_descriptor);
    }

    #[test]
    fn test_wrong_signature() {
        let data = local_header(b"x", 0);
        let err = CentralDirectoryEntry::read(&data, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidSignature {
                expected: CENTRAL_DIRECTORY_SIGNATURE,
                actual: LOCAL_FILE_HEADER_SIGNATURE,
                offset: 0,
            }
        ));
    }

    #[test]
    fn test_eocd_with_comment() {
        let mut data = Vec::new();
        data.extend_from_slice(&END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        data.extend_from_slice(&[0, 0, 0, 0, 2, 0, 2, 0]);
        data.extend_from_slice(&92u32.to_le_bytes());
        data.extend_from_slice(&0xFFFFFFFFu32.to_le_bytes());
        data.extend_from_slice(&5u16.to_le_bytes());
        data.extend_from_slice(b"hello");

        let (eocd, len) = EndOfCentralDirectory::read(&data, 0).unwrap();
        assert_eq!(len, EndOfCentralDirectory::MIN_SIZE + 5);
        assert_eq!(eocd.total_entries, 2);
        assert_eq!(eocd.cd_size, 92);
        assert_eq!(eocd.comment, "hello");
        assert!(eocd.is_zip64());
    }

    #[test]
    fn test_record_kind_signatures() {
        for kind in [
            RecordKind::LocalFileHeader,
            RecordKind::DataDescriptor,
            RecordKind::CentralDirectoryHeader,
            RecordKind::EndOfCentralDirectory,
        ] {
            assert_eq!(RecordKind::from_signature(kind.signature()), Some(kind));
        }
        assert_eq!(RecordKind::from_signature(0), None);
    }
}
