//! Builds small ZIP archives byte by byte for the integration tests.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;

pub const STORED: u16 = 0;
pub const DEFLATE: u16 = 8;

const DOS_TIME: u16 = (9 << 11) | (41 << 5) | 3;
const DOS_DATE: u16 = ((2023 - 1980) << 9) | (11 << 5) | 2;

#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub data: Vec<u8>,
    pub method: u16,
    /// Sizes and CRC deferred to a data descriptor.
    pub streamed: bool,
    /// Write the optional descriptor signature.
    pub signed_descriptor: bool,
    /// Method code written to the headers, leaving the data stored.
    pub declared_method: Option<u16>,
}

impl Member {
    pub fn stored(name: &str, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            data: data.to_vec(),
            method: STORED,
            streamed: false,
            signed_descriptor: true,
            declared_method: None,
        }
    }

    pub fn deflated(name: &str, data: &[u8]) -> Self {
        Self {
            method: DEFLATE,
            ..Self::stored(name, data)
        }
    }

    pub fn streamed(mut self) -> Self {
        self.streamed = true;
        self
    }

    pub fn unsigned_descriptor(mut self) -> Self {
        self.signed_descriptor = false;
        self
    }

    pub fn declared_method(mut self, method: u16) -> Self {
        self.declared_method = Some(method);
        self
    }
}

#[derive(Debug, Clone)]
pub struct BuiltMember {
    pub name: String,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub local_offset: usize,
    pub central_offset: usize,
}

#[derive(Debug, Clone)]
pub struct Built {
    pub bytes: Vec<u8>,
    pub members: Vec<BuiltMember>,
    pub cd_offset: usize,
    pub eocd_offset: usize,
}

#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    members: Vec<Member>,
    comment: Vec<u8>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    pub fn build(&self) -> Built {
        let mut out = Vec::new();
        let mut built = Vec::new();

        for member in &self.members {
            let compressed = match member.method {
                DEFLATE => deflate(&member.data),
                _ => member.data.clone(),
            };
            let crc32 = crc32fast::hash(&member.data);
            let method = member.declared_method.unwrap_or(member.method);
            let flags: u16 = if member.streamed { 0x0008 } else { 0 };
            let local_offset = out.len();

            put_u32(&mut out, 0x04034b50);
            put_u16(&mut out, 20);
            put_u16(&mut out, flags);
            put_u16(&mut out, method);
            put_u16(&mut out, DOS_TIME);
            put_u16(&mut out, DOS_DATE);
            if member.streamed {
                put_u32(&mut out, 0);
                put_u32(&mut out, 0);
                put_u32(&mut out, 0);
            } else {
                put_u32(&mut out, crc32);
                put_u32(&mut out, compressed.len() as u32);
                put_u32(&mut out, member.data.len() as u32);
            }
            put_u16(&mut out, member.name.len() as u16);
            put_u16(&mut out, 0);
            out.extend_from_slice(member.name.as_bytes());
            out.extend_from_slice(&compressed);

            if member.streamed {
                if member.signed_descriptor {
                    put_u32(&mut out, 0x08074b50);
                }
                put_u32(&mut out, crc32);
                put_u32(&mut out, compressed.len() as u32);
                put_u32(&mut out, member.data.len() as u32);
            }

            built.push(BuiltMember {
                name: member.name.clone(),
                crc32,
                compressed_size: compressed.len() as u64,
                uncompressed_size: member.data.len() as u64,
                local_offset,
                central_offset: 0,
            });
        }

        let cd_offset = out.len();
        for (member, info) in self.members.iter().zip(built.iter_mut()) {
            info.central_offset = out.len();
            put_u32(&mut out, 0x02014b50);
            put_u16(&mut out, 20);
            put_u16(&mut out, 20);
            put_u16(&mut out, if member.streamed { 0x0008 } else { 0 });
            put_u16(&mut out, member.declared_method.unwrap_or(member.method));
            put_u16(&mut out, DOS_TIME);
            put_u16(&mut out, DOS_DATE);
            put_u32(&mut out, info.crc32);
            put_u32(&mut out, info.compressed_size as u32);
            put_u32(&mut out, info.uncompressed_size as u32);
            put_u16(&mut out, member.name.len() as u16);
            put_u16(&mut out, 0);
            put_u16(&mut out, 0);
            put_u16(&mut out, 0);
            put_u16(&mut out, 0);
            put_u32(&mut out, 0);
            put_u32(&mut out, info.local_offset as u32);
            out.extend_from_slice(member.name.as_bytes());
        }
        let cd_size = out.len() - cd_offset;

        let eocd_offset = out.len();
        put_u32(&mut out, 0x06054b50);
        put_u16(&mut out, 0);
        put_u16(&mut out, 0);
        put_u16(&mut out, self.members.len() as u16);
        put_u16(&mut out, self.members.len() as u16);
        put_u32(&mut out, cd_size as u32);
        put_u32(&mut out, cd_offset as u32);
        put_u16(&mut out, self.comment.len() as u16);
        out.extend_from_slice(&self.comment);

        Built {
            bytes: out,
            members: built,
            cd_offset,
            eocd_offset,
        }
    }
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Text that compresses well and contains no ZIP signatures.
pub fn text(lines: usize) -> Vec<u8> {
    (0..lines)
        .flat_map(|i| format!("<w:p>paragraph {i}</w:p>\n").into_bytes())
        .collect()
}

/// Incompressible-looking bytes that contain no ZIP signatures.
pub fn noise(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}
