//! Decompression filters keyed by ZIP compression method.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use flate2::{Decompress, FlushDecompress, Status};

use super::options::ArchiveOptions;
use crate::{Error, Result};

/// Bounds applied to a single filter run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterLimits {
    pub max_output: u64,
    pub chunk_size: usize,
}

impl From<&ArchiveOptions> for FilterLimits {
    fn from(options: &ArchiveOptions) -> Self {
        Self {
            max_output: options.output_limit(),
            chunk_size: options.output_chunk_size(),
        }
    }
}

impl Default for FilterLimits {
    fn default() -> Self {
        Self::from(&ArchiveOptions::default())
    }
}

/// Turns one entry's compressed bytes into its content.
///
/// Implementations must not keep state between calls; each call sees one
/// whole compressed payload.
#[async_trait]
pub trait DecompressionFilter: Send + Sync {
    async fn decompress(&self, input: &[u8], limits: FilterLimits) -> Result<Vec<u8>>;
}

/// Method 0: content is stored verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreFilter;

#[async_trait]
impl DecompressionFilter for StoreFilter {
    async fn decompress(&self, input: &[u8], limits: FilterLimits) -> Result<Vec<u8>> {
        if input.len() as u64 > limits.max_output {
            return Err(output_limit_error(limits));
        }
        Ok(input.to_vec())
    }
}

/// Method 8: raw DEFLATE without zlib or gzip framing.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDeflateFilter;

#[async_trait]
impl DecompressionFilter for RawDeflateFilter {
    async fn decompress(&self, input: &[u8], limits: FilterLimits) -> Result<Vec<u8>> {
        let mut inflater = Decompress::new(false);
        let mut chunks: Vec<Vec<u8>> = Vec::new();
        let mut produced_total = 0u64;

        loop {
            let consumed_before = inflater.total_in() as usize;
            let mut chunk = Vec::with_capacity(limits.chunk_size);
            let status = inflater
                .decompress_vec(&input[consumed_before..], &mut chunk, FlushDecompress::None)
                .map_err(|e| Error::Decompression(e.to_string()))?;
            let consumed = inflater.total_in() as usize - consumed_before;

            produced_total += chunk.len() as u64;
            if produced_total > limits.max_output {
                return Err(output_limit_error(limits));
            }

            let produced = chunk.len();
            if produced > 0 {
                chunks.push(chunk);
            }

            match status {
                Status::StreamEnd => break,
                Status::Ok | Status::BufError if consumed == 0 && produced == 0 => {
                    return Err(Error::Decompression(format!(
                        "deflate stream ended early after {consumed_before} of {} bytes",
                        input.len()
                    )));
                }
                Status::Ok | Status::BufError => {}
            }

            tokio::task::yield_now().await;
        }

        log::trace!(
            "inflated {} bytes into {produced_total} bytes in {} chunks",
            input.len(),
            chunks.len()
        );
        Ok(chunks.concat())
    }
}

fn output_limit_error(limits: FilterLimits) -> Error {
    Error::Decompression(format!(
        "output exceeds limit of {} bytes",
        limits.max_output
    ))
}

/// Registry of filters by compression method code.
#[derive(Clone)]
pub struct Decompressors {
    filters: HashMap<u16, Arc<dyn DecompressionFilter>>,
}

impl Decompressors {
    /// A registry with no methods at all.
    pub fn empty() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// Add or replace the filter for `method`.
    pub fn register(
        &mut self,
        method: u16,
        filter: impl DecompressionFilter + 'static,
    ) -> &mut Self {
        self.filters.insert(method, Arc::new(filter));
        self
    }

    pub fn get(&self, method: u16) -> Option<Arc<dyn DecompressionFilter>> {
        self.filters.get(&method).cloned()
    }

    pub fn supports(&self, method: u16) -> bool {
        self.filters.contains_key(&method)
    }
}

impl Default for Decompressors {
    /// Stored (0) and raw deflate (8).
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(0, StoreFilter).register(8, RawDeflateFilter);
        registry
    }
}

impl fmt::Debug for Decompressors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.filters.keys().copied().collect();
        methods.sort_unstable();
        f.debug_struct("Decompressors")
            .field("methods", &methods)
            .finish()
    }
}
