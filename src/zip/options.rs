/// Default cap on the bytes one extraction may produce (1 GiB).
pub const DEFAULT_MAX_OUTPUT_SIZE: u64 = 1 << 30;

/// Default output chunk size of the raw-deflate filter.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Tunables for reading and extracting an archive.
///
/// ```
/// use zipscan::ArchiveOptions;
///
/// let options = ArchiveOptions::new()
///     .probe_hot_spots(false)
///     .max_output_size(64 * 1024 * 1024);
/// assert!(!options.probes_hot_spots());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOptions {
    probe_hot_spots: bool,
    recover_streamed_entries: bool,
    max_output_size: u64,
    chunk_size: usize,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveOptions {
    pub fn new() -> Self {
        ArchiveOptions {
            probe_hot_spots: true,
            recover_streamed_entries: true,
            max_output_size: DEFAULT_MAX_OUTPUT_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Try the usual EOCD offsets before the backward scan.
    pub fn probe_hot_spots(mut self, enabled: bool) -> Self {
        self.probe_hot_spots = enabled;
        self
    }

    /// Re-scan in central directory mode when a normal read stops on a
    /// streamed entry and the central directory was recovered.
    pub fn recover_streamed_entries(mut self, enabled: bool) -> Self {
        self.recover_streamed_entries = enabled;
        self
    }

    /// Upper bound on the decompressed size of a single entry.
    pub fn max_output_size(mut self, bytes: u64) -> Self {
        self.max_output_size = bytes;
        self
    }

    /// Size of each chunk the raw-deflate filter produces. Zero is raised to one.
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    pub fn probes_hot_spots(&self) -> bool {
        self.probe_hot_spots
    }

    pub fn recovers_streamed_entries(&self) -> bool {
        self.recover_streamed_entries
    }

    pub fn output_limit(&self) -> u64 {
        self.max_output_size
    }

    pub fn output_chunk_size(&self) -> usize {
        self.chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ArchiveOptions::default();
        assert!(options.probes_hot_spots());
        assert!(options.recovers_streamed_entries());
        assert_eq!(options.output_limit(), DEFAULT_MAX_OUTPUT_SIZE);
        assert_eq!(options.output_chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_zero_chunk_size_is_raised() {
        assert_eq!(ArchiveOptions::new().chunk_size(0).output_chunk_size(), 1);
    }
}
