use clap::Parser;

use crate::{ArchiveOptions, Lookup, ScanMode};

#[derive(Parser, Debug)]
#[command(name = "zipscan")]
#[command(version)]
#[command(about = "List and extract entries from damaged or streamed ZIP archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipscan report.docx -l                list entries found by the forward scan\n  \
  zipscan report.docx -p word/document.xml   print one entry to stdout\n  \
  zipscan broken.zip --central-directory -d out   re-scan with central directory sizes")]
pub struct Cli {
    /// ZIP file path
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Files to extract (default: all)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely with sizes and timestamps
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract files to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Exclude files that follow
    #[arg(short = 'x', value_name = "FILE", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Junk paths (do not make directories)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Re-scan local entries using sizes from the central directory
    #[arg(long = "central-directory")]
    pub central_directory: bool,

    /// Use local headers instead of the central directory for listing and lookup
    #[arg(long = "local")]
    pub local: bool,

    /// Skip the EOCD hot spots and scan backwards straight away
    #[arg(long = "no-probe")]
    pub no_probe: bool,

    /// Do not re-scan automatically after a streamed entry stops the scan
    #[arg(long = "no-recover")]
    pub no_recover: bool,

    /// Largest decompressed size accepted for one entry, in bytes
    #[arg(long = "max-size", value_name = "BYTES")]
    pub max_size: Option<u64>,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    pub fn options(&self) -> ArchiveOptions {
        let options = ArchiveOptions::new()
            .probe_hot_spots(!self.no_probe)
            .recover_streamed_entries(!self.no_recover);
        match self.max_size {
            Some(bytes) => options.max_output_size(bytes),
            None => options,
        }
    }

    pub fn scan_mode(&self) -> ScanMode {
        if self.central_directory {
            ScanMode::CentralDirectory
        } else {
            ScanMode::Sequential
        }
    }

    /// Central directory unless `--local` was given.
    pub fn lookup(&self) -> Lookup {
        if self.local {
            Lookup::Local
        } else {
            Lookup::CentralDirectory
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_map_to_options() {
        let cli = Cli::parse_from([
            "zipscan",
            "a.zip",
            "--no-probe",
            "--central-directory",
            "--max-size",
            "4096",
        ]);

        let options = cli.options();
        assert!(!options.probes_hot_spots());
        assert!(options.recovers_streamed_entries());
        assert_eq!(options.output_limit(), 4096);
        assert_eq!(cli.scan_mode(), ScanMode::CentralDirectory);
        assert_eq!(cli.lookup(), Lookup::CentralDirectory);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["zipscan", "a.zip", "-p", "--local", "x.txt"]);

        assert_eq!(cli.files, vec!["x.txt"]);
        assert!(cli.is_quiet());
        assert!(!cli.is_very_quiet());
        assert_eq!(cli.options(), ArchiveOptions::default());
        assert_eq!(cli.scan_mode(), ScanMode::Sequential);
        assert_eq!(cli.lookup(), Lookup::Local);
    }
}
