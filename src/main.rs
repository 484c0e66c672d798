//! Main entry point for the zipscan CLI application.
//!
//! Loads a ZIP archive into memory, recovers its entries and lists or
//! extracts them.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use zipscan::{ByteSource, Cli, EntryRef, Lookup, ZipArchive};

/// Application entry point.
///
/// Parses command-line arguments, sets up logging, reads the archive and
/// dispatches to listing or extraction.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    let mut logger = env_logger::Builder::from_env(env_logger::Env::default());
    if cli.debug || std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(level);
    }
    logger.init();

    let source = ByteSource::from_file(&cli.file)
        .await
        .with_context(|| format!("cannot read {}", cli.file))?;
    let mut archive = ZipArchive::with_options(source, cli.options());
    let outcome = archive.read(cli.scan_mode());

    if !cli.is_very_quiet() && !outcome.is_complete() {
        eprintln!("warning: scan stopped early: {outcome:?}");
    }

    let lookup = effective_lookup(&archive, &cli);
    if cli.list || cli.verbose {
        list_files(&archive, lookup, cli.verbose);
        return Ok(());
    }

    process_zip(&archive, lookup, &cli).await
}

/// Pick the entry list to work from.
///
/// Falls back to local entries when the central directory could not be
/// recovered.
fn effective_lookup(archive: &ZipArchive, cli: &Cli) -> Lookup {
    let lookup = cli.lookup();
    if lookup == Lookup::CentralDirectory && archive.end_of_central_directory().is_none() {
        if !cli.is_quiet() {
            eprintln!("warning: no central directory found, using local headers");
        }
        return Lookup::Local;
    }
    lookup
}

/// Extract the entries selected by the CLI filters.
///
/// # Arguments
///
/// * `archive` - An archive that has already been read
/// * `lookup` - Which entry list to extract from
/// * `cli` - Parsed command-line arguments
///
/// # Returns
///
/// Returns `Ok(())` on success, or the first extraction or I/O error.
async fn process_zip(archive: &ZipArchive, lookup: Lookup, cli: &Cli) -> Result<()> {
    // Apply filters to determine which entries to extract:
    // 1. Skip directories (they are created on demand while writing files)
    // 2. If specific files are requested, only include matching entries
    // 3. Exclude entries matching the exclusion patterns
    let files_to_extract: Vec<_> = archive
        .list(lookup)
        .into_iter()
        .filter(|e| {
            if e.is_directory() {
                return false;
            }

            // Positional arguments restrict extraction to matching entries
            if !cli.files.is_empty() {
                let matches = cli.files.iter().any(|f| {
                    if has_glob_chars(f) {
                        glob_match(f, e.file_name())
                    } else {
                        // No wildcards: exact match on full path or basename
                        let basename = Path::new(e.file_name())
                            .file_name()
                            .map(|s| s.to_string_lossy())
                            .unwrap_or_default();
                        e.file_name() == f.as_str() || basename == *f
                    }
                });
                if !matches {
                    return false;
                }
            }

            // Drop anything matching a -x pattern
            !cli
                .exclude
                .iter()
                .any(|x| e.file_name().contains(x.as_str()) || glob_match(x, e.file_name()))
        })
        .collect();

    let multiple_files = cli.pipe && files_to_extract.len() > 1;
    for entry in files_to_extract {
        extract_file(archive, entry, cli, multiple_files).await?;
    }

    Ok(())
}

/// List files in the archive.
///
/// Supports two output formats:
/// - Simple format (`-l`): file names, one per line
/// - Verbose format (`-v`): table with sizes, compression ratio and timestamps,
///   followed by totals and the archive comment
///
/// # Arguments
///
/// * `archive` - An archive that has already been read
/// * `lookup` - Which entry list to print
/// * `verbose` - If true, print the table format
fn list_files(archive: &ZipArchive, lookup: Lookup, verbose: bool) {
    let entries = archive.list(lookup);

    if verbose {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    }

    // Totals for the summary line, directories excluded
    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in &entries {
        if !verbose {
            println!("{}", entry.file_name());
            continue;
        }

        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();
        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size(),
            entry.compressed_size(),
            ratio(entry.compressed_size(), entry.uncompressed_size()),
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name()
        );

        if !entry.is_directory() {
            total_uncompressed += entry.uncompressed_size();
            total_compressed += entry.compressed_size();
            file_count += 1;
        }
    }

    if verbose {
        println!("{}", "-".repeat(70));
        println!(
            "{:>10}  {:>10}  {}  {:>21}  {} files",
            total_uncompressed,
            total_compressed,
            ratio(total_compressed, total_uncompressed),
            "",
            file_count
        );
        if let Some(comment) = archive.comment().filter(|c| !c.is_empty()) {
            println!("{comment}");
        }
    }
}

/// Compression ratio as percentage saved.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}

/// Extract a single entry to stdout or to disk.
///
/// Handles the extraction options:
/// - Pipe mode (`-p`): write to stdout instead of a file
/// - Output directory (`-d`) and junk paths (`-j`)
/// - Overwrite control (`-n`, `-o`) for files that already exist
///
/// # Arguments
///
/// * `archive` - An archive that has already been read
/// * `entry` - The entry to extract
/// * `cli` - Parsed command-line arguments
/// * `show_filename` - If true, print a name marker before piped content
///
/// # Errors
///
/// Fails if the entry cannot be decompressed or the output cannot be written.
async fn extract_file(
    archive: &ZipArchive,
    entry: EntryRef<'_>,
    cli: &Cli,
    show_filename: bool,
) -> Result<()> {
    // Pipe mode: write contents straight to stdout
    if cli.pipe {
        let blob = archive.extract(entry, None).await?;
        let mut stdout = tokio::io::stdout();
        if show_filename {
            stdout
                .write_all(format!("--- {} ---\n", entry.file_name()).as_bytes())
                .await?;
        }
        stdout.write_all(&blob.data).await?;
        stdout.flush().await?;
        return Ok(());
    }

    // Determine the output path from -j and -d
    let file_name = if cli.junk_paths {
        Path::new(entry.file_name())
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| entry.file_name().to_string())
    } else {
        entry.file_name().to_string()
    };
    let output_path = match cli.extract_dir {
        Some(ref dir) => PathBuf::from(dir).join(&file_name),
        None => PathBuf::from(&file_name),
    };

    if output_path.exists() {
        if cli.never_overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (file exists)", entry.file_name());
            }
            return Ok(());
        }

        if !cli.overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (use -o to overwrite)", entry.file_name());
            }
            return Ok(());
        }
    }

    if !cli.is_quiet() {
        println!("  extracting: {}", entry.file_name());
    }

    let blob = archive
        .extract(entry, None)
        .await
        .with_context(|| format!("cannot extract {}", entry.file_name()))?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    fs::write(&output_path, &blob.data).await?;

    Ok(())
}

/// Check if a pattern contains glob wildcard characters.
fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Simple glob pattern matching supporting `*` and `?` wildcards.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();

    fn do_match(pattern: &[char], text: &[char]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            (Some('*'), _) => {
                do_match(&pattern[1..], text) || (!text.is_empty() && do_match(pattern, &text[1..]))
            }
            (Some('?'), Some(_)) => do_match(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if *p == *t => do_match(&pattern[1..], &text[1..]),
            _ => false,
        }
    }

    do_match(&pattern_chars, &text_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*.xml", "word/document.xml"));
        assert!(glob_match("file?.dat", "file1.dat"));
        assert!(!glob_match("*.txt", "readme.md"));
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(25, 100), "  75%");
        assert_eq!(ratio(0, 0), "  0%");
        assert_eq!(ratio(120, 100), "  0%");
    }
}
