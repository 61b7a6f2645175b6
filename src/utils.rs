//! Utility functions for file handling and common operations

use crate::{LcaAniError, LcaAniResult};
use env_logger::Env;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Rows between progress messages
pub const PROGRESS_INTERVAL: usize = 10_000;

/// Initialize env_logger; `RUST_LOG` overrides the flag-derived level
pub fn init_logging(verbose: bool, debug: bool) {
    let log_level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();
}

/// Check if a file is gzip compressed
pub fn is_gzipped<P: AsRef<Path>>(path: P) -> LcaAniResult<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0; 2];

    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1f, 0x8b]),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(LcaAniError::Io(e)),
    }
}

/// Validate file paths and check if they exist
pub fn validate_file_exists<P: AsRef<Path>>(path: P) -> LcaAniResult<()> {
    if !path.as_ref().exists() {
        return Err(LcaAniError::FileNotFound(
            path.as_ref().to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

/// Validate that a file is readable
pub fn validate_file_readable<P: AsRef<Path>>(path: P) -> LcaAniResult<()> {
    validate_file_exists(&path)?;

    File::open(&path)
        .map_err(|_| LcaAniError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    Ok(())
}

/// Refuse to clobber an existing output unless forced, then create parent directories
pub fn prepare_output<P: AsRef<Path>>(path: P, force: bool) -> LcaAniResult<()> {
    let path = path.as_ref();
    if path.exists() && !force {
        return Err(LcaAniError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("Output file {:?} already exists. Use --force to overwrite.", path),
        )));
    }
    ensure_parent_dirs(path)
}

/// Check if a path has a specific extension
pub fn has_extension<P: AsRef<Path>>(path: P, extension: &str) -> bool {
    path.as_ref()
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Create parent directories if they don't exist
pub fn ensure_parent_dirs<P: AsRef<Path>>(path: P) -> LcaAniResult<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Open a plain or gzip-compressed text file
pub fn open_reader<P: AsRef<Path>>(path: P) -> LcaAniResult<Box<dyn BufRead>> {
    let file = File::open(&path)
        .map_err(|_| LcaAniError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    let reader: Box<dyn BufRead> = if is_gzipped(&path)? {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

/// Plain or gzip-compressed output file.
///
/// Flushing a gzip output finishes the stream (trailer included), so flush
/// once after the last write.
pub enum OutputWriter {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<File>),
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            OutputWriter::Plain(w) => w.write(buf),
            OutputWriter::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            OutputWriter::Plain(w) => w.flush(),
            OutputWriter::Gzip(w) => w.try_finish(),
        }
    }
}

/// Create an output file, gzip-compressed when the path ends in `.gz`
pub fn create_writer<P: AsRef<Path>>(path: P) -> LcaAniResult<OutputWriter> {
    let file = File::create(&path)?;
    let writer = if has_extension(&path, "gz") {
        OutputWriter::Gzip(GzEncoder::new(file, Compression::default()))
    } else {
        OutputWriter::Plain(BufWriter::new(file))
    };
    Ok(writer)
}

/// Open a headed CSV file (gzip-aware)
pub fn csv_reader<P: AsRef<Path>>(path: P) -> LcaAniResult<csv::Reader<Box<dyn BufRead>>> {
    let reader = open_reader(path)?;
    Ok(csv::ReaderBuilder::new().flexible(true).from_reader(reader))
}

/// Read a list of paths, one per line. Blank lines are skipped.
pub fn read_path_list<P: AsRef<Path>>(path: P) -> LcaAniResult<Vec<PathBuf>> {
    let reader = open_reader(path)?;
    let mut paths = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            paths.push(PathBuf::from(trimmed));
        }
    }
    Ok(paths)
}

/// Positional inputs followed by any listed in `--from-file`
pub fn collect_input_paths(
    positional: &[PathBuf],
    from_file: Option<&Path>,
) -> LcaAniResult<Vec<PathBuf>> {
    let mut paths = positional.to_vec();
    if let Some(list) = from_file {
        paths.extend(read_path_list(list)?);
    }
    if paths.is_empty() {
        return Err(LcaAniError::InvalidConfig(
            "no input CSVs given (pass paths or --from-file)".to_string(),
        ));
    }
    Ok(paths)
}

/// Log a progress line every `PROGRESS_INTERVAL` rows
pub fn log_progress(row: usize) {
    if row > 0 && row % PROGRESS_INTERVAL == 0 {
        log::info!("row {}", row);
    }
}

/// Timer utility for measuring execution time
pub struct Timer {
    start: std::time::Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::info!("Starting timer: {}", name);
        Timer {
            start: std::time::Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    pub fn log_elapsed(&self) {
        let duration = self.elapsed();
        log::info!("Timer '{}' elapsed: {:.2?}", self.name, duration);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.log_elapsed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_is_gzipped() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "test content").unwrap();
        assert!(!is_gzipped(temp_file.path()).unwrap());

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&[0x1f, 0x8b]).unwrap();
        assert!(is_gzipped(temp_file.path()).unwrap());
    }

    #[test]
    fn test_validate_file_exists() {
        let temp_file = NamedTempFile::new().unwrap();
        assert!(validate_file_exists(temp_file.path()).is_ok());

        assert!(validate_file_exists("/nonexistent/file").is_err());
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("out.csv.gz", "gz"));
        assert!(has_extension("out.CSV", "csv"));
        assert!(!has_extension("out.csv", "gz"));
        assert!(!has_extension("out", "csv"));
    }

    #[test]
    fn test_gzip_roundtrip_through_open_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv.gz");
        {
            let mut writer = create_writer(&path).unwrap();
            writeln!(writer, "a,b").unwrap();
            writeln!(writer, "1,2").unwrap();
        }

        assert!(is_gzipped(&path).unwrap());
        let lines: Vec<String> = open_reader(&path).unwrap().lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["a,b", "1,2"]);
    }

    #[test]
    fn test_gzip_output_complete_after_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv.gz");
        let mut writer = create_writer(&path).unwrap();
        assert!(matches!(writer, OutputWriter::Gzip(_)));
        writeln!(writer, "a,b").unwrap();
        writer.flush().unwrap();

        let mut text = String::new();
        MultiGzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "a,b\n");

        assert!(matches!(create_writer(dir.path().join("rows.csv")).unwrap(), OutputWriter::Plain(_)));
    }

    #[test]
    fn test_collect_input_paths() {
        let mut list = NamedTempFile::new().unwrap();
        writeln!(list, "  b.csv ").unwrap();
        writeln!(list).unwrap();
        writeln!(list, "c.csv").unwrap();

        let paths = collect_input_paths(&[PathBuf::from("a.csv")], Some(list.path())).unwrap();
        assert_eq!(
            paths,
            vec![PathBuf::from("a.csv"), PathBuf::from("b.csv"), PathBuf::from("c.csv")]
        );

        assert!(collect_input_paths(&[], None).is_err());
    }

    #[test]
    fn test_prepare_output() {
        let existing = NamedTempFile::new().unwrap();
        assert!(prepare_output(existing.path(), false).is_err());
        assert!(prepare_output(existing.path(), true).is_ok());

        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested/out.csv");
        assert!(prepare_output(&nested, false).is_ok());
        assert!(nested.parent().unwrap().exists());
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new("test");
        std::thread::sleep(std::time::Duration::from_millis(1));
        assert!(timer.elapsed().as_millis() >= 1);
    }
}
