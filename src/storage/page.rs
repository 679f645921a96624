//! Page files for csvdb
//!
//! A table's rows are spread over numbered page files (`1.csv`, `2.csv`, ...).
//! Each page starts with a header line naming the primary key and the
//! columns, followed by one comma-separated data row per line. Cells are not
//! quoted or escaped.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Extension of page files
pub const PAGE_EXTENSION: &str = "csv";

/// Field delimiter inside a page line
pub const DELIMITER: char = ',';

/// File name of the page with the given number
pub fn page_file_name(number: u64) -> String {
    format!("{}.{}", number, PAGE_EXTENSION)
}

/// Numeric stem of a page file, if it has one
pub fn page_number(path: &Path) -> Option<u64> {
    path.file_stem()?.to_str()?.parse().ok()
}

/// List the page files of a directory.
///
/// Numbered pages come first in numeric order; any other `.csv` file follows
/// in lexicographic order of its stem. A missing directory has no pages.
pub fn list_page_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == PAGE_EXTENSION) {
            files.push(path);
        }
    }

    files.sort_by_cached_key(|path| {
        let number = page_number(path);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        (number.is_none(), number, stem)
    });
    Ok(files)
}

/// Split a data line into its cells
pub fn parse_line(line: &str) -> Vec<String> {
    line.split(DELIMITER).map(str::to_string).collect()
}

/// Join cells into a data line (without the trailing newline)
pub fn format_line<S: AsRef<str>>(cells: &[S]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push(DELIMITER);
        }
        line.push_str(cell.as_ref());
    }
    line
}

/// Contents of one page file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageFile {
    /// Header line, absent for an empty file
    pub header: Option<String>,
    /// Non-empty data lines in file order
    pub lines: Vec<String>,
}

impl PageFile {
    /// Read a page file, skipping empty lines
    pub fn read(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut page = PageFile::default();

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            if page.header.is_none() {
                page.header = Some(line);
            } else {
                page.lines.push(line);
            }
        }
        Ok(page)
    }

    /// Number of data rows (header excluded)
    pub fn row_count(&self) -> usize {
        self.lines.len()
    }

    /// Parsed data rows
    pub fn rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.lines.iter().map(|line| parse_line(line))
    }

    /// Replace the file at `path` with this page's contents.
    ///
    /// The new contents are written to a sibling file that is then renamed
    /// over the original, so readers see either the old or the new page.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut contents = String::new();
        if let Some(header) = &self.header {
            contents.push_str(header);
            contents.push('\n');
        }
        for line in &self.lines {
            contents.push_str(line);
            contents.push('\n');
        }

        let tmp_path = path.with_extension(format!("{}.tmp", PAGE_EXTENSION));
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// Count the data rows of a page file (non-empty lines minus the header)
pub fn count_data_rows(path: &Path) -> Result<usize> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines: usize = 0;
    for line in reader.lines() {
        if !line?.is_empty() {
            lines += 1;
        }
    }
    Ok(lines.saturating_sub(1))
}
