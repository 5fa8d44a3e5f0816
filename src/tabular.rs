//! Minimal CSV reading and writing for the pipeline's interchange files.
//!
//! Every file the tools exchange is a headed, comma-separated table of short text cells,
//! so a small quote-aware reader/writer covers it. Columns are looked up by header name.

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::{self, Write};
use std::mem::take;
use std::path::Path;

/// Headed table loaded from a CSV file.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read CSV file {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut rows = parse_rows(text);
        if rows.is_empty() {
            return Self::default();
        }
        let headers = rows
            .remove(0)
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();
        Self { headers, rows }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Fails with a message naming the first missing column.
    pub fn require_columns(&self, names: &[&str]) -> Result<()> {
        for name in names {
            if self.column(name).is_none() {
                bail!("Missing required column: {name}");
            }
        }
        Ok(())
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |cells| Record { table: self, cells })
    }
}

/// One data row with access by header name.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    table: &'a Table,
    cells: &'a [String],
}

impl<'a> Record<'a> {
    /// Trimmed cell value; an absent column or short row reads as "".
    pub fn get(&self, name: &str) -> &'a str {
        self.table
            .column(name)
            .and_then(|idx| self.cells.get(idx))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    /// Trimmed cell value, `None` when blank.
    pub fn opt(&self, name: &str) -> Option<&'a str> {
        Some(self.get(name)).filter(|v| !v.is_empty())
    }
}

/// Quote- and CRLF-tolerant row splitter. Blank lines are dropped.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

fn needs_quotes(field: &str) -> bool {
    field.contains([',', '"', '\n', '\r'])
}

pub fn write_row<W: Write>(mut w: W, row: &[&str]) -> io::Result<()> {
    for (idx, cell) in row.iter().enumerate() {
        if idx > 0 {
            w.write_all(b",")?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\r\n")
}

/// Writes a headed table, creating parent directories as needed.
pub fn write_table<R, C>(path: &Path, headers: &[&str], rows: R) -> Result<()>
where
    R: IntoIterator<Item = C>,
    C: AsRef<[String]>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut buf: Vec<u8> = Vec::new();
    write_row(&mut buf, headers)?;
    for row in rows {
        let cells: Vec<&str> = row.as_ref().iter().map(String::as_str).collect();
        write_row(&mut buf, &cells)?;
    }
    fs::write(path, buf).with_context(|| format!("Failed to write CSV file {}", path.display()))?;
    Ok(())
}

/// Deletes a report left over from an earlier run, if there is one.
pub fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to remove stale file {}", path.display()))
        }
    }
}
