//! Grid loading for the exam results dashboard.
//!
//! Decodes the first worksheet of a workbook (via `calamine`) or a JSON grid
//! document into a [`Grid`]. This is the only layer that touches the
//! filesystem; everything downstream operates on the in-memory grid.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use results_core::error::{Result, ResultsError};
use results_core::models::{Cell, Grid};
use tracing::{debug, info};

/// Workbook extensions handled by `calamine`.
pub const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Extension of JSON grid documents.
pub const JSON_EXTENSION: &str = "json";

// ── Public API ────────────────────────────────────────────────────────────────

/// `true` when `path` has an extension [`read_grid`] can decode.
pub fn is_supported(path: &Path) -> bool {
    source_kind(path).is_some()
}

/// Read the grid stored at `path`.
///
/// Workbooks contribute their first sheet only. Cell coordinates are kept
/// absolute, so row 0 / column 0 of the grid is always sheet cell A1.
pub fn read_grid(path: &Path) -> Result<Grid> {
    let kind =
        source_kind(path).ok_or_else(|| ResultsError::UnsupportedFormat(path.to_path_buf()))?;

    // Surface a missing or unreadable file as a read error, not a decode error.
    std::fs::metadata(path).map_err(|source| ResultsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let grid = match kind {
        SourceKind::Workbook => read_workbook_grid(path)?,
        SourceKind::Json => read_json_grid(path)?,
    };

    info!(path = %path.display(), rows = grid.len(), "loaded grid");
    Ok(grid)
}

/// Convert a `calamine` range into a grid anchored at A1.
///
/// `calamine` ranges start at the first used cell; leading rows and columns
/// are padded with empty cells so positional rules still line up.
pub fn grid_from_range(range: &Range<Data>) -> Grid {
    let Some((start_row, start_col)) = range.start() else {
        return Grid::default();
    };

    let mut rows: Vec<Vec<Cell>> = (0..start_row).map(|_| Vec::new()).collect();
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; start_col as usize];
        cells.extend(row.iter().map(cell_from_data));
        rows.push(cells);
    }

    Grid::new(rows)
}

/// Map a single `calamine` value to a grid cell.
///
/// Dates keep their serial number; error cells read as empty.
pub fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Workbook,
    Json,
}

fn source_kind(path: &Path) -> Option<SourceKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
        Some(SourceKind::Workbook)
    } else if ext == JSON_EXTENSION {
        Some(SourceKind::Json)
    } else {
        None
    }
}

fn read_workbook_grid(path: &Path) -> Result<Grid> {
    let workbook_error = |message: String| ResultsError::Workbook {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| workbook_error(e.to_string()))?;

    let sheet_names = workbook.sheet_names();
    let first = sheet_names
        .first()
        .ok_or_else(|| ResultsError::NoSheets(path.to_path_buf()))?;
    debug!(sheets = sheet_names.len(), sheet = %first, "reading first worksheet");

    let range = workbook
        .worksheet_range(first)
        .map_err(|e| workbook_error(e.to_string()))?;

    Ok(grid_from_range(&range))
}

fn read_json_grid(path: &Path) -> Result<Grid> {
    let content = std::fs::read_to_string(path).map_err(|source| ResultsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
