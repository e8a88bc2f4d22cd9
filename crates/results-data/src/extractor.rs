//! Subject block extraction.
//!
//! A results sheet holds one block per subject: a subject label, a header row
//! whose first cell is `Class` and third cell is `Total`, then one detail row
//! per class (plus an `Overall` row) up to the next fully blank row. The
//! extractor finds those blocks in a raw [`Grid`] and turns every detail row
//! with a class name into a [`Record`].
//!
//! Extraction never fails: malformed numbers coerce to `0`, a header without a
//! label row above it yields an empty subject, and a grid without headers
//! yields no records.

use std::ops::Range;

use results_core::models::{Cell, GradeCounts, Grid, Record};
use results_core::settings::DEFAULT_SUBJECT_LOOKBACK;
use tracing::debug;

/// Column holding `total`; the remaining value columns follow it in order.
pub const FIRST_VALUE_COLUMN: usize = 2;

/// Header-row column that must read `Total`.
pub const TOTAL_HEADER_COLUMN: usize = 2;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Layout assumptions used to locate subject blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Rows between the subject label and the header row.
    pub subject_lookback: usize,
    /// Expected (trimmed) content of the header row's first cell.
    pub class_header: String,
    /// Expected (trimmed) content of the header row's third cell.
    pub total_header: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            subject_lookback: DEFAULT_SUBJECT_LOOKBACK as usize,
            class_header: "Class".to_string(),
            total_header: "Total".to_string(),
        }
    }
}

impl ExtractorConfig {
    /// Default layout with a different subject lookback distance.
    pub fn with_lookback(subject_lookback: usize) -> Self {
        Self {
            subject_lookback,
            ..Self::default()
        }
    }
}

// ── Output types ──────────────────────────────────────────────────────────────

/// Location of one subject block inside a grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpan {
    /// Subject label read from the lookback row (may be empty).
    pub subject: String,
    /// Index of the `Class` / `Total` header row.
    pub header_row: usize,
    /// Detail rows, from the row after the header up to (excluding) the
    /// terminating blank row or the end of the grid.
    pub detail_rows: Range<usize>,
}

/// Records plus the block layout they were extracted from.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<Record>,
    pub blocks: Vec<BlockSpan>,
    /// Detail rows dropped because they had no class name.
    pub skipped_rows: usize,
}

// ── BlockExtractor ────────────────────────────────────────────────────────────

/// Scans a grid for subject blocks and slices them into records.
#[derive(Debug, Clone, Default)]
pub struct BlockExtractor {
    config: ExtractorConfig,
}

impl BlockExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract every record from `grid`, in row order across all blocks.
    pub fn extract(&self, grid: &Grid) -> Vec<Record> {
        self.extract_detailed(grid).records
    }

    /// Like [`extract`](Self::extract) but also reports the block layout and
    /// the number of skipped detail rows.
    pub fn extract_detailed(&self, grid: &Grid) -> Extraction {
        let blocks = self.scan_blocks(grid);
        let mut records = Vec::new();
        let mut skipped_rows = 0usize;

        for block in &blocks {
            let before = records.len();
            let mut skipped_in_block = 0usize;

            for index in block.detail_rows.clone() {
                let row = grid.row(index).unwrap_or_default();
                match class_name(row) {
                    Some(name) => records.push(record_from_row(&block.subject, name, row)),
                    None => skipped_in_block += 1,
                }
            }

            debug!(
                subject = %block.subject,
                header_row = block.header_row,
                records = records.len() - before,
                skipped = skipped_in_block,
                "extracted subject block"
            );
            skipped_rows += skipped_in_block;
        }

        Extraction {
            records,
            blocks,
            skipped_rows,
        }
    }

    /// Locate all subject blocks without building records.
    ///
    /// Every header row starts a block, including one that sits inside the
    /// detail rows of a block that was never terminated by a blank row.
    pub fn scan_blocks(&self, grid: &Grid) -> Vec<BlockSpan> {
        let mut blocks = Vec::new();

        for (i, row) in grid.rows().iter().enumerate() {
            if !self.is_header_row(row) {
                continue;
            }

            let end = (i + 1..grid.len())
                .find(|&r| is_terminator(grid.row(r).unwrap_or_default()))
                .unwrap_or(grid.len());

            blocks.push(BlockSpan {
                subject: self.subject_for(grid, i),
                header_row: i,
                detail_rows: (i + 1)..end,
            });
        }

        blocks
    }

    /// `true` when the row's first cell is the class header and its third
    /// cell is the total header (both compared after trimming).
    pub fn is_header_row(&self, row: &[Cell]) -> bool {
        cell_text(row, 0) == self.config.class_header
            && cell_text(row, TOTAL_HEADER_COLUMN) == self.config.total_header
    }

    /// Subject label for a header at `header_row`, or `""` when the lookback
    /// row is out of bounds.
    fn subject_for(&self, grid: &Grid, header_row: usize) -> String {
        header_row
            .checked_sub(self.config.subject_lookback)
            .and_then(|row| grid.cell(row, 0))
            .map(Cell::to_text)
            .unwrap_or_default()
    }
}

/// Extract records using the default layout.
pub fn extract(grid: &Grid) -> Vec<Record> {
    BlockExtractor::default().extract(grid)
}

/// Coerce an optional cell to a finite number; absent cells yield `0.0`.
pub fn to_number(cell: Option<&Cell>) -> f64 {
    cell.map_or(0.0, Cell::to_number)
}

// ── Row helpers ───────────────────────────────────────────────────────────────

/// A row where every cell is blank. Zero-length rows count as blank.
fn is_terminator(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_blank)
}

fn cell_text(row: &[Cell], col: usize) -> String {
    row.get(col).map(Cell::to_text).unwrap_or_default()
}

/// First cell, falling back to the second when the first is blank.
fn class_name(row: &[Cell]) -> Option<String> {
    [0, 1]
        .into_iter()
        .map(|col| cell_text(row, col))
        .find(|name| !name.is_empty())
}

/// Non-negative whole count; fractional values round to nearest.
fn to_count(cell: Option<&Cell>) -> u32 {
    to_number(cell).max(0.0).round() as u32
}

fn record_from_row(subject: &str, class_name: String, row: &[Cell]) -> Record {
    let value = |offset: usize| row.get(FIRST_VALUE_COLUMN + offset);

    Record {
        subject: subject.to_string(),
        class_name,
        total: to_count(value(0)),
        grades: GradeCounts {
            a_star: to_count(value(1)),
            a2: to_count(value(2)),
            b3: to_count(value(3)),
            b4: to_count(value(4)),
            c5: to_count(value(5)),
            c6: to_count(value(6)),
            d7: to_count(value(7)),
            e8: to_count(value(8)),
            u: to_count(value(9)),
        },
        total1_6: to_count(value(10)),
        pct1_6: to_number(value(11)),
        total1_8: to_count(value(12)),
        pct1_8: to_number(value(13)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::from(s)
    }

    fn num(n: f64) -> Cell {
        Cell::from(n)
    }

    fn header_row() -> Vec<Cell> {
        [
            "Class", "Teacher", "Total", "A*", "A", "B", "B", "C", "C", "D", "E", "U", "1-6",
            "% 1-6", "1-8", "% 1-8",
        ]
        .into_iter()
        .map(text)
        .collect()
    }

    fn detail_row(class: &str, total: f64, pct1_6: f64, pct1_8: f64) -> Vec<Cell> {
        let mut row = vec![text(class), text("Ms Okafor"), num(total)];
        row.extend((1..=9).map(|g| num(g as f64)));
        row.extend([num(20.0), num(pct1_6), num(26.0), num(pct1_8)]);
        row
    }

    /// Header at row 5, subject at row 3, two detail rows, then a blank row.
    fn mathematics_grid() -> Grid {
        Grid::new(vec![
            vec![text("Year 10 Results")],
            vec![],
            vec![],
            vec![text("MATHEMATICS")],
            vec![text("Summary by class")],
            header_row(),
            detail_row("Class A", 30.0, 66.7, 86.7),
            detail_row("Overall", 60.0, 70.0, 90.0),
            vec![Cell::Empty, text(""), Cell::Empty],
            vec![text("Notes: provisional")],
        ])
    }

    #[test]
    fn test_extract_single_block() {
        let records = extract(&mathematics_grid());

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.subject == "MATHEMATICS"));
        assert_eq!(records[0].class_name, "Class A");
        assert_eq!(records[0].total, 30);
        assert_eq!(records[1].class_name, "Overall");
        assert_eq!(records[1].total, 60);
    }

    #[test]
    fn test_extract_maps_value_columns_positionally() {
        let records = extract(&mathematics_grid());
        let r = &records[0];

        assert_eq!(r.grades.a_star, 1);
        assert_eq!(r.grades.a2, 2);
        assert_eq!(r.grades.b3, 3);
        assert_eq!(r.grades.b4, 4);
        assert_eq!(r.grades.c5, 5);
        assert_eq!(r.grades.c6, 6);
        assert_eq!(r.grades.d7, 7);
        assert_eq!(r.grades.e8, 8);
        assert_eq!(r.grades.u, 9);
        assert_eq!(r.total1_6, 20);
        assert!((r.pct1_6 - 66.7).abs() < 1e-9);
        assert_eq!(r.total1_8, 26);
        assert!((r.pct1_8 - 86.7).abs() < 1e-9);
    }

    #[test]
    fn test_extract_without_header_is_empty() {
        let grid = Grid::new(vec![
            vec![text("MATHEMATICS")],
            vec![text("Class"), text("Teacher"), text("Count")],
            detail_row("Class A", 30.0, 50.0, 60.0),
        ]);
        assert!(extract(&grid).is_empty());
        assert!(extract(&Grid::default()).is_empty());
    }

    #[test]
    fn test_blank_class_name_is_skipped_and_scan_continues() {
        let mut blank_name = detail_row("", 12.0, 10.0, 20.0);
        blank_name[1] = text("  ");
        let grid = Grid::new(vec![
            vec![text("PHYSICS")],
            vec![],
            header_row(),
            detail_row("11X", 25.0, 40.0, 80.0),
            blank_name,
            detail_row("11Y", 27.0, 44.0, 81.0),
            vec![],
        ]);

        let extraction = BlockExtractor::default().extract_detailed(&grid);
        let names: Vec<&str> = extraction
            .records
            .iter()
            .map(|r| r.class_name.as_str())
            .collect();
        assert_eq!(names, vec!["11X", "11Y"]);
        assert_eq!(extraction.skipped_rows, 1);
    }

    #[test]
    fn test_class_name_falls_back_to_second_cell() {
        let mut row = detail_row("", 18.0, 50.0, 75.0);
        row[1] = text("10C");
        let grid = Grid::new(vec![vec![text("ART")], vec![], header_row(), row]);

        let records = extract(&grid);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].class_name, "10C");
    }

    #[test]
    fn test_header_near_top_yields_empty_subject() {
        let grid = Grid::new(vec![
            vec![text("GEOGRAPHY")],
            header_row(),
            detail_row("9A", 20.0, 55.0, 70.0),
        ]);
        let records = extract(&grid);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].subject, "");
    }

    #[test]
    fn test_block_runs_to_end_of_grid_without_terminator() {
        let grid = Grid::new(vec![
            vec![text("CHEMISTRY")],
            vec![],
            header_row(),
            detail_row("10A", 20.0, 55.0, 70.0),
            detail_row("Overall", 20.0, 55.0, 70.0),
        ]);
        let blocks = BlockExtractor::default().scan_blocks(&grid);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].detail_rows, 3..5);
        assert_eq!(extract(&grid).len(), 2);
    }

    #[test]
    fn test_multiple_blocks_preserve_order() {
        let grid = Grid::new(vec![
            vec![text("ENGLISH")],
            vec![],
            header_row(),
            detail_row("10A", 28.0, 60.0, 80.0),
            detail_row("Overall", 28.0, 60.0, 80.0),
            vec![],
            vec![text("HISTORY")],
            vec![text("")],
            header_row(),
            detail_row("10B", 22.0, 45.0, 70.0),
            detail_row("Overall", 22.0, 45.0, 70.0),
            vec![],
        ]);

        let extraction = BlockExtractor::default().extract_detailed(&grid);
        assert_eq!(extraction.blocks.len(), 2);
        assert_eq!(extraction.blocks[0].header_row, 2);
        assert_eq!(extraction.blocks[1].header_row, 8);

        let labels: Vec<(&str, &str)> = extraction
            .records
            .iter()
            .map(|r| (r.subject.as_str(), r.class_name.as_str()))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("ENGLISH", "10A"),
                ("ENGLISH", "Overall"),
                ("HISTORY", "10B"),
                ("HISTORY", "Overall"),
            ]
        );
    }

    #[test]
    fn test_header_inside_unterminated_block_starts_new_block() {
        let grid = Grid::new(vec![
            vec![text("ENGLISH")],
            vec![],
            header_row(),
            detail_row("10A", 28.0, 60.0, 80.0),
            vec![text("HISTORY")],
            vec![text("x")],
            header_row(),
            detail_row("10B", 22.0, 45.0, 70.0),
        ]);

        let extraction = BlockExtractor::default().extract_detailed(&grid);
        assert_eq!(extraction.blocks.len(), 2);
        assert_eq!(extraction.blocks[0].subject, "ENGLISH");
        assert_eq!(extraction.blocks[0].detail_rows, 3..8);
        assert_eq!(extraction.blocks[1].subject, "HISTORY");
        assert_eq!(extraction.blocks[1].header_row, 6);
        assert_eq!(extraction.blocks[1].detail_rows, 7..8);

        // The first block still runs to its terminator, so it also holds the
        // rows of the second one.
        let labels: Vec<(&str, &str)> = extraction
            .records
            .iter()
            .map(|r| (r.subject.as_str(), r.class_name.as_str()))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("ENGLISH", "10A"),
                ("ENGLISH", "HISTORY"),
                ("ENGLISH", "x"),
                ("ENGLISH", "Class"),
                ("ENGLISH", "10B"),
                ("HISTORY", "10B"),
            ]
        );
    }

    #[test]
    fn test_row_of_zeros_does_not_terminate_block() {
        let grid = Grid::new(vec![
            vec![text("LATIN")],
            vec![],
            header_row(),
            detail_row("11A", 12.0, 50.0, 75.0),
            vec![num(0.0), num(0.0), num(0.0)],
            detail_row("11B", 14.0, 57.1, 85.7),
            vec![],
        ]);

        let extraction = BlockExtractor::default().extract_detailed(&grid);
        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].detail_rows, 3..6);

        // "0" is a class name, not a blank cell.
        let names: Vec<&str> = extraction
            .records
            .iter()
            .map(|r| r.class_name.as_str())
            .collect();
        assert_eq!(names, vec!["11A", "0", "11B"]);
    }

    #[test]
    fn test_total_header_column() {
        let mut shifted = header_row();
        shifted.swap(TOTAL_HEADER_COLUMN, TOTAL_HEADER_COLUMN + 1);
        let extractor = BlockExtractor::default();

        assert!(extractor.is_header_row(&header_row()));
        assert!(!extractor.is_header_row(&shifted));
    }

    #[test]
    fn test_missing_and_malformed_values_coerce_to_zero() {
        let row = vec![
            text("8C"),
            Cell::Empty,
            text("31"),
            text("n/a"),
            Cell::Empty,
            num(-2.0),
        ];
        let grid = Grid::new(vec![vec![text("MUSIC")], vec![], header_row(), row]);

        let records = extract(&grid);
        let r = &records[0];
        assert_eq!(r.total, 31);
        assert_eq!(r.grades.a_star, 0);
        assert_eq!(r.grades.a2, 0);
        assert_eq!(r.grades.b3, 0);
        assert_eq!(r.total1_6, 0);
        assert_eq!(r.pct1_6, 0.0);
        assert_eq!(r.pct1_8, 0.0);
        assert!(r.pct1_6.is_finite());
    }

    #[test]
    fn test_header_cells_are_trimmed() {
        let mut header = header_row();
        header[0] = text("  Class ");
        header[2] = text("Total  ");
        let grid = Grid::new(vec![
            vec![text(" BIOLOGY ")],
            vec![],
            header,
            detail_row("7A", 29.0, 51.0, 77.0),
        ]);
        let records = extract(&grid);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].subject, "BIOLOGY");
    }

    #[test]
    fn test_whitespace_only_row_terminates_block() {
        let grid = Grid::new(vec![
            vec![text("DRAMA")],
            vec![],
            header_row(),
            detail_row("9B", 24.0, 50.0, 75.0),
            vec![text("   "), Cell::Empty],
            detail_row("stray", 1.0, 1.0, 1.0),
        ]);
        let records = extract(&grid);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].class_name, "9B");
    }

    #[test]
    fn test_configurable_lookback() {
        let grid = Grid::new(vec![
            vec![text("COMPUTING")],
            header_row(),
            detail_row("12A", 15.0, 80.0, 93.3),
        ]);

        let extractor = BlockExtractor::new(ExtractorConfig::with_lookback(1));
        let records = extractor.extract(&grid);
        assert_eq!(records[0].subject, "COMPUTING");
        assert_eq!(extractor.config().subject_lookback, 1);
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(Some(&text(""))), 0.0);
        assert_eq!(to_number(Some(&Cell::Empty)), 0.0);
        assert_eq!(to_number(None), 0.0);
        assert_eq!(to_number(Some(&text("abc"))), 0.0);
        assert_eq!(to_number(Some(&text("42"))), 42.0);
        assert_eq!(to_number(Some(&num(17.0))), 17.0);
    }

    #[test]
    fn test_to_count_rounds_and_clamps() {
        assert_eq!(to_count(Some(&num(29.6))), 30);
        assert_eq!(to_count(Some(&num(-4.0))), 0);
        assert_eq!(to_count(None), 0);
    }
}
