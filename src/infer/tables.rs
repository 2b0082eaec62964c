//! Best-effort table detection from text alignment.
//!
//! Detects table-like regions by looking for rows of multiple spans whose
//! left edges align across several consecutive lines, separated by large
//! horizontal gaps. No graphical-line information is used. Misaligned text
//! degrades gracefully into ordinary paragraphs rather than failing.

use crate::error::Warning;
use crate::model::{Span, TableRegion};

/// A detected table with its placement.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// The cell grid.
    pub region: TableRegion,
    /// Source page.
    pub page: u32,
    /// Top Y of the region.
    pub y: f32,
}

/// Detection thresholds.
#[derive(Debug, Clone)]
pub struct TableFinderConfig {
    /// Minimum consecutive multi-span rows to accept a region.
    pub min_rows: usize,
    /// Minimum detected columns.
    pub min_columns: usize,
    /// Maximum columns; beyond this the region is word-split text.
    pub max_columns: usize,
    /// Row grouping tolerance as a fraction of font size.
    pub y_tolerance_factor: f32,
    /// Clustering width for column left edges (points).
    pub column_cluster_width: f32,
    /// Minimum gap between adjacent column edges (points).
    pub min_column_gap: f32,
    /// Fraction of multi-span rows that must hit a column edge.
    pub min_alignment_ratio: f32,
}

impl Default for TableFinderConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            column_cluster_width: 8.0,
            min_column_gap: 15.0,
            min_alignment_ratio: 0.5,
        }
    }
}

/// A row of spans grouped by baseline.
#[derive(Debug, Clone)]
struct Row {
    y: f32,
    spans: Vec<Span>,
}

/// Detects tables in one page's spans.
pub struct TableFinder {
    config: TableFinderConfig,
}

impl TableFinder {
    /// Create a finder with default thresholds.
    pub fn new() -> Self {
        Self {
            config: TableFinderConfig::default(),
        }
    }

    /// Create a finder with custom thresholds.
    pub fn with_config(config: TableFinderConfig) -> Self {
        Self { config }
    }

    /// Detect table regions.
    ///
    /// Returns detected tables, the spans that were not part of any table,
    /// and warnings for regions that looked table-like but were degraded.
    pub fn detect(&self, spans: Vec<Span>) -> (Vec<DetectedTable>, Vec<Span>, Vec<Warning>) {
        if spans.len() < self.config.min_rows * self.config.min_columns {
            return (vec![], spans, vec![]);
        }

        let rows = self.group_into_rows(&spans);
        let mut tables = Vec::new();
        let mut warnings = Vec::new();
        let mut used = vec![false; rows.len()];

        // Contiguous runs of multi-span rows are table candidates.
        let mut i = 0;
        while i < rows.len() {
            if rows[i].spans.len() < 2 {
                i += 1;
                continue;
            }
            let start = i;
            while i < rows.len() && rows[i].spans.len() >= 2 {
                i += 1;
            }
            let candidate = &rows[start..i];

            if candidate.len() < self.config.min_rows {
                continue;
            }

            let page = candidate[0].spans[0].page;
            match self.columns_for(candidate) {
                Some(columns) if columns.len() > self.config.max_columns => {
                    warnings.push(Warning::Classification {
                        page,
                        detail: format!(
                            "table-like region with {} columns degraded to paragraphs",
                            columns.len()
                        ),
                    });
                }
                Some(columns) => {
                    let cells = candidate
                        .iter()
                        .map(|row| assign_cells(row, &columns))
                        .collect();
                    tables.push(DetectedTable {
                        region: TableRegion::new(cells, columns),
                        page,
                        y: candidate[0].y,
                    });
                    for flag in used.iter_mut().take(i).skip(start) {
                        *flag = true;
                    }
                }
                None => {}
            }
        }

        // Spans of unused rows flow back to the body.
        let mut leftover = Vec::new();
        for (row, taken) in rows.into_iter().zip(used) {
            if !taken {
                leftover.extend(row.spans);
            }
        }

        (tables, leftover, warnings)
    }

    /// Group spans into rows by baseline.
    fn group_into_rows(&self, spans: &[Span]) -> Vec<Row> {
        let mut sorted = spans.to_vec();
        sorted.sort_by(|a, b| {
            let y_cmp = b
                .baseline
                .partial_cmp(&a.baseline)
                .unwrap_or(std::cmp::Ordering::Equal);
            if y_cmp == std::cmp::Ordering::Equal {
                a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal)
            } else {
                y_cmp
            }
        });

        let mut rows: Vec<Row> = Vec::new();
        let mut current: Vec<Span> = Vec::new();
        let mut current_y: Option<f32> = None;

        for span in sorted {
            let tolerance = span.font_size * self.config.y_tolerance_factor;
            match current_y {
                Some(y) if (span.baseline - y).abs() <= tolerance => current.push(span),
                _ => {
                    if !current.is_empty() {
                        let avg =
                            current.iter().map(|s| s.baseline).sum::<f32>() / current.len() as f32;
                        rows.push(Row {
                            y: avg,
                            spans: std::mem::take(&mut current),
                        });
                    }
                    current_y = Some(span.baseline);
                    current.push(span);
                }
            }
        }
        if !current.is_empty() {
            let avg = current.iter().map(|s| s.baseline).sum::<f32>() / current.len() as f32;
            rows.push(Row {
                y: avg,
                spans: current,
            });
        }

        rows
    }

    /// Column left edges consistent across the candidate rows, or `None`
    /// when the rows do not align into columns.
    fn columns_for(&self, rows: &[Row]) -> Option<Vec<f32>> {
        // Cluster left edges across all rows.
        let mut edges: Vec<f32> = rows
            .iter()
            .flat_map(|r| r.spans.iter().map(|s| s.x0))
            .collect();
        edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut clusters: Vec<(f32, usize)> = Vec::new();
        for edge in edges {
            match clusters.last_mut() {
                Some((center, count))
                    if (edge - *center).abs() <= self.config.column_cluster_width =>
                {
                    *center = (*center * *count as f32 + edge) / (*count as f32 + 1.0);
                    *count += 1;
                }
                _ => clusters.push((edge, 1)),
            }
        }

        // A column edge must be hit by a majority of rows.
        let min_hits =
            ((rows.len() as f32 * self.config.min_alignment_ratio).ceil() as usize).max(2);
        let mut columns: Vec<f32> = clusters
            .into_iter()
            .filter(|(_, count)| *count >= min_hits)
            .map(|(center, _)| center)
            .collect();

        // Adjacent edges closer than the minimum gap collapse into one.
        columns.dedup_by(|b, a| (*b - *a).abs() < self.config.min_column_gap);

        if columns.len() >= self.config.min_columns {
            Some(columns)
        } else {
            None
        }
    }
}

impl Default for TableFinder {
    fn default() -> Self {
        Self::new()
    }
}

/// Assign a row's spans to cells by column boundary, joining spans that fall
/// into the same cell.
fn assign_cells(row: &Row, columns: &[f32]) -> Vec<String> {
    let mut cells = vec![String::new(); columns.len()];

    for span in &row.spans {
        // Last column whose edge is at or left of the span start.
        let idx = columns
            .iter()
            .rposition(|edge| span.x0 >= edge - 4.0)
            .unwrap_or(0);
        if !cells[idx].is_empty() {
            cells[idx].push(' ');
        }
        cells[idx].push_str(span.text.trim());
    }

    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x: f32, y: f32) -> Span {
        let mut s = Span::new(text.to_string(), 1, x, y, 10.0, "Helvetica".to_string());
        s.x1 = s.x0 + text.chars().count() as f32 * 5.0;
        s
    }

    fn grid() -> Vec<Span> {
        vec![
            span("Name", 72.0, 700.0),
            span("Age", 250.0, 700.0),
            span("City", 400.0, 700.0),
            span("Alice", 72.0, 685.0),
            span("30", 250.0, 685.0),
            span("Lisbon", 400.0, 685.0),
            span("Bob", 72.0, 670.0),
            span("25", 250.0, 670.0),
            span("Porto", 400.0, 670.0),
        ]
    }

    #[test]
    fn test_detect_simple_grid() {
        let (tables, leftover, warnings) = TableFinder::new().detect(grid());

        assert_eq!(tables.len(), 1);
        assert!(leftover.is_empty());
        assert!(warnings.is_empty());

        let region = &tables[0].region;
        assert!(region.best_effort);
        assert_eq!(region.rows.len(), 3);
        assert_eq!(region.column_count(), 3);
        assert_eq!(region.rows[1], vec!["Alice", "30", "Lisbon"]);
    }

    #[test]
    fn test_prose_is_not_a_table() {
        // Single span per line: plain paragraph text.
        let spans = vec![
            span("This is the first line of a paragraph", 72.0, 700.0),
            span("and this is the second line of it,", 72.0, 686.0),
            span("followed by a third.", 72.0, 672.0),
        ];
        let (tables, leftover, _) = TableFinder::new().detect(spans);

        assert!(tables.is_empty());
        assert_eq!(leftover.len(), 3);
    }

    #[test]
    fn test_misaligned_rows_degrade() {
        // Two-span rows whose left edges never line up: no stable columns.
        let spans = vec![
            span("alpha", 72.0, 700.0),
            span("beta", 180.0, 700.0),
            span("gamma", 110.0, 685.0),
            span("delta", 320.0, 685.0),
            span("epsilon", 95.0, 670.0),
            span("zeta", 260.0, 670.0),
        ];
        let (tables, leftover, _) = TableFinder::new().detect(spans);

        assert!(tables.is_empty());
        assert_eq!(leftover.len(), 6);
    }

    #[test]
    fn test_two_column_two_row_minimum() {
        let spans = vec![
            span("Key", 72.0, 700.0),
            span("Value", 300.0, 700.0),
            span("Size", 72.0, 686.0),
            span("42", 300.0, 686.0),
        ];
        let (tables, _, _) = TableFinder::new().detect(spans);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].region.rows[0], vec!["Key", "Value"]);
    }
}
