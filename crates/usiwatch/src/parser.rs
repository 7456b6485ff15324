use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::types::{CourseRecord, RawTableRow};

/// Cells of the first row of a triple used for the primary fields.
const PRIMARY_CELLS: usize = 7;

/// Upper bounds browsers apply to span attributes.
const MAX_COLSPAN: usize = 1000;
const MAX_ROWSPAN: usize = 65534;

static TABLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("table#kursangebot").expect("invalid selector: course table")
});

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Course table 'kursangebot' not found in response")]
    TableNotFound,
    #[error("Unexpected course table layout: {0}")]
    Layout(#[from] ReshapeError),
}

#[derive(Debug, thiserror::Error)]
pub enum ReshapeError {
    #[error("Row count {rows} is not a multiple of 3")]
    RowCount { rows: usize },
    #[error("Row {row} has {found} cell(s), expected at least {expected}")]
    ShortRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn span_attr(cell: ElementRef, name: &str, max: usize) -> usize {
    cell.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, max)
}

pub fn locate_table(document: &Html) -> Result<ElementRef<'_>, ParseError> {
    document
        .select(&TABLE_SELECTOR)
        .next()
        .ok_or(ParseError::TableNotFound)
}

fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

/// Body rows of `table`, skipping `<thead>` and nested tables.
fn body_rows<'a>(table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let mut rows = Vec::new();
    for child in child_elements(table) {
        match child.value().name() {
            "tr" => rows.push(child),
            "tbody" | "tfoot" => rows.extend(
                child_elements(child).filter(|row| row.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

struct Carried {
    text: String,
    remaining: usize,
}

fn take_carried(carried: &mut [Option<Carried>], col: usize) -> Option<String> {
    let slot = carried.get_mut(col)?;
    let span = slot.as_mut()?;
    let text = span.text.clone();
    span.remaining -= 1;
    if span.remaining == 0 {
        *slot = None;
    }
    Some(text)
}

/// Flattens the table body into rows of cell texts. A cell with `rowspan`
/// repeats in the same column of the following rows and a cell with
/// `colspan` repeats across the following columns, so every row can be
/// addressed by column index. Rows consisting only of `<th>` cells are
/// headers and skipped.
pub fn table_rows(table: ElementRef) -> Vec<RawTableRow> {
    let mut carried: Vec<Option<Carried>> = Vec::new();
    let mut rows = Vec::new();

    for row in body_rows(table) {
        let cells: Vec<ElementRef> = child_elements(row)
            .filter(|c| matches!(c.value().name(), "td" | "th"))
            .collect();

        if cells.is_empty() || cells.iter().all(|c| c.value().name() == "th") {
            continue;
        }

        let mut values = Vec::new();
        let mut col = 0;

        for cell in cells {
            while let Some(text) = take_carried(&mut carried, col) {
                values.push(text);
                col += 1;
            }

            let text = normalize_whitespace(&elem_text(cell));
            let colspan = span_attr(cell, "colspan", MAX_COLSPAN);
            let rowspan = span_attr(cell, "rowspan", MAX_ROWSPAN);

            for _ in 0..colspan {
                if rowspan > 1 {
                    if carried.len() <= col {
                        carried.resize_with(col + 1, || None);
                    }
                    carried[col] = Some(Carried {
                        text: text.clone(),
                        remaining: rowspan - 1,
                    });
                }
                values.push(text.clone());
                col += 1;
            }
        }

        // Spans reaching past the last physical cell of this row.
        if let Some(last) = carried.iter().rposition(Option::is_some)
            && last >= col
        {
            for c in col..=last {
                values.push(take_carried(&mut carried, c).unwrap_or_default());
            }
        }

        rows.push(RawTableRow(values));
    }

    rows
}

fn require(row: &RawTableRow, index: usize, expected: usize) -> Result<(), ReshapeError> {
    if row.len() < expected {
        return Err(ReshapeError::ShortRow {
            row: index,
            expected,
            found: row.len(),
        });
    }
    Ok(())
}

fn cell(row: &RawTableRow, index: usize) -> String {
    row.cell(index).unwrap_or_default().to_string()
}

/// Folds every three physical rows into one course. The first row carries
/// the primary columns, the second one the instructor and the free slots,
/// the third one the remark on free slots.
pub fn reshape(rows: &[RawTableRow]) -> Result<Vec<CourseRecord>, ReshapeError> {
    if rows.len() % 3 != 0 {
        return Err(ReshapeError::RowCount { rows: rows.len() });
    }

    rows.chunks_exact(3)
        .enumerate()
        .map(|(k, triple)| -> Result<CourseRecord, ReshapeError> {
            let (primary, second, third) = (&triple[0], &triple[1], &triple[2]);
            require(primary, 3 * k, PRIMARY_CELLS)?;
            require(second, 3 * k + 1, 3)?;
            require(third, 3 * k + 2, 2)?;

            Ok(CourseRecord {
                id: cell(primary, 0),
                course: cell(primary, 1),
                time: cell(primary, 2),
                location: cell(primary, 3),
                rate_a: cell(primary, 4),
                rate_b: cell(primary, 5),
                rate_c: cell(primary, 6),
                instructor: cell(second, 1),
                num_free_text: cell(second, 2),
                free_text: cell(third, 1),
            })
        })
        .collect()
}

pub fn parse_course_table(html: &str) -> Result<Vec<CourseRecord>, ParseError> {
    let document = Html::parse_document(html);
    let table = locate_table(&document)?;
    let rows = table_rows(table);
    log::debug!("Course table has {} body row(s)", rows.len());
    Ok(reshape(&rows)?)
}
