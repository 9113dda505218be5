//! Tabular rendering of reconciled aggregates.
//!
//! The sheet mirrors the spreadsheet HR downloads: a two-row header with `Pegawai` and `Jumlah`
//! groups, four sub-columns per date, and highlight flags for Sunday columns and late dates.
//! Cell styling and workbook generation happen downstream; this module only decides values,
//! merges and highlights. Numeric cells are the aggregate's own numbers rendered verbatim.

use std::io::Write;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::domain::{is_non_working_day, ApprovalStatus, DateRange};
use super::reconciliation::{DailyAttendanceRecord, EmployeeAggregate};

const IDENTITY_COLUMNS: [&str; 3] = ["No", "NIP", "Nama"];
const DATE_COLUMNS: [&str; 4] = ["IN", "LATE", "OUT", "OVERTIME"];
const TOTAL_COLUMNS: [&str; 5] = ["Hadir", "Telat", "Lembur", "Alpha", "Tidak Absen Pulang"];
const NOT_APPLICABLE: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetCell {
    pub value: String,
    pub highlight: bool,
}

impl SheetCell {
    fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            highlight: false,
        }
    }

    fn flagged(value: impl Into<String>, highlight: bool) -> Self {
        Self {
            value: value.into(),
            highlight,
        }
    }
}

/// Horizontal merge of header cells on one row, inclusive column bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergedRange {
    pub row: usize,
    pub first_column: usize,
    pub last_column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceSheet {
    pub header: Vec<Vec<SheetCell>>,
    pub rows: Vec<Vec<SheetCell>>,
    pub merges: Vec<MergedRange>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write attendance sheet: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush attendance sheet: {0}")]
    Io(#[from] std::io::Error),
}

/// Lay out the aggregates over `range`, one row per employee in the given order.
pub fn export_aggregate(aggregates: &[EmployeeAggregate], range: DateRange) -> AttendanceSheet {
    let mut group_row: Vec<SheetCell> = Vec::new();
    let mut column_row: Vec<SheetCell> = Vec::new();
    let mut merges = Vec::new();

    merges.push(MergedRange {
        row: 0,
        first_column: 0,
        last_column: IDENTITY_COLUMNS.len() - 1,
    });
    group_row.push(SheetCell::plain("Pegawai"));
    group_row.extend((1..IDENTITY_COLUMNS.len()).map(|_| SheetCell::plain("")));
    column_row.extend(IDENTITY_COLUMNS.iter().map(|name| SheetCell::plain(*name)));

    for date in range.days() {
        let sunday = is_non_working_day(date);
        let first_column = group_row.len();
        group_row.push(SheetCell::flagged(date.format("%d/%m/%Y").to_string(), sunday));
        group_row.extend((1..DATE_COLUMNS.len()).map(|_| SheetCell::flagged("", sunday)));
        column_row.extend(
            DATE_COLUMNS
                .iter()
                .map(|name| SheetCell::flagged(*name, sunday)),
        );
        merges.push(MergedRange {
            row: 0,
            first_column,
            last_column: first_column + DATE_COLUMNS.len() - 1,
        });
    }

    let first_total = group_row.len();
    group_row.push(SheetCell::plain("Jumlah"));
    group_row.extend((1..TOTAL_COLUMNS.len()).map(|_| SheetCell::plain("")));
    column_row.extend(TOTAL_COLUMNS.iter().map(|name| SheetCell::plain(*name)));
    merges.push(MergedRange {
        row: 0,
        first_column: first_total,
        last_column: first_total + TOTAL_COLUMNS.len() - 1,
    });

    let rows = aggregates
        .iter()
        .enumerate()
        .map(|(index, aggregate)| employee_row(index + 1, aggregate, range))
        .collect();

    AttendanceSheet {
        header: vec![group_row, column_row],
        rows,
        merges,
    }
}

fn employee_row(number: usize, aggregate: &EmployeeAggregate, range: DateRange) -> Vec<SheetCell> {
    let mut row = vec![
        SheetCell::plain(number.to_string()),
        SheetCell::plain(aggregate.nip.clone()),
        SheetCell::plain(aggregate.name.clone()),
    ];

    for date in range.days() {
        let sunday = is_non_working_day(date);
        match aggregate.record(date) {
            Some(record) => {
                let highlight = sunday || record.late_minutes.is_some_and(|late| late >= 1);
                row.extend(
                    date_cells(record)
                        .into_iter()
                        .map(|value| SheetCell::flagged(value, highlight)),
                );
            }
            None => row.extend((0..DATE_COLUMNS.len()).map(|_| SheetCell::flagged("", sunday))),
        }
    }

    row.extend(
        [
            aggregate.total_days.to_string(),
            aggregate.total_late.to_string(),
            aggregate.total_overtime.to_string(),
            aggregate.total_alpha.to_string(),
            aggregate.total_empty_out.to_string(),
        ]
        .into_iter()
        .map(SheetCell::plain),
    );

    row
}

fn date_cells(record: &DailyAttendanceRecord) -> [String; 4] {
    let minutes = |value: Option<i64>| {
        value
            .map(|minutes| minutes.to_string())
            .unwrap_or_else(|| NOT_APPLICABLE.to_string())
    };

    if let Some(remark) = record.remark.filter(|kind| kind.is_leave()) {
        return [
            remark.label().to_string(),
            NOT_APPLICABLE.to_string(),
            String::new(),
            NOT_APPLICABLE.to_string(),
        ];
    }

    let check_in = clock(record.check_in);
    let check_in = if record.status == ApprovalStatus::Rejected {
        format!("{check_in} (ditolak)")
    } else {
        check_in
    };

    [
        check_in,
        minutes(record.late_minutes),
        clock(record.check_out),
        minutes(record.overtime_minutes),
    ]
}

fn clock(value: Option<NaiveDateTime>) -> String {
    value
        .map(|timestamp| timestamp.format("%H:%M").to_string())
        .unwrap_or_default()
}

impl AttendanceSheet {
    pub fn column_count(&self) -> usize {
        self.header.first().map_or(0, Vec::len)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        let mut csv_writer = csv::WriterBuilder::new().flexible(false).from_writer(writer);
        for row in self.header.iter().chain(self.rows.iter()) {
            csv_writer.write_record(row.iter().map(|cell| cell.value.as_str()))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, ExportError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
