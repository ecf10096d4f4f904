//! Render a `Report` to an .xlsx file
//!
//! The workbook is serialized in memory and written through a temporary file
//! in the destination directory, then renamed into place. A failed run
//! leaves no output file behind.

use crate::error::{CompareError, Result};
use crate::report::{Cell, Chart, ColumnFormat, Report, Sheet};
use rust_xlsxwriter::{
    Chart as XlsxChart, ChartType, Format, Formula, Workbook, Worksheet, XlsxError,
};
use std::io::Write;
use std::path::Path;
use tracing::info;

const CURRENCY_FORMAT: &str = "$#,##0.00";
/// Excel's built-in "0%" format
const PERCENT_FORMAT_INDEX: u8 = 9;

impl From<XlsxError> for CompareError {
    fn from(e: XlsxError) -> Self {
        CompareError::Workbook(e.to_string())
    }
}

fn column_format(format: ColumnFormat) -> Format {
    match format {
        ColumnFormat::Currency => Format::new().set_num_format(CURRENCY_FORMAT),
        ColumnFormat::Percent => Format::new().set_num_format_index(PERCENT_FORMAT_INDEX),
    }
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<()> {
    worksheet.set_name(&sheet.name)?;

    for (columns, format) in &sheet.column_formats {
        let format = column_format(*format);
        for col in columns.clone() {
            worksheet.set_column_format(col, &format)?;
        }
    }

    for (row, cells) in sheet.rows.iter().enumerate() {
        let row = row as u32;
        for (col, cell) in cells.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(text) => {
                    worksheet.write_string(row, col, text)?;
                }
                Cell::Number(number) => {
                    worksheet.write_number(row, col, *number)?;
                }
                Cell::Formula(formula) => {
                    worksheet.write_formula(row, col, Formula::new(formula))?;
                }
                Cell::Blank => {}
            }
        }
    }
    Ok(())
}

fn build_chart(chart: &Chart) -> XlsxChart {
    let mut xlsx_chart = XlsxChart::new(ChartType::ColumnStacked);
    for series in &chart.series {
        xlsx_chart
            .add_series()
            .set_name(series.name.as_str())
            .set_categories(series.categories.as_str())
            .set_values(series.values.as_str());
    }
    xlsx_chart.title().set_name(chart.title.as_str());
    xlsx_chart.x_axis().set_name(chart.x_axis.as_str());
    xlsx_chart.y_axis().set_name(chart.y_axis.as_str());
    xlsx_chart
}

/// Serialize `report` to xlsx bytes
pub fn render(report: &Report) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    for sheet in &report.sheets {
        let worksheet = workbook.add_worksheet();
        write_sheet(worksheet, sheet)?;
    }

    for chart in &report.charts {
        let chartsheet = workbook.add_chartsheet();
        chartsheet.set_name(&chart.sheet_name)?;
        chartsheet.insert_chart(0, 0, &build_chart(chart))?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Write `report` to `path`, replacing any existing file only on success
pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    let bytes = render(report)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(&bytes)?;
    temp.flush()?;
    temp.persist(path).map_err(|e| CompareError::Io(e.error))?;

    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gather::ClusterSnapshot;
    use crate::pricing::PriceBook;
    use crate::report::build_report;
    use crate::usage::ClusterUsageTotal;
    use tempfile::TempDir;

    fn report() -> Report {
        let snapshots = vec![ClusterSnapshot {
            name: "demo".to_string(),
            usage: Some(ClusterUsageTotal {
                instance_type: "m5.large".to_string(),
                instance_count: 1,
                remaining_cpu: 1024,
                total_cpu: 2048,
                remaining_memory: 4096,
                total_memory: 7680,
                mixed_instance_types: false,
            }),
            services: Vec::new(),
        }];
        build_report(&snapshots, &PriceBook::default())
    }

    #[test]
    fn test_render_produces_zip() {
        let bytes = render(&report()).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_write_report_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("demo-ECS.xlsx");

        write_report(&report(), &path).unwrap();
        assert!(path.exists());

        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path() != path)
            .collect();
        assert!(leftovers.is_empty(), "temporary file left behind");
    }

    #[test]
    fn test_write_report_into_missing_dir_fails_cleanly() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("out.xlsx");
        assert!(write_report(&report(), &path).is_err());
        assert!(!path.exists());
    }
}
