use crate::error::PipelineError;
use crate::sheet::{CellValue, OutputSheet};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Width of the field-name column so metadata labels stay readable.
const LABEL_COLUMN_WIDTH: f64 = 30.0;

/// Write all sheets into one xlsx workbook, in the given order.
pub fn write_workbook(path: &Path, sheets: &[OutputSheet]) -> Result<(), PipelineError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        worksheet.set_column_width(0, LABEL_COLUMN_WIDTH)?;
        for (r, row) in sheet.rows.iter().enumerate() {
            let r = r as u32;
            for (c, cell) in row.cells.iter().enumerate() {
                let c = c as u16;
                match (cell, row.bold) {
                    (CellValue::Text(text), true) => {
                        worksheet.write_string_with_format(r, c, text, &bold)?
                    }
                    (CellValue::Text(text), false) => worksheet.write_string(r, c, text)?,
                    (CellValue::Number(n), true) => {
                        worksheet.write_number_with_format(r, c, *n, &bold)?
                    }
                    (CellValue::Number(n), false) => worksheet.write_number(r, c, *n)?,
                    (CellValue::Empty, _) => continue,
                };
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), PipelineError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
