use crate::error::Result;
use crate::model::Dataset;
use std::io::Write;

/// Write the dataset as CSV: `day`, every time-indexed column, then every
/// summary column broadcast onto each row. Absent cells are empty.
///
/// A dataset with summary columns but no days still gets one row (empty
/// `day`) so scalar readings are not lost.
pub fn write_csv<W: Write>(out: &mut W, data: &Dataset) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(std::iter::once("day").chain(data.column_names()))?;

    let summary: Vec<String> = data
        .summary
        .iter()
        .map(|c| c.statistic.value.to_string())
        .collect();

    if data.days.is_empty() && !summary.is_empty() {
        let row = std::iter::once("")
            .chain(data.columns.iter().map(|_| ""))
            .chain(summary.iter().map(String::as_str));
        wtr.write_record(row)?;
    }

    for (i, day) in data.days.iter().enumerate() {
        let mut row: Vec<String> = Vec::with_capacity(1 + data.columns.len() + summary.len());
        row.push(day.to_string());
        row.extend(
            data.columns
                .iter()
                .map(|c| c.cells[i].map(|v| v.to_string()).unwrap_or_default()),
        );
        row.extend(summary.iter().cloned());
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn render_csv(data: &Dataset) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(&mut buf, data)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Pretty JSON; absent cells serialize as `null`.
pub fn render_json(data: &Dataset) -> Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}
