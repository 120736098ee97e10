//! CSV export of the holdings view (all pages, visible columns only).

use crate::models::Holding;
use crate::table::holdings::HoldingField;
use crate::table::{CellValue, TableEngine, Tabular};
use anyhow::{Context, Result};
use std::io;
use std::path::Path;
use tracing::info;

fn csv_cell(cell: CellValue<'_>) -> String {
    match cell {
        CellValue::Missing => String::new(),
        other => other.to_string(),
    }
}

/// Write every matching row, in display order, to `writer`. Returns the row count.
pub fn write_holdings_csv<W: io::Write>(engine: &TableEngine<Holding>, writer: W) -> Result<usize> {
    let columns: Vec<HoldingField> = engine.view().visible_columns().collect();
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(columns.iter().map(|c| c.key()))
        .context("Failed to write CSV header")?;

    let rows = engine.all_matching();
    for h in &rows {
        wtr.write_record(columns.iter().map(|&c| csv_cell(h.cell(c))))
            .with_context(|| format!("Failed to write CSV row for {}", h.symbol))?;
    }
    wtr.flush().context("Failed to flush CSV output")?;

    Ok(rows.len())
}

pub fn export_holdings_csv(engine: &TableEngine<Holding>, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    let n = write_holdings_csv(engine, file)?;
    info!("Exported {} holdings to {:?}", n, path);
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::holdings::holdings_view;
    use crate::table::{SortDirection, DEFAULT_PAGE_SIZE};
    use std::num::NonZeroUsize;

    #[test]
    fn test_export_ignores_pagination() {
        let rows = vec![
            Holding::new("AB1", "One", 1.0, 10.0, 11.0, "Banking", "Large"),
            Holding::new("XY", "Two", 1.0, 10.0, 9.0, "Banking", "Mid"),
            Holding::new("AB2", "Three", 1.0, 0.0, 5.0, "FMCG", "Small"),
        ];
        let view = holdings_view(HoldingField::Symbol, NonZeroUsize::new(1).unwrap());
        let mut engine = TableEngine::new(rows, view);
        engine.set_filter("ab");
        engine.set_sort(HoldingField::Symbol, SortDirection::Descending);
        for field in HoldingField::ALL {
            let keep = matches!(field, HoldingField::Symbol | HoldingField::GainLossPercent);
            engine.set_column_visibility(field, keep);
        }

        let mut buf = Vec::new();
        let n = write_holdings_csv(&engine, &mut buf).unwrap();
        assert_eq!(n, 2);

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "symbol,gainLossPercent\nAB2,\nAB1,10\n");
    }

    #[test]
    fn test_export_default_columns() {
        let engine = TableEngine::new(
            vec![Holding::new("A", "A", 1.0, 1.0, 1.0, "Banking", "Large")],
            holdings_view(HoldingField::Symbol, DEFAULT_PAGE_SIZE),
        );
        let mut buf = Vec::new();
        write_holdings_csv(&engine, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("symbol,name,quantity,avgPrice,currentPrice,sector,marketCap,"));
    }
}
