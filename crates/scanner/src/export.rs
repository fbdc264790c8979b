use std::fs::File;
use std::io::Write;
use std::path::Path;

use common::error::{ScanError, ScanResult};

use crate::ranking::{MetricField, RankedTable};
use crate::services::scan_service::ScanOutcome;

const CSV_HEADER: [&str; 8] = [
    "symbol",
    "last_price",
    "pct_change_%",
    "breakout_%",
    "vol_z",
    "vol_breakout",
    "relative_strength",
    "score",
];

/// Header row followed by one row per record, in rank order.
pub fn write_csv<W: Write>(table: &RankedTable, writer: W) -> ScanResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(CSV_HEADER).map_err(export_error)?;
    for record in table.iter() {
        wtr.serialize(record).map_err(export_error)?;
    }
    wtr.flush().map_err(|e| ScanError::Export(e.to_string()))?;
    Ok(())
}

pub fn save_csv(table: &RankedTable, path: impl AsRef<Path>) -> ScanResult<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .map_err(|e| ScanError::Export(format!("{}: {}", path.display(), e)))?;
    write_csv(table, file)
}

fn export_error(e: csv::Error) -> ScanError {
    ScanError::Export(e.to_string())
}

/// Console report of the `top` best ranked symbols.
pub fn generate_text_report(outcome: &ScanOutcome, top: usize) -> String {
    let mut out = String::new();

    out.push_str("================================================================\n");
    out.push_str("                  MOMENTUM SCANNER REPORT\n");
    out.push_str("================================================================\n\n");
    out.push_str(&format!("Scanned at: {}\n", outcome.scanned_at.format("%Y-%m-%d %H:%M:%S UTC")));
    out.push_str(&format!("Universe: {} symbols\n", outcome.universe_size));
    out.push_str(&format!("Ranked: {}\n", outcome.table.len()));
    out.push_str(&format!("Skipped: {}\n\n", outcome.skipped.len()));

    if outcome.table.is_empty() {
        out.push_str("No data: no symbol produced usable metrics.\n");
        return out;
    }

    out.push_str(&format!("{:<4} {:<14}", "#", "Symbol"));
    for field in MetricField::ALL {
        out.push_str(&format!(" {:>20}", field.label()));
    }
    out.push('\n');
    out.push_str(&"-".repeat(19 + 21 * MetricField::ALL.len()));
    out.push('\n');

    for (i, record) in outcome.table.iter().take(top).enumerate() {
        out.push_str(&format!("{:<4} {:<14}", i + 1, record.symbol.to_string()));
        for field in MetricField::ALL {
            match field {
                MetricField::LastPrice => out.push_str(&format!(" {:>20.6}", field.value(record))),
                _ => out.push_str(&format!(" {:>20.2}", field.value(record))),
            }
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::models::{MetricRecord, Symbol};

    fn record(base: &str, score: f64) -> MetricRecord {
        MetricRecord {
            symbol: Symbol::new(base, "USDT"),
            last_price: 0.123456,
            pct_change: 5.0,
            breakout: 10.0,
            vol_z: 1.0,
            vol_breakout: -0.5,
            relative_strength: 0.2,
            score,
        }
    }

    #[test]
    fn test_csv_header_and_rows() {
        let table = RankedTable::from_records(vec![record("ETH", 1.5), record("BTC", 6.62)]);
        let mut buf = Vec::new();
        write_csv(&table, &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "symbol,last_price,pct_change_%,breakout_%,vol_z,vol_breakout,relative_strength,score"
        );
        assert_eq!(lines[1], "BTC/USDT,0.123456,5.0,10.0,1.0,-0.5,0.2,6.62");
        assert!(lines[2].starts_with("ETH/USDT,"));
    }

    #[test]
    fn test_csv_empty_table_has_header_only() {
        let mut buf = Vec::new();
        write_csv(&RankedTable::default(), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_report_lists_top_rows() {
        let outcome = ScanOutcome {
            table: RankedTable::from_records(vec![record("AAA", 1.0), record("BBB", 2.0), record("CCC", 3.0)]),
            skipped: Vec::new(),
            universe_size: 3,
            scanned_at: Utc::now(),
        };

        let report = generate_text_report(&outcome, 2);
        assert!(report.contains("CCC/USDT"));
        assert!(report.contains("BBB/USDT"));
        assert!(!report.contains("AAA/USDT"));
        assert!(report.contains("Composite Score"));
    }

    #[test]
    fn test_report_empty_is_no_data() {
        let outcome = ScanOutcome {
            table: RankedTable::default(),
            skipped: Vec::new(),
            universe_size: 0,
            scanned_at: Utc::now(),
        };
        assert!(generate_text_report(&outcome, 20).contains("No data"));
    }
}
