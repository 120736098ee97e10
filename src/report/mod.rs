//! Plain-text rendering of the dashboard views.
//!
//! Analytics errors render as neutral placeholders; they never show up as
//! zero figures.

use crate::dashboard::DerivedMetrics;
use crate::error::AnalyticsError;
use crate::models::{AllocationBucket, Holding, Series, Snapshot};
use crate::table::holdings::HoldingField;
use crate::table::{CellValue, VisiblePage};
use crate::utils::{fmt_amount, fmt_pct};
use std::fmt;

const RULE: &str = "─────────────────────────────────────────────";

pub fn fmt_cell(field: HoldingField, cell: CellValue<'_>) -> String {
    match (field, cell) {
        (_, CellValue::Missing) => "—".to_string(),
        (_, CellValue::Text(s)) => s.to_string(),
        (HoldingField::GainLossPercent, CellValue::Number(n)) => fmt_pct(Some(n)),
        (HoldingField::Quantity, CellValue::Number(n)) => format!("{}", n),
        (_, CellValue::Number(n)) => fmt_amount(n),
    }
}

fn empty_state(err: AnalyticsError) -> &'static str {
    match err {
        AnalyticsError::EmptyInput | AnalyticsError::InsufficientHistory => {
            "Not enough performance history yet."
        }
        AnalyticsError::EmptyPortfolio => "No holdings yet.",
        AnalyticsError::NoInvestment => "Nothing invested yet.",
        AnalyticsError::ZeroPortfolioValue => "Portfolio has no market value.",
    }
}

// ── Holdings table ────────────────────────────────────────────────────────────

struct HoldingsTable<'p, 'a>(&'p VisiblePage<'a, Holding>);

impl fmt::Display for HoldingsTable<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let page = self.0;

        if page.is_empty() {
            return if page.total_count == 0 {
                writeln!(f, "No holdings to show.")
            } else {
                writeln!(
                    f,
                    "No holdings match the current filter ({} hidden).",
                    page.total_count
                )
            };
        }

        let header: Vec<String> = page.columns.iter().map(|c| c.title().to_string()).collect();
        let body: Vec<Vec<String>> = page
            .rows
            .iter()
            .map(|r| {
                page.columns
                    .iter()
                    .zip(&r.cells)
                    .map(|(&field, &cell)| fmt_cell(field, cell))
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = (0..header.len())
            .map(|i| {
                body.iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(header[i].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&page.columns)
                .zip(&widths)
                .map(|((cell, field), &w)| {
                    if field.is_numeric() {
                        format!("{:>w$}", cell, w = w)
                    } else {
                        format!("{:<w$}", cell, w = w)
                    }
                })
                .collect::<Vec<_>>()
                .join("  ")
        };

        writeln!(f, "{}", line(&header).trim_end())?;
        for row in &body {
            writeln!(f, "{}", line(row).trim_end())?;
        }
        writeln!(
            f,
            "Page {} of {} · {} of {} holdings",
            page.page_index + 1,
            page.page_count,
            page.filtered_count,
            page.total_count
        )
    }
}

pub fn render_holdings(page: &VisiblePage<'_, Holding>) -> String {
    HoldingsTable(page).to_string()
}

// ── Summary cards ─────────────────────────────────────────────────────────────

struct SummaryCard<'a> {
    metrics: &'a DerivedMetrics,
    snapshot: &'a Snapshot,
}

impl fmt::Display for SummaryCard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let remote = &self.snapshot.summary;

        writeln!(f, "{}", RULE)?;
        writeln!(f, "  Portfolio Summary")?;
        writeln!(f, "{}", RULE)?;

        match &self.metrics.summary {
            Ok(s) => {
                writeln!(f, "  Invested   : {}", fmt_amount(s.total_invested))?;
                writeln!(f, "  Value      : {}", fmt_amount(s.total_value))?;
                writeln!(
                    f,
                    "  Gain/Loss  : {} ({})",
                    fmt_amount(s.total_gain_loss),
                    fmt_pct(s.total_gain_loss_percent)
                )?;
                let performer = |h: &Option<Holding>| match h {
                    Some(h) => format!("{} ({})", h.symbol, fmt_pct(h.gain_loss_percent)),
                    None => "—".to_string(),
                };
                writeln!(f, "  Best       : {}", performer(&s.top_performer))?;
                writeln!(f, "  Worst      : {}", performer(&s.worst_performer))?;
                writeln!(
                    f,
                    "  Largest    : {} ({})",
                    s.highest_value_holding.symbol,
                    fmt_amount(s.highest_value_holding.value)
                )?;
                writeln!(
                    f,
                    "  Smallest   : {} ({})",
                    s.lowest_value_holding.symbol,
                    fmt_amount(s.lowest_value_holding.value)
                )?;
            }
            Err(e) => writeln!(f, "  {}", empty_state(*e))?,
        }

        match (&self.metrics.diversification, &self.metrics.risk) {
            (Ok(score), Ok(risk)) => {
                writeln!(f, "  Diversity  : {:.1}/10 · {} risk", score, risk)?
            }
            _ => writeln!(f, "  Diversity  : —")?,
        }

        writeln!(f, "{}", RULE)?;
        writeln!(
            f,
            "  Reported   : {} value, {} ({})",
            fmt_amount(remote.total_value),
            fmt_amount(remote.total_gain_loss),
            fmt_pct(remote.total_gain_loss_percent)
        )?;
        if let Some(risk) = &remote.risk_level {
            writeln!(f, "  Risk (api) : {}", risk)?;
        }
        writeln!(
            f,
            "  Fetched    : {}",
            self.snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(f, "{}", RULE)
    }
}

pub fn render_summary(metrics: &DerivedMetrics, snapshot: &Snapshot) -> String {
    SummaryCard { metrics, snapshot }.to_string()
}

// ── Performance ───────────────────────────────────────────────────────────────

struct PerformanceTable<'a> {
    metrics: &'a DerivedMetrics,
    absolute: bool,
}

impl fmt::Display for PerformanceTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let points = match &self.metrics.normalized {
            Ok(points) => points,
            Err(e) => return writeln!(f, "{}", empty_state(*e)),
        };

        writeln!(
            f,
            "{:<12}{:>14}{:>14}{:>14}",
            "Date",
            Series::Portfolio,
            Series::BenchmarkA,
            Series::BenchmarkB
        )?;
        for p in points {
            let cells: Vec<String> = Series::ALL
                .iter()
                .map(|&s| {
                    if self.absolute {
                        fmt_amount(s.value_of(&p.absolute))
                    } else {
                        fmt_pct(Some(p.pct(s)))
                    }
                })
                .collect();
            writeln!(
                f,
                "{:<12}{:>14}{:>14}{:>14}",
                p.date.to_string(),
                cells[0],
                cells[1],
                cells[2]
            )?;
        }

        if let Ok(returns) = &self.metrics.returns {
            writeln!(f)?;
            writeln!(f, "{:<12}{:>10}{:>10}{:>10}", "Returns", "1M", "3M", "1Y")?;
            for r in returns {
                writeln!(
                    f,
                    "{:<12}{:>10}{:>10}{:>10}",
                    r.series,
                    fmt_pct(r.returns.month1),
                    fmt_pct(r.returns.months3),
                    fmt_pct(r.returns.year1)
                )?;
            }
        }
        Ok(())
    }
}

pub fn render_performance(metrics: &DerivedMetrics, absolute: bool) -> String {
    PerformanceTable { metrics, absolute }.to_string()
}

// ── Allocation ────────────────────────────────────────────────────────────────

struct BucketList<'a> {
    title: &'a str,
    buckets: Result<&'a [AllocationBucket], AnalyticsError>,
}

impl fmt::Display for BucketList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        let buckets = match self.buckets {
            Ok([]) => return writeln!(f, "  (no data)"),
            Ok(buckets) => buckets,
            Err(e) => return writeln!(f, "  {}", empty_state(e)),
        };
        for b in buckets {
            let bar = "█".repeat((b.percentage.clamp(0.0, 100.0) / 2.0).round() as usize);
            writeln!(
                f,
                "  {:<22}{:>16}{:>8.1}%  {}",
                b.label,
                fmt_amount(b.value),
                b.percentage,
                bar
            )?;
        }
        Ok(())
    }
}

/// One allocation dimension, or the neutral message for why it is undefined.
pub fn render_allocation(
    title: &str,
    buckets: Result<&[AllocationBucket], AnalyticsError>,
) -> String {
    BucketList { title, buckets }.to_string()
}

/// Backend buckets when present, otherwise the locally computed ones.
fn backend_or_local<'a>(
    backend: &'a [AllocationBucket],
    local: &'a Result<Vec<AllocationBucket>, AnalyticsError>,
) -> Result<&'a [AllocationBucket], AnalyticsError> {
    if backend.is_empty() {
        local.as_deref().map_err(|e| *e)
    } else {
        Ok(backend)
    }
}

/// Sector and market-cap allocation for one snapshot.
pub fn render_allocations(metrics: &DerivedMetrics, snapshot: &Snapshot) -> String {
    let by_sector = backend_or_local(&snapshot.allocation.by_sector, &metrics.sector_allocation);
    let by_market_cap = backend_or_local(&snapshot.market_cap, &metrics.market_cap_allocation);
    format!(
        "{}\n{}",
        render_allocation("By sector", by_sector),
        render_allocation("By market cap", by_market_cap)
    )
}

pub fn render_error(message: &str) -> String {
    format!("Could not load portfolio: {}\nRun the command again to retry.\n", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Allocation, PerformanceData, PerformerRef, RemoteSummary, TimelinePoint};
    use crate::summary::allocation_by_sector;
    use crate::table::holdings::holdings_view;
    use crate::table::{DEFAULT_PAGE_SIZE, TableEngine};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn holdings() -> Vec<Holding> {
        vec![
            Holding::new(
                "RELIANCE",
                "Reliance Industries",
                10.0,
                2400.0,
                2500.0,
                "Energy",
                "Large",
            ),
            Holding::new("GIFT", "Gifted", 2.0, 0.0, 100.0, "FMCG", "Small"),
        ]
    }

    fn engine() -> TableEngine<Holding> {
        TableEngine::new(holdings(), holdings_view(HoldingField::Symbol, DEFAULT_PAGE_SIZE))
    }

    fn performer(symbol: &str) -> PerformerRef {
        PerformerRef {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            gain_percent: None,
            value: None,
        }
    }

    fn snapshot(holdings: Vec<Holding>, timeline: Vec<TimelinePoint>) -> Snapshot {
        Snapshot {
            holdings,
            summary: RemoteSummary {
                total_value: 25_200.0,
                total_invested: 24_000.0,
                total_gain_loss: 1_200.0,
                total_gain_loss_percent: Some(5.0),
                top_performer: performer("RELIANCE"),
                worst_performer: performer("RELIANCE"),
                highest_value: performer("RELIANCE"),
                lowest_value: performer("GIFT"),
                diversification_score: None,
                risk_level: Some("Moderate".to_string()),
            },
            allocation: Allocation::default(),
            performance: PerformanceData { timeline, returns: Vec::new() },
            market_cap: Vec::new(),
            fetched_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_render_holdings_table() {
        let mut e = engine();
        e.set_column_visibility(HoldingField::Name, false);
        let text = render_holdings(&e.visible_rows());

        assert!(text.starts_with("Symbol"));
        assert!(!text.contains("Reliance Industries"));
        assert!(text.contains("25,000.00"));
        assert!(text.contains("+4.17%"));
        assert!(text.contains("Page 1 of 1 · 2 of 2 holdings"));
    }

    #[test]
    fn test_render_empty_filter() {
        let mut e = engine();
        e.set_filter("nothing");
        let text = render_holdings(&e.visible_rows());
        assert_eq!(text, "No holdings match the current filter (2 hidden).\n");
    }

    #[test]
    fn test_missing_percent_cell() {
        assert_eq!(fmt_cell(HoldingField::GainLossPercent, CellValue::Missing), "—");
        assert_eq!(fmt_cell(HoldingField::Quantity, CellValue::Number(12.0)), "12");
    }

    #[test]
    fn test_render_summary_card() {
        let snap = snapshot(holdings(), Vec::new());
        let metrics = DerivedMetrics::from_snapshot(&snap);
        let text = render_summary(&metrics, &snap);

        assert!(text.contains("Largest    : RELIANCE (25,000.00)"));
        assert!(text.contains("Risk (api) : Moderate"));
        assert!(text.contains("Fetched    : 2024-03-01 09:30:00 UTC"));
    }

    #[test]
    fn test_render_performance_without_history() {
        let snap = snapshot(holdings(), Vec::new());
        let metrics = DerivedMetrics::from_snapshot(&snap);
        assert_eq!(render_performance(&metrics, false), "Not enough performance history yet.\n");

        let point = |day, portfolio| TimelinePoint {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            portfolio,
            benchmark_a: 50.0,
            benchmark_b: 10.0,
        };
        let timeline = vec![point(1, 100.0), point(2, 110.0)];
        let snap = snapshot(holdings(), timeline);
        let metrics = DerivedMetrics::from_snapshot(&snap);
        let text = render_performance(&metrics, false);
        assert!(text.contains("2024-01-02"));
        assert!(text.contains("+10.00%"));
    }

    #[test]
    fn test_render_allocation() {
        let buckets = [AllocationBucket {
            label: "Banking".into(),
            value: 1000.0,
            percentage: 40.0,
        }];
        let text = render_allocation("By sector", Ok(&buckets));
        assert!(text.contains("Banking"));
        assert!(text.contains("40.0%"));
        assert!(text.contains(&"█".repeat(20)));
        assert!(render_allocation("Empty", Ok(&[])).contains("(no data)"));
    }

    #[test]
    fn test_render_allocation_error_keeps_reason() {
        let worthless = [Holding::new("Z", "Z", 0.0, 10.0, 10.0, "Banking", "Large")];
        let buckets = allocation_by_sector(&worthless);
        assert_eq!(buckets, Err(AnalyticsError::ZeroPortfolioValue));

        let text = render_allocation("By sector", buckets.as_deref().map_err(|e| *e));
        assert_eq!(text, "By sector\n  Portfolio has no market value.\n");

        let text = render_allocation("By market cap", Err(AnalyticsError::EmptyPortfolio));
        assert_eq!(text, "By market cap\n  No holdings yet.\n");
    }

    #[test]
    fn test_allocations_fall_back_to_local() {
        let worthless = vec![Holding::new("Z", "Z", 0.0, 10.0, 10.0, "Banking", "Large")];
        let snap = snapshot(worthless, Vec::new());
        let metrics = DerivedMetrics::from_snapshot(&snap);
        let text = render_allocations(&metrics, &snap);
        assert_eq!(
            text,
            "By sector\n  Portfolio has no market value.\n\n\
             By market cap\n  Portfolio has no market value.\n"
        );

        let mut snap = snapshot(holdings(), Vec::new());
        snap.allocation.by_sector = vec![AllocationBucket {
            label: "Reported".into(),
            value: 1.0,
            percentage: 100.0,
        }];
        let metrics = DerivedMetrics::from_snapshot(&snap);
        let text = render_allocations(&metrics, &snap);
        assert!(text.contains("Reported"));
        assert!(!text.contains("Energy"));
        assert!(text.contains("Large"));
    }
}
