//! Portfolio-level aggregates over the holdings list.
//!
//! Totals, extremal holdings (best/worst performer, highest/lowest value),
//! allocation buckets, and the diversification / risk heuristics.

use crate::error::AnalyticsError;
use crate::models::{AllocationBucket, Holding};
use serde::Serialize;
use std::fmt;

/// Sectors counted as high-risk exposure.
pub const HIGH_RISK_SECTORS: &[&str] = &["Technology", "Small Cap Stocks"];

// ── Summary stats ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_invested: f64,
    pub total_value: f64,
    pub total_gain_loss: f64,
    /// `None` when nothing was invested.
    pub total_gain_loss_percent: Option<f64>,
    /// `None` only if no holding has a defined gain/loss percent.
    pub top_performer: Option<Holding>,
    pub worst_performer: Option<Holding>,
    pub highest_value_holding: Holding,
    pub lowest_value_holding: Holding,
}

impl SummaryStats {
    pub fn gain_loss_percent(&self) -> Result<f64, AnalyticsError> {
        self.total_gain_loss_percent.ok_or(AnalyticsError::NoInvestment)
    }
}

/// Pick the first item whose key beats every earlier one.
///
/// `better(candidate, current)` must be strict so that ties keep the
/// earliest item.
fn select_first<'a, T, K, F, B>(
    items: impl IntoIterator<Item = &'a T>,
    key: F,
    better: B,
) -> Option<&'a T>
where
    T: 'a,
    K: Copy,
    F: Fn(&T) -> Option<K>,
    B: Fn(K, K) -> bool,
{
    let mut best: Option<(&T, K)> = None;
    for item in items {
        let Some(k) = key(item) else { continue };
        match best {
            Some((_, current)) if !better(k, current) => {}
            _ => best = Some((item, k)),
        }
    }
    best.map(|(item, _)| item)
}

pub fn summarize(holdings: &[Holding]) -> Result<SummaryStats, AnalyticsError> {
    if holdings.is_empty() {
        return Err(AnalyticsError::EmptyPortfolio);
    }

    let total_invested: f64 = holdings.iter().map(Holding::invested).sum();
    let total_value: f64 = holdings.iter().map(|h| h.value).sum();
    let total_gain_loss = total_value - total_invested;
    let total_gain_loss_percent = if total_invested == 0.0 {
        None
    } else {
        Some(total_gain_loss / total_invested * 100.0)
    };

    let pct = |h: &Holding| h.gain_loss_percent;
    let value = |h: &Holding| Some(h.value);

    let top = select_first(holdings, pct, |a, b| a > b);
    let worst = select_first(holdings, pct, |a, b| a < b);
    let highest = select_first(holdings, value, |a, b| a > b);
    let lowest = select_first(holdings, value, |a, b| a < b);

    let (Some(highest), Some(lowest)) = (highest, lowest) else {
        return Err(AnalyticsError::EmptyPortfolio);
    };

    Ok(SummaryStats {
        total_invested,
        total_value,
        total_gain_loss,
        total_gain_loss_percent,
        top_performer: top.cloned(),
        worst_performer: worst.cloned(),
        highest_value_holding: highest.clone(),
        lowest_value_holding: lowest.clone(),
    })
}

// ── Allocation ────────────────────────────────────────────────────────────────

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Group holdings by `label_of`, in first-seen order, as shares of total value.
pub fn allocation_by<F>(
    holdings: &[Holding],
    label_of: F,
) -> Result<Vec<AllocationBucket>, AnalyticsError>
where
    F: Fn(&Holding) -> &str,
{
    if holdings.is_empty() {
        return Err(AnalyticsError::EmptyPortfolio);
    }

    let total: f64 = holdings.iter().map(|h| h.value).sum();
    if total == 0.0 {
        return Err(AnalyticsError::ZeroPortfolioValue);
    }

    let mut buckets: Vec<AllocationBucket> = Vec::new();
    for h in holdings {
        let label = label_of(h);
        match buckets.iter_mut().find(|b| b.label == label) {
            Some(b) => b.value += h.value,
            None => buckets.push(AllocationBucket {
                label: label.to_string(),
                value: h.value,
                percentage: 0.0,
            }),
        }
    }

    for b in &mut buckets {
        b.percentage = round1(b.value / total * 100.0);
    }
    Ok(buckets)
}

pub fn allocation_by_sector(holdings: &[Holding]) -> Result<Vec<AllocationBucket>, AnalyticsError> {
    allocation_by(holdings, |h| &h.sector)
}

pub fn allocation_by_market_cap(
    holdings: &[Holding],
) -> Result<Vec<AllocationBucket>, AnalyticsError> {
    allocation_by(holdings, |h| &h.market_cap)
}

// ── Diversification & risk ───────────────────────────────────────────────────

/// Score in [1, 10]: two points per distinct sector (max 10), minus 0.1 per
/// holding beyond ten.
pub fn diversification_score(holdings: &[Holding]) -> Result<f64, AnalyticsError> {
    if holdings.is_empty() {
        return Err(AnalyticsError::EmptyPortfolio);
    }

    let mut sectors: Vec<&str> = holdings.iter().map(|h| h.sector.as_str()).collect();
    sectors.sort_unstable();
    sectors.dedup();

    let base = (sectors.len() as f64 * 2.0).min(10.0);
    let penalty = holdings.len().saturating_sub(10) as f64 * 0.1;
    Ok((base - penalty).clamp(1.0, 10.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Conservative,
    Moderate,
    Aggressive,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Conservative => "Conservative",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::Aggressive => "Aggressive",
        };
        f.write_str(s)
    }
}

pub fn risk_level(holdings: &[Holding], score: f64) -> Result<RiskLevel, AnalyticsError> {
    if holdings.is_empty() {
        return Err(AnalyticsError::EmptyPortfolio);
    }

    let total: f64 = holdings.iter().map(|h| h.value).sum();
    if total == 0.0 {
        return Err(AnalyticsError::ZeroPortfolioValue);
    }

    let exposed: f64 = holdings
        .iter()
        .filter(|h| HIGH_RISK_SECTORS.contains(&h.sector.as_str()))
        .map(|h| h.value)
        .sum();
    let ratio = exposed / total;

    Ok(if score >= 8.0 && ratio < 0.3 {
        RiskLevel::Conservative
    } else if score >= 6.0 && ratio < 0.5 {
        RiskLevel::Moderate
    } else {
        RiskLevel::Aggressive
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(symbol: &str, value: f64, pct: Option<f64>) -> Holding {
        Holding {
            symbol: symbol.to_string(),
            name: format!("{symbol} Ltd"),
            quantity: 1.0,
            avg_price: value,
            current_price: value,
            sector: "Banking".to_string(),
            market_cap: "Large".to_string(),
            value,
            gain_loss: 0.0,
            gain_loss_percent: pct,
        }
    }

    #[test]
    fn test_two_holding_scenario() {
        let holdings = [holding("A", 100.0, Some(10.0)), holding("B", 200.0, Some(-5.0))];
        let s = summarize(&holdings).unwrap();

        assert_eq!(s.total_value, 300.0);
        assert_eq!(s.top_performer.unwrap().symbol, "A");
        assert_eq!(s.worst_performer.unwrap().symbol, "B");
        assert_eq!(s.highest_value_holding.symbol, "B");
        assert_eq!(s.lowest_value_holding.symbol, "A");
    }

    #[test]
    fn test_totals() {
        let holdings = [
            Holding::new("X", "X", 10.0, 10.0, 12.0, "Technology", "Large"),
            Holding::new("Y", "Y", 5.0, 20.0, 16.0, "Banking", "Mid"),
        ];
        let s = summarize(&holdings).unwrap();
        assert_eq!(s.total_invested, 200.0);
        assert_eq!(s.total_value, 200.0);
        assert_eq!(s.total_gain_loss, 0.0);
        assert_eq!(s.gain_loss_percent(), Ok(0.0));
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let holdings = [
            holding("FIRST", 50.0, Some(7.0)),
            holding("SECOND", 50.0, Some(7.0)),
            holding("THIRD", 50.0, Some(7.0)),
        ];
        let s = summarize(&holdings).unwrap();
        assert_eq!(s.top_performer.unwrap().symbol, "FIRST");
        assert_eq!(s.worst_performer.unwrap().symbol, "FIRST");
        assert_eq!(s.highest_value_holding.symbol, "FIRST");
        assert_eq!(s.lowest_value_holding.symbol, "FIRST");
    }

    #[test]
    fn test_holdings_without_percent_are_skipped() {
        let holdings = [holding("FREE", 500.0, None), holding("PAID", 10.0, Some(-1.0))];
        let s = summarize(&holdings).unwrap();
        assert_eq!(s.top_performer.as_ref().unwrap().symbol, "PAID");
        assert_eq!(s.worst_performer.as_ref().unwrap().symbol, "PAID");
        assert_eq!(s.highest_value_holding.symbol, "FREE");
    }

    #[test]
    fn test_empty_and_no_investment() {
        assert_eq!(summarize(&[]), Err(AnalyticsError::EmptyPortfolio));

        let gifted = [Holding::new("G", "Gift", 3.0, 0.0, 10.0, "FMCG", "Small")];
        let s = summarize(&gifted).unwrap();
        assert_eq!(s.total_gain_loss_percent, None);
        assert_eq!(s.gain_loss_percent(), Err(AnalyticsError::NoInvestment));
        assert!(s.top_performer.is_none());
    }

    #[test]
    fn test_allocation_by_sector() {
        let mut a = holding("A", 300.0, None);
        a.sector = "Technology".into();
        let b = holding("B", 500.0, None);
        let mut c = holding("C", 200.0, None);
        c.sector = "Technology".into();

        let buckets = allocation_by_sector(&[a, b, c]).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].label, "Technology");
        assert_eq!(buckets[0].value, 500.0);
        assert_eq!(buckets[0].percentage, 50.0);
        assert_eq!(buckets[1].label, "Banking");

        let total: f64 = buckets.iter().map(|b| b.percentage).sum();
        assert!((total - 100.0).abs() < 0.5);
    }

    #[test]
    fn test_allocation_zero_value() {
        let holdings = [holding("Z", 0.0, None)];
        assert_eq!(
            allocation_by_market_cap(&holdings),
            Err(AnalyticsError::ZeroPortfolioValue)
        );
    }

    #[test]
    fn test_diversification_and_risk() {
        let sectors = ["Technology", "Banking", "Healthcare", "FMCG", "Energy"];
        let holdings: Vec<Holding> = sectors
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut h = holding(&format!("S{i}"), 100.0, None);
                h.sector = s.to_string();
                h
            })
            .collect();

        let score = diversification_score(&holdings).unwrap();
        assert_eq!(score, 10.0);
        // 20% in Technology
        assert_eq!(risk_level(&holdings, score), Ok(RiskLevel::Conservative));

        let single = [holding("ONE", 100.0, None)];
        let score = diversification_score(&single).unwrap();
        assert_eq!(score, 2.0);
        assert_eq!(risk_level(&single, score), Ok(RiskLevel::Aggressive));
    }

    #[test]
    fn test_concentration_penalty() {
        let holdings: Vec<Holding> = (0..15)
            .map(|i| holding(&format!("H{i}"), 1.0, None))
            .collect();
        // one sector → base 2, minus 0.5
        assert!((diversification_score(&holdings).unwrap() - 1.5).abs() < 1e-9);
    }
}
