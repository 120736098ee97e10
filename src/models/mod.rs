use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ── Holding ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub symbol: String,
    pub name: String,
    pub quantity: f64,
    pub avg_price: f64,
    pub current_price: f64,
    pub sector: String,
    pub market_cap: String,   // "Large", "Mid", "Small"
    pub value: f64,
    pub gain_loss: f64,
    /// `None` when nothing was invested (quantity × avg price is 0).
    #[serde(default)]
    pub gain_loss_percent: Option<f64>,
}

impl Holding {
    /// Build a holding from its raw fields, deriving value and gain/loss.
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        quantity: f64,
        avg_price: f64,
        current_price: f64,
        sector: impl Into<String>,
        market_cap: impl Into<String>,
    ) -> Self {
        let invested = quantity * avg_price;
        let value = quantity * current_price;
        let gain_loss = value - invested;
        let gain_loss_percent = if invested == 0.0 {
            None
        } else {
            Some(gain_loss / invested * 100.0)
        };

        Self {
            symbol: symbol.into(),
            name: name.into(),
            quantity,
            avg_price,
            current_price,
            sector: sector.into(),
            market_cap: market_cap.into(),
            value,
            gain_loss,
            gain_loss_percent,
        }
    }

    /// Capital put in: quantity × average purchase price.
    pub fn invested(&self) -> f64 {
        self.quantity * self.avg_price
    }
}

// ── Performance timeline ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub portfolio: f64,
    #[serde(rename = "nifty50")]
    pub benchmark_a: f64,
    #[serde(rename = "gold")]
    pub benchmark_b: f64,
}

/// The three series carried by every timeline point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Series {
    Portfolio,
    BenchmarkA,
    BenchmarkB,
}

impl Series {
    pub const ALL: [Series; 3] = [Series::Portfolio, Series::BenchmarkA, Series::BenchmarkB];

    /// Wire name used by the backend for this series.
    pub fn label(self) -> &'static str {
        match self {
            Series::Portfolio => "portfolio",
            Series::BenchmarkA => "nifty50",
            Series::BenchmarkB => "gold",
        }
    }

    pub fn value_of(self, point: &TimelinePoint) -> f64 {
        match self {
            Series::Portfolio => point.portfolio,
            Series::BenchmarkA => point.benchmark_a,
            Series::BenchmarkB => point.benchmark_b,
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PeriodReturns {
    pub month1: Option<f64>,
    pub months3: Option<f64>,
    pub year1: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesReturns {
    pub series: String,
    #[serde(flatten)]
    pub returns: PeriodReturns,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceData {
    pub timeline: Vec<TimelinePoint>,
    #[serde(default, deserialize_with = "returns_from_map")]
    pub returns: Vec<SeriesReturns>,
}

// ── Allocation ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationBucket {
    #[serde(alias = "marketCap")]
    pub label: String,
    pub value: f64,
    pub percentage: f64,  // 0..=100
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    #[serde(default, deserialize_with = "buckets_from_map")]
    pub by_sector: Vec<AllocationBucket>,
    #[serde(default, deserialize_with = "buckets_from_map")]
    pub by_market_cap: Vec<AllocationBucket>,
}

// ── Remote summary ────────────────────────────────────────────────────────────

/// Reference to a single holding as reported by `/summary`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformerRef {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub gain_percent: Option<f64>,
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSummary {
    pub total_value: f64,
    pub total_invested: f64,
    pub total_gain_loss: f64,
    #[serde(default)]
    pub total_gain_loss_percent: Option<f64>,
    pub top_performer: PerformerRef,
    pub worst_performer: PerformerRef,
    pub highest_value: PerformerRef,
    pub lowest_value: PerformerRef,
    #[serde(default)]
    pub diversification_score: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<String>,
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Everything one refresh brings back, all five slices or nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub holdings: Vec<Holding>,
    pub summary: RemoteSummary,
    pub allocation: Allocation,
    pub performance: PerformanceData,
    pub market_cap: Vec<AllocationBucket>,
    pub fetched_at: DateTime<Utc>,
}

// ── Map → ordered sequence ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct BucketBody {
    value: f64,
    percentage: f64,
}

/// Decode `{label: {value, percentage}}` into buckets, keeping document order.
fn buckets_from_map<'de, D>(deserializer: D) -> Result<Vec<AllocationBucket>, D::Error>
where
    D: Deserializer<'de>,
{
    struct BucketVisitor;

    impl<'de> Visitor<'de> for BucketVisitor {
        type Value = Vec<AllocationBucket>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of label to {value, percentage}")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((label, body)) = map.next_entry::<String, BucketBody>()? {
                out.push(AllocationBucket {
                    label,
                    value: body.value,
                    percentage: body.percentage,
                });
            }
            Ok(out)
        }
    }

    deserializer.deserialize_map(BucketVisitor)
}

fn returns_from_map<'de, D>(deserializer: D) -> Result<Vec<SeriesReturns>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ReturnsVisitor;

    impl<'de> Visitor<'de> for ReturnsVisitor {
        type Value = Vec<SeriesReturns>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of series name to period returns")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out = Vec::new();
            while let Some((series, returns)) = map.next_entry::<String, PeriodReturns>()? {
                out.push(SeriesReturns { series, returns });
            }
            Ok(out)
        }
    }

    deserializer.deserialize_map(ReturnsVisitor)
}
