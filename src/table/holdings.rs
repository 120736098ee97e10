//! Holdings as table rows.

use super::{CellValue, Tabular, ViewState};
use crate::error::ParseFieldError;
use crate::models::Holding;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

/// Columns of the holdings table, named as on the wire.
///
/// Deserializes through `FromStr`, so config files accept the same spellings
/// as the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "String")]
pub enum HoldingField {
    Symbol,
    Name,
    Quantity,
    AvgPrice,
    CurrentPrice,
    Sector,
    MarketCap,
    Value,
    GainLoss,
    GainLossPercent,
}

impl HoldingField {
    pub const ALL: [HoldingField; 10] = [
        HoldingField::Symbol,
        HoldingField::Name,
        HoldingField::Quantity,
        HoldingField::AvgPrice,
        HoldingField::CurrentPrice,
        HoldingField::Sector,
        HoldingField::MarketCap,
        HoldingField::Value,
        HoldingField::GainLoss,
        HoldingField::GainLossPercent,
    ];

    pub fn key(self) -> &'static str {
        match self {
            HoldingField::Symbol => "symbol",
            HoldingField::Name => "name",
            HoldingField::Quantity => "quantity",
            HoldingField::AvgPrice => "avgPrice",
            HoldingField::CurrentPrice => "currentPrice",
            HoldingField::Sector => "sector",
            HoldingField::MarketCap => "marketCap",
            HoldingField::Value => "value",
            HoldingField::GainLoss => "gainLoss",
            HoldingField::GainLossPercent => "gainLossPercent",
        }
    }

    /// Column header for display.
    pub fn title(self) -> &'static str {
        match self {
            HoldingField::Symbol => "Symbol",
            HoldingField::Name => "Name",
            HoldingField::Quantity => "Qty",
            HoldingField::AvgPrice => "Avg Price",
            HoldingField::CurrentPrice => "Price",
            HoldingField::Sector => "Sector",
            HoldingField::MarketCap => "Market Cap",
            HoldingField::Value => "Value",
            HoldingField::GainLoss => "Gain/Loss",
            HoldingField::GainLossPercent => "Gain/Loss %",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(
            self,
            HoldingField::Symbol
                | HoldingField::Name
                | HoldingField::Sector
                | HoldingField::MarketCap
        )
    }
}

impl fmt::Display for HoldingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.key())
    }
}

/// Accepts the wire name in any case, with or without `_` / `-`:
/// "gainLossPercent", "gain_loss_percent", "GAIN-LOSS-PERCENT".
impl FromStr for HoldingField {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        HoldingField::ALL
            .into_iter()
            .find(|f| f.key().to_lowercase() == wanted)
            .ok_or_else(|| ParseFieldError(s.to_string()))
    }
}

impl TryFrom<String> for HoldingField {
    type Error = ParseFieldError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Tabular for Holding {
    type Field = HoldingField;

    fn cell(&self, field: HoldingField) -> CellValue<'_> {
        match field {
            HoldingField::Symbol => CellValue::Text(&self.symbol),
            HoldingField::Name => CellValue::Text(&self.name),
            HoldingField::Quantity => CellValue::number(self.quantity),
            HoldingField::AvgPrice => CellValue::number(self.avg_price),
            HoldingField::CurrentPrice => CellValue::number(self.current_price),
            HoldingField::Sector => CellValue::Text(&self.sector),
            HoldingField::MarketCap => CellValue::Text(&self.market_cap),
            HoldingField::Value => CellValue::number(self.value),
            HoldingField::GainLoss => CellValue::number(self.gain_loss),
            HoldingField::GainLossPercent => self
                .gain_loss_percent
                .map_or(CellValue::Missing, CellValue::number),
        }
    }
}

/// Default holdings view: every column, filtering on `filter_field`.
pub fn holdings_view(
    filter_field: HoldingField,
    page_size: NonZeroUsize,
) -> ViewState<HoldingField> {
    ViewState::new(HoldingField::ALL, filter_field, page_size)
}
