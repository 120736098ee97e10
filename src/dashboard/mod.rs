//! Dashboard orchestrator: ties the backend source → derived metrics → table.
//!
//! ## Refresh
//!
//! `refresh()` fans out the five endpoint calls and waits for all of them:
//!   1. Every call succeeds → snapshot committed, metrics recomputed, holdings
//!      table rows replaced (view state kept).
//!   2. Any call fails → the whole dashboard goes to the failed state; nothing
//!      from the other calls is shown.
//!
//! Each refresh takes a new epoch. Only the latest epoch may commit, so a slow
//! response from an older refresh is dropped instead of overwriting newer data.

use crate::client::PortfolioSource;
use crate::config::TableConfig;
use crate::error::{AnalyticsError, FetchError};
use crate::metrics::{normalize, period_returns, NormalizedPoint};
use crate::models::{AllocationBucket, Holding, SeriesReturns, Snapshot};
use crate::summary::{
    allocation_by_market_cap, allocation_by_sector, diversification_score, risk_level, summarize,
    RiskLevel, SummaryStats,
};
use crate::table::holdings::holdings_view;
use crate::table::TableEngine;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

// ── Derived metrics ───────────────────────────────────────────────────────────

/// Everything computed locally from a snapshot. Each piece fails on its own.
#[derive(Debug, Clone)]
pub struct DerivedMetrics {
    pub summary: Result<SummaryStats, AnalyticsError>,
    pub normalized: Result<Vec<NormalizedPoint>, AnalyticsError>,
    pub returns: Result<Vec<SeriesReturns>, AnalyticsError>,
    pub sector_allocation: Result<Vec<AllocationBucket>, AnalyticsError>,
    pub market_cap_allocation: Result<Vec<AllocationBucket>, AnalyticsError>,
    pub diversification: Result<f64, AnalyticsError>,
    pub risk: Result<RiskLevel, AnalyticsError>,
}

impl DerivedMetrics {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let holdings = &snapshot.holdings;
        let timeline = &snapshot.performance.timeline;
        let diversification = diversification_score(holdings);
        let risk = diversification.and_then(|score| risk_level(holdings, score));

        Self {
            summary: summarize(holdings),
            normalized: normalize(timeline),
            returns: period_returns(timeline),
            sector_allocation: allocation_by_sector(holdings),
            market_cap_allocation: allocation_by_market_cap(holdings),
            diversification,
            risk,
        }
    }
}

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum LoadState {
    /// Nothing fetched yet.
    Idle,
    Ready {
        snapshot: Arc<Snapshot>,
        metrics: Arc<DerivedMetrics>,
    },
    /// Last refresh failed; carries the message shown with the retry prompt.
    Failed(String),
}

impl LoadState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready { .. })
    }
}

pub struct DashboardState {
    pub load: LoadState,
    pub holdings: TableEngine<Holding>,
    /// Epoch of the last committed refresh (0 = none).
    pub committed_epoch: u64,
}

/// What happened to one refresh.
#[derive(Debug)]
pub enum RefreshOutcome {
    Committed { epoch: u64 },
    Failed { epoch: u64, error: FetchError },
    /// A newer refresh was issued while this one was in flight.
    Discarded { epoch: u64 },
}

// ── Dashboard ─────────────────────────────────────────────────────────────────

pub struct Dashboard<S: PortfolioSource> {
    source: S,
    epoch: AtomicU64,
    state: RwLock<DashboardState>,
}

impl<S: PortfolioSource> Dashboard<S> {
    pub fn new(source: S, table: &TableConfig) -> Self {
        let view = holdings_view(table.filter_field, table.page_size);
        Self {
            source,
            epoch: AtomicU64::new(0),
            state: RwLock::new(DashboardState {
                load: LoadState::Idle,
                holdings: TableEngine::new(Vec::new(), view),
                committed_epoch: 0,
            }),
        }
    }

    pub fn latest_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// All five slices or the first error. Calls run concurrently.
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError> {
        let (holdings, summary, allocation, performance, market_cap) = tokio::try_join!(
            self.source.fetch_holdings(),
            self.source.fetch_summary(),
            self.source.fetch_allocation(),
            self.source.fetch_performance(),
            self.source.fetch_market_cap(),
        )?;

        Ok(Snapshot {
            holdings,
            summary,
            allocation,
            performance,
            market_cap,
            fetched_at: Utc::now(),
        })
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Refresh #{} started", epoch);

        let result = self.fetch_snapshot().await;

        let mut state = self.state.write().await;
        if epoch != self.latest_epoch() {
            warn!("Refresh #{} superseded by #{}; dropping response", epoch, self.latest_epoch());
            return RefreshOutcome::Discarded { epoch };
        }

        match result {
            Ok(snapshot) => {
                let metrics = DerivedMetrics::from_snapshot(&snapshot);
                info!(
                    "Refresh #{}: {} holdings, {} timeline points",
                    epoch,
                    snapshot.holdings.len(),
                    snapshot.performance.timeline.len()
                );
                state.holdings.replace_rows(snapshot.holdings.clone());
                state.load = LoadState::Ready {
                    snapshot: Arc::new(snapshot),
                    metrics: Arc::new(metrics),
                };
                state.committed_epoch = epoch;
                RefreshOutcome::Committed { epoch }
            }
            Err(error) => {
                warn!("Refresh #{} failed: {}", epoch, error);
                state.holdings.replace_rows(Vec::new());
                state.load = LoadState::Failed(error.to_string());
                state.committed_epoch = epoch;
                RefreshOutcome::Failed { epoch, error }
            }
        }
    }

    /// Re-issue all five calls after a failure.
    pub async fn retry(&self) -> RefreshOutcome {
        info!("Retrying dashboard fetch");
        self.refresh().await
    }

    pub async fn load_state(&self) -> LoadState {
        self.state.read().await.load.clone()
    }

    /// Run `f` against the current state.
    pub async fn with_state<T>(&self, f: impl FnOnce(&DashboardState) -> T) -> T {
        f(&*self.state.read().await)
    }

    /// Apply a view action to the holdings table.
    pub async fn update_holdings<T>(&self, f: impl FnOnce(&mut TableEngine<Holding>) -> T) -> T {
        f(&mut self.state.write().await.holdings)
    }

    pub async fn visible_symbols(&self) -> Vec<String> {
        self.with_state(|s| {
            s.holdings
                .visible_rows()
                .rows
                .iter()
                .map(|r| r.record.symbol.clone())
                .collect()
        })
        .await
    }
}
