use ryan_schemas::{
    NewTradeline, Tradeline, TradelineId, TradelinePatch, TradelineRun, TradelineStatus,
};
use ryan_store::{now_timestamp, Store};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{required, PlannerError, Result};

/// Counts over a set of tradelines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TradelineStats {
    pub total: usize,
    pub live: usize,
    pub testing: usize,
    pub development: usize,
    pub pending: usize,
    pub total_discoveries: i64,
}

impl TradelineStats {
    pub fn of(tradelines: &[Tradeline]) -> Self {
        tradelines.iter().fold(
            Self {
                total: tradelines.len(),
                ..Self::default()
            },
            |mut stats, tradeline| {
                match tradeline.status {
                    TradelineStatus::Live => stats.live += 1,
                    TradelineStatus::Testing => stats.testing += 1,
                    TradelineStatus::Development => stats.development += 1,
                    TradelineStatus::Pending => stats.pending += 1,
                }
                stats.total_discoveries += tradeline.discovery_count;
                stats
            },
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TradelineListing {
    pub tradelines: Vec<Tradeline>,
    pub stats: TradelineStats,
}

/// Fields accepted when registering a tradeline
#[derive(Debug, Clone, Default)]
pub struct TradelineDraft {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub status: Option<TradelineStatus>,
    pub port_number: Option<i64>,
    pub server_path: Option<String>,
    pub droplet_ip: Option<String>,
    pub notes: Option<String>,
}

pub struct TradelineService {
    store: Arc<dyn Store>,
}

impl TradelineService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Stats are computed over the returned (possibly filtered) list
    pub fn list(&self, status: Option<TradelineStatus>) -> Result<TradelineListing> {
        let tradelines = self.store.list_tradelines(status)?;
        let stats = TradelineStats::of(&tradelines);
        Ok(TradelineListing { tradelines, stats })
    }

    pub fn get(&self, id: &TradelineId) -> Result<Tradeline> {
        self.store
            .get_tradeline(id)?
            .ok_or_else(|| PlannerError::not_found("tradeline", id))
    }

    pub fn create(&self, draft: TradelineDraft) -> Result<Tradeline> {
        let message = "name and slug are required";
        let name = required(draft.name, message)?;
        let slug = required(draft.slug, message)?;

        let tradeline = self.store.insert_tradeline(&NewTradeline {
            name,
            slug,
            status: draft.status.unwrap_or(TradelineStatus::Pending),
            port_number: draft.port_number,
            server_path: draft.server_path,
            droplet_ip: draft.droplet_ip,
            notes: draft.notes,
        })?;

        info!("Registered tradeline: {} ({})", tradeline.slug, tradeline.id);
        Ok(tradeline)
    }

    /// Going live stamps `last_success_at` unless the caller supplied one
    pub fn update(&self, id: &TradelineId, mut patch: TradelinePatch) -> Result<Tradeline> {
        let now = now_timestamp();
        if patch.status == Some(TradelineStatus::Live) && patch.last_success_at.is_none() {
            patch.last_success_at = Some(now.clone());
        }
        Ok(self.store.update_tradeline(id, &patch, &now)?)
    }

    pub fn record_run(&self, id: &TradelineId, run: &TradelineRun) -> Result<Tradeline> {
        let tradeline = self.store.record_tradeline_run(id, run, &now_timestamp())?;
        match &tradeline.last_error {
            Some(error) => warn!("Tradeline {} run failed: {}", tradeline.slug, error),
            None => info!(
                "Tradeline {} run ok ({} discoveries total)",
                tradeline.slug, tradeline.discovery_count
            ),
        }
        Ok(tradeline)
    }
}
