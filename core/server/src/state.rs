use ryan_planner::{
    BriefingService, FocusController, ModelGateway, PhaseService, Prioritizer, PrioritizerConfig,
    ProjectService, Scorer, ScoringConfig, StatusService, TradelineService,
};
use ryan_store::Store;
use std::sync::Arc;

/// Identity reported by the health endpoint
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub port: u16,
    pub susan_url: String,
    pub clair_url: String,
}

#[derive(Clone)]
pub struct AppState {
    pub info: ServiceInfo,
    pub scorer: Arc<Scorer>,
    pub focus: Arc<FocusController>,
    pub briefing: Arc<BriefingService>,
    pub status: Arc<StatusService>,
    pub prioritizer: Arc<Prioritizer>,
    pub phases: Arc<PhaseService>,
    pub tradelines: Arc<TradelineService>,
    pub projects: Arc<ProjectService>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<ModelGateway>,
        scoring: ScoringConfig,
        prioritizer: PrioritizerConfig,
        info: ServiceInfo,
    ) -> Self {
        let scorer = Arc::new(Scorer::new(store.clone(), scoring));

        Self {
            info,
            focus: Arc::new(FocusController::new(store.clone(), scorer.clone())),
            scorer,
            briefing: Arc::new(BriefingService::new(store.clone())),
            status: Arc::new(StatusService::new(store.clone())),
            prioritizer: Arc::new(Prioritizer::new(store.clone(), gateway, prioritizer)),
            phases: Arc::new(PhaseService::new(store.clone())),
            tradelines: Arc::new(TradelineService::new(store.clone())),
            projects: Arc::new(ProjectService::new(store)),
        }
    }
}
