pub mod briefing;
pub mod error;
pub mod focus;
pub mod gateway;
pub mod phases;
pub mod prioritizer;
pub mod projects;
pub mod rollup;
pub mod scorer;
pub mod tradelines;

#[cfg(test)]
mod testing;

pub use briefing::{Briefing, BriefingData, BriefingRenderer, BriefingService};
pub use error::{PlannerError, Result};
pub use focus::{FocusController, FocusOutcome};
pub use gateway::{
    ClaudeProvider, Generation, GenerationRequest, ModelError, ModelGateway, OpenAIProvider,
    ProviderConfig, TextGenerator,
};
pub use phases::{PhaseDraft, PhaseService};
pub use prioritizer::{
    PrioritizationOutcome, PrioritizationReport, Prioritizer, PrioritizerConfig, PriorityStatus,
};
pub use projects::{ProjectDraft, ProjectService};
pub use rollup::{build_status, StatusRollup, StatusService};
pub use scorer::{Scorer, ScoringConfig, WhatsNext};
pub use tradelines::{TradelineDraft, TradelineListing, TradelineService, TradelineStats};
