use clap::Parser;
use ryan_planner::scorer::DEFAULT_ACTIVE_PROJECTS;
use ryan_planner::{PrioritizerConfig, ProviderConfig, ScoringConfig};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "ryan")]
#[command(about = "Project manager service: what's next, focus, briefings and cross-project roadmaps")]
pub struct Args {
    /// Address to bind the HTTP server to
    #[arg(long, env = "BIND_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 5402)]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(long, env = "DB_PATH", default_value = "ryan.db")]
    pub db_path: PathBuf,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com")]
    pub openai_base_url: String,

    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = "https://api.anthropic.com")]
    pub anthropic_base_url: String,

    /// Low-cost model used for general generation
    #[arg(long, env = "GENERAL_MODEL", default_value = "gpt-4o-mini")]
    pub general_model: String,

    /// Model used for cross-project reasoning
    #[arg(long, env = "REASONING_MODEL", default_value = "claude-sonnet-4-20250514")]
    pub reasoning_model: String,

    #[arg(long, env = "MODEL_TIMEOUT_SECS", default_value_t = 120)]
    pub model_timeout_secs: u64,

    /// Project slug keywords that earn the active-project bonus
    #[arg(
        long,
        env = "ACTIVE_PROJECTS",
        value_delimiter = ',',
        default_values = DEFAULT_ACTIVE_PROJECTS
    )]
    pub active_projects: Vec<String>,

    /// Project path roadmap artifacts are filed under
    #[arg(long, env = "ROADMAP_PATH")]
    pub roadmap_path: Option<String>,

    #[arg(long, env = "SUSAN_URL", default_value = "http://localhost:5403")]
    pub susan_url: String,

    #[arg(long, env = "CLAIR_URL", default_value = "http://localhost:5406")]
    pub clair_url: String,
}

impl Args {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn scoring(&self) -> ScoringConfig {
        ScoringConfig {
            active_project_keywords: self
                .active_projects
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn prioritizer(&self) -> PrioritizerConfig {
        match &self.roadmap_path {
            Some(path) => PrioritizerConfig {
                artifact_project_path: path.clone(),
            },
            None => PrioritizerConfig::default(),
        }
    }

    pub fn openai(&self) -> ProviderConfig {
        ProviderConfig {
            base_url: self.openai_base_url.clone(),
            model: self.general_model.clone(),
            timeout_secs: self.model_timeout_secs,
            ..ProviderConfig::openai(self.openai_api_key.clone())
        }
    }

    pub fn anthropic(&self) -> ProviderConfig {
        ProviderConfig {
            base_url: self.anthropic_base_url.clone(),
            model: self.reasoning_model.clone(),
            timeout_secs: self.model_timeout_secs,
            ..ProviderConfig::anthropic(self.anthropic_api_key.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["ryan"]);
        assert_eq!(args.bind_addr(), "127.0.0.1:5402");
        assert_eq!(args.general_model, "gpt-4o-mini");
        assert_eq!(args.reasoning_model, "claude-sonnet-4-20250514");
        assert_eq!(
            args.scoring().active_project_keywords,
            vec!["kodiack", "core", "engine", "portal", "sources"]
        );
        assert_eq!(args.anthropic().timeout_secs, 120);
    }

    #[test]
    fn test_active_projects_list() {
        let args = Args::parse_from(["ryan", "--active-projects", "alpha, beta,,gamma"]);
        assert_eq!(
            args.scoring().active_project_keywords,
            vec!["alpha", "beta", "gamma"]
        );
    }

    #[test]
    fn test_provider_overrides() {
        let args = Args::parse_from([
            "ryan",
            "--openai-base-url",
            "http://localhost:9000",
            "--general-model",
            "gpt-4o",
            "--model-timeout-secs",
            "5",
        ]);
        let openai = args.openai();
        assert_eq!(openai.base_url, "http://localhost:9000");
        assert_eq!(openai.model, "gpt-4o");
        assert_eq!(openai.timeout_secs, 5);
    }
}
