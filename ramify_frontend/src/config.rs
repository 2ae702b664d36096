use std::env;

/// Knobs for the lazy comment tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub api_url: String,
    /// Nodes shallower than this load their replies on mount.
    pub auto_load_depth: usize,
    /// Nodes at or below this depth are replaced by a "continue thread" link.
    pub max_depth: usize,
    pub initial_visible_replies: usize,
    pub page_limit: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080".into(),
            auto_load_depth: 3,
            max_depth: 8,
            initial_visible_replies: 3,
            page_limit: 100,
        }
    }
}

impl RenderConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: env::var("RAMIFY_API_URL")
                .ok()
                .filter(|raw| !raw.trim().is_empty())
                .unwrap_or(defaults.api_url),
            auto_load_depth: env_usize("RAMIFY_AUTO_LOAD_DEPTH").unwrap_or(defaults.auto_load_depth),
            max_depth: env_usize("RAMIFY_MAX_DEPTH")
                .filter(|depth| *depth > 0)
                .unwrap_or(defaults.max_depth),
            initial_visible_replies: env_usize("RAMIFY_INITIAL_REPLIES")
                .unwrap_or(defaults.initial_visible_replies),
            page_limit: defaults.page_limit,
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|raw| raw.trim().parse().ok())
}
