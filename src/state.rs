//! Application state: the in-memory problem bank, the validation engine and the
//! adaptive policy.
//!
//! This module owns:
//!   - problems by id (config bank, built-in seeds, generated at runtime)
//!   - one `ValidationEngine` with the default rule set
//!   - one `AdaptivePolicy` built from the `[adaptive]` config table
//!
//! Learner state is never stored here; clients round-trip it.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::adaptive::AdaptivePolicy;
use crate::config::{load_engine_config_from_env, EngineConfig};
use crate::generator::generate_problem;
use crate::problem::{ProblemRecord, ProblemSource};
use crate::seeds::seed_problems;
use crate::validation::ValidationEngine;

#[derive(Clone)]
pub struct AppState {
    pub problems: Arc<RwLock<HashMap<String, ProblemRecord>>>,
    pub engine: Arc<ValidationEngine>,
    pub policy: AdaptivePolicy,
}

impl AppState {
    /// Build state from env: load config if ENGINE_CONFIG_PATH is set, else defaults.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        Self::from_config(load_engine_config_from_env().unwrap_or_default())
    }

    /// Build state from an already loaded config: bank entries first, then seeds
    /// (which never overwrite a bank entry with the same id).
    pub fn from_config(cfg: EngineConfig) -> Self {
        let mut by_id = HashMap::<String, ProblemRecord>::new();

        for pc in cfg.problems {
            let id = pc.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
            match generate_problem(&pc.initial, pc.distractors, pc.options) {
                Ok(problem) => {
                    by_id.insert(
                        id.clone(),
                        ProblemRecord {
                            id,
                            title: pc.title,
                            description: pc.description,
                            difficulty: pc.difficulty,
                            tags: pc.tags,
                            source: ProblemSource::LocalBank,
                            problem,
                        },
                    );
                }
                Err(e) => {
                    error!(target: "problem", %id, error = %e, "Skipping bank item: invalid problem");
                }
            }
        }

        for r in seed_problems() {
            by_id.entry(r.id.clone()).or_insert(r);
        }

        // Inventory summary by difficulty/source.
        let mut count_by_diff: HashMap<String, (usize, usize, usize)> = HashMap::new();
        for r in by_id.values() {
            let entry = count_by_diff.entry(r.difficulty.clone()).or_insert((0, 0, 0));
            match r.source {
                ProblemSource::LocalBank => entry.0 += 1,
                ProblemSource::Generated => entry.1 += 1,
                ProblemSource::Seed => entry.2 += 1,
            }
        }
        for (diff, (bank, gen, seed)) in count_by_diff {
            info!(target: "problem", %diff, local_bank = bank, generated = gen, seed = seed, "Startup problem inventory");
        }

        let policy = AdaptivePolicy::from_config(cfg.adaptive);
        info!(target: "parsons_backend", config = ?policy.config(), "Adaptive policy ready");

        Self {
            problems: Arc::new(RwLock::new(by_id)),
            engine: Arc::new(ValidationEngine::with_default_rules()),
            policy,
        }
    }

    #[instrument(level = "debug", skip(self, r), fields(id = %r.id))]
    pub async fn insert_problem(&self, r: ProblemRecord) {
        self.problems.write().await.insert(r.id.clone(), r);
    }

    /// Drop a problem from the bank, returning it when it existed.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn remove_problem(&self, id: &str) -> Option<ProblemRecord> {
        self.problems.write().await.remove(id)
    }

    /// Read-only access to a problem by id.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_problem(&self, id: &str) -> Option<ProblemRecord> {
        self.problems.read().await.get(id).cloned()
    }

    /// All problems, ordered by difficulty then id.
    pub async fn list_problems(&self) -> Vec<ProblemRecord> {
        let mut all: Vec<ProblemRecord> = self.problems.read().await.values().cloned().collect();
        all.sort_by(|a, b| (&a.difficulty, &a.id).cmp(&(&b.difficulty, &b.id)));
        all
    }
}
