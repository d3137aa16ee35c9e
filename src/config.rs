//! Loading engine configuration (adaptive policy + optional problem bank) from TOML.
//!
//! Example:
//!   [adaptive]
//!   remove_after_incorrect = 2
//!   distractors_per_step = 2
//!
//!   [[problems]]
//!   id = "sum-list"
//!   title = "Sum a list"
//!   difficulty = "easy"
//!   distractors = 2
//!   initial = """
//!   def total(xs):
//!       s = 0
//!       for x in xs:
//!           s += x
//!       return s
//!   """
//!   options = { can_indent = true }

use serde::Deserialize;
use tracing::{error, info};

use crate::adaptive::PolicyConfig;
use crate::problem::ProblemOptions;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct EngineConfig {
  #[serde(default)]
  pub adaptive: PolicyConfig,
  #[serde(default)]
  pub problems: Vec<ProblemCfg>,
}

/// Problem entry accepted in TOML configuration. `initial` uses the marker
/// text encoding; `distractors` asks the generator for that many extra lines.
#[derive(Clone, Debug, Deserialize)]
pub struct ProblemCfg {
  #[serde(default)] pub id: Option<String>,
  pub title: String,
  #[serde(default)] pub description: String,
  #[serde(default = "default_difficulty")] pub difficulty: String,
  #[serde(default)] pub tags: Vec<String>,
  pub initial: String,
  #[serde(default)] pub distractors: usize,
  #[serde(default)] pub options: ProblemOptions,
}

fn default_difficulty() -> String {
  "medium".into()
}

pub fn parse_engine_config(s: &str) -> Result<EngineConfig, toml::de::Error> {
  toml::from_str::<EngineConfig>(s)
}

/// Attempt to load `EngineConfig` from ENGINE_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_engine_config_from_env() -> Option<EngineConfig> {
  let path = std::env::var("ENGINE_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_engine_config(&s) {
      Ok(cfg) => {
        info!(target: "parsons_backend", %path, problems = cfg.problems.len(), "Loaded engine config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "parsons_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "parsons_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_policy_and_bank() {
    let cfg = parse_engine_config(
      r#"
[adaptive]
remove_after_incorrect = 2
distractors_per_step = 2

[[problems]]
title = "Hello"
initial = "print('hi')"
options = { can_indent = false, max_wrong_lines = 1 }
"#,
    )
    .expect("config");
    assert_eq!(cfg.adaptive.remove_after_incorrect, 2);
    assert_eq!(cfg.adaptive.combine_after_incorrect, 5);
    assert_eq!(cfg.problems.len(), 1);
    assert_eq!(cfg.problems[0].difficulty, "medium");
    assert!(!cfg.problems[0].options.can_indent);
    assert_eq!(cfg.problems[0].options.max_wrong_lines, Some(1));
  }

  #[test]
  fn empty_file_is_all_defaults() {
    let cfg = parse_engine_config("").expect("config");
    assert!(cfg.problems.is_empty());
    assert_eq!(cfg.adaptive, PolicyConfig::default());
  }
}
