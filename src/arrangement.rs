//! The learner's side of a problem: an ordered solution area and a scrap pool.
//!
//! Holds the pairing-group exclusivity invariant: at most one member of a group
//! sits in the solution. Moves that would break it evict the previous occupant
//! back to scrap and report the eviction instead of failing.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProblemError;
use crate::indent::indent_level;
use crate::problem::{Block, ProblemDefinition};

/// Prefix for submitted text lines that match no block.
pub const UNMATCHED_PREFIX: &str = "unmatched:";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
  pub block_id: String,
  #[serde(default)]
  pub indent: usize,
  /// Absolute indentation of a combined block's 2nd..nth lines, when they were
  /// submitted as separate text lines. Empty when placed as a unit.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub inner_indents: Vec<usize>,
}

impl Placement {
  pub fn new(block_id: impl Into<String>, indent: usize) -> Self {
    Self { block_id: block_id.into(), indent, inner_indents: Vec::new() }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Area {
  Solution,
  Scrap,
}

/// A group member pushed back to scrap because a sibling took its place.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Eviction {
  pub block_id: String,
  pub group_id: String,
  pub replaced_by: String,
  pub scrap_index: usize,
  pub message: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
  pub arrangement: LearnerArrangement,
  pub evicted: Vec<Eviction>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LearnerArrangement {
  #[serde(default)]
  pub solution: Vec<Placement>,
  #[serde(default)]
  pub scrap: Vec<String>,
}

impl LearnerArrangement {
  /// Everything in scrap, in source order.
  pub fn initial(problem: &ProblemDefinition) -> Self {
    Self { solution: Vec::new(), scrap: problem.blocks.iter().map(|b| b.id.clone()).collect() }
  }

  /// Everything in scrap, shuffled by the caller's RNG.
  pub fn scrambled<R: Rng + ?Sized>(problem: &ProblemDefinition, rng: &mut R) -> Self {
    let mut out = Self::initial(problem);
    out.scrap.shuffle(rng);
    out
  }

  /// The correct answer: canonical blocks in order at their canonical indentation.
  pub fn canonical(problem: &ProblemDefinition) -> Self {
    Self {
      solution: problem.solution_blocks().map(|b| Placement::new(b.id.clone(), b.expected_indent())).collect(),
      scrap: problem.distractors().map(|b| b.id.clone()).collect(),
    }
  }

  /// Resolve a text submission (one string per line, leading whitespace = indentation)
  /// to blocks. Longer blocks win, then canonical over distractor, then source order.
  pub fn from_lines(problem: &ProblemDefinition, lines: &[String]) -> Self {
    let width = problem.options.indent_width;
    let entries: Vec<&str> = lines.iter().map(|l| l.as_str()).filter(|l| !l.trim().is_empty()).collect();
    let mut used: HashSet<&str> = HashSet::new();
    let mut solution = Vec::new();

    let mut i = 0;
    while i < entries.len() {
      let rest = &entries[i..];
      let mut best: Option<&Block> = None;
      for b in problem.blocks.iter().filter(|b| !used.contains(b.id.as_str())) {
        let fits = b.lines.len() <= rest.len() && b.lines.iter().zip(rest).all(|(l, r)| l.text == r.trim());
        if !fits {
          continue;
        }
        let better = match best {
          None => true,
          Some(cur) => (b.lines.len(), !b.is_distractor) > (cur.lines.len(), !cur.is_distractor),
        };
        if better {
          best = Some(b);
        }
      }

      match best {
        Some(b) => {
          let k = b.lines.len();
          let mut placement = Placement::new(b.id.clone(), indent_level(rest[0], width));
          placement.inner_indents = rest[1..k].iter().map(|l| indent_level(l, width)).collect();
          solution.push(placement);
          used.insert(b.id.as_str());
          i += k;
        }
        None => {
          solution.push(Placement::new(
            format!("{}{}:{}", UNMATCHED_PREFIX, i, rest[0].trim()),
            indent_level(rest[0], width),
          ));
          i += 1;
        }
      }
    }

    let scrap = problem
      .blocks
      .iter()
      .filter(|b| !used.contains(b.id.as_str()))
      .map(|b| b.id.clone())
      .collect();
    Self { solution, scrap }
  }

  pub fn solution_ids(&self) -> impl Iterator<Item = &str> {
    self.solution.iter().map(|p| p.block_id.as_str())
  }

  /// Ids currently in the solution area.
  pub fn placed(&self) -> BTreeSet<String> {
    self.solution_ids().map(|s| s.to_string()).collect()
  }

  pub fn contains(&self, id: &str) -> bool {
    self.solution_ids().any(|s| s == id) || self.scrap.iter().any(|s| s == id)
  }

  /// A block may live in one area, once.
  pub fn check(&self) -> Result<(), ProblemError> {
    let mut seen = HashSet::new();
    for id in self.solution_ids().chain(self.scrap.iter().map(|s| s.as_str())) {
      if !seen.insert(id) {
        return Err(ProblemError::DuplicatePlacement { id: id.to_string() });
      }
    }
    Ok(())
  }

  /// Move a block to `position` of the target area (clamped). Entering the
  /// solution evicts any other member of the block's pairing group.
  pub fn move_block(
    &self,
    problem: &ProblemDefinition,
    block_id: &str,
    to: Area,
    position: usize,
    indent: usize,
  ) -> Result<MoveOutcome, ProblemError> {
    let block = problem
      .block(block_id)
      .ok_or_else(|| ProblemError::UnknownBlock { id: block_id.to_string() })?;

    let mut next = self.clone();
    let before = next.solution.len() + next.scrap.len();
    next.solution.retain(|p| p.block_id != block_id);
    next.scrap.retain(|s| s != block_id);
    if next.solution.len() + next.scrap.len() == before {
      return Err(ProblemError::NotInArrangement { id: block_id.to_string() });
    }

    match to {
      Area::Scrap => {
        let pos = position.min(next.scrap.len());
        next.scrap.insert(pos, block_id.to_string());
      }
      Area::Solution => {
        let pos = position.min(next.solution.len());
        next.solution.insert(pos, Placement::new(block_id, indent));
      }
    }

    let mut evicted = Vec::new();
    if let (Area::Solution, Some(group)) = (to, block.group_id.as_deref()) {
      let occupants: Vec<String> = next
        .solution
        .iter()
        .filter(|p| p.block_id != block_id && in_group(problem, &p.block_id, group))
        .map(|p| p.block_id.clone())
        .collect();
      for occupant in occupants {
        evicted.push(next.evict(problem, &occupant, group, block_id));
      }
    }

    let message = if evicted.is_empty() {
      None
    } else {
      Some(evicted.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join(" "))
    };
    debug!(target: "arrangement", %block_id, ?to, evicted = evicted.len(), "Block moved");
    Ok(MoveOutcome { arrangement: next, evicted, message })
  }

  /// Auto-correct an arrangement holding several members of one group: the member
  /// placed earliest stays, the others go back to scrap.
  pub fn enforce_exclusivity(&self, problem: &ProblemDefinition) -> (Self, Vec<Eviction>) {
    let mut keeper: BTreeMap<&str, &str> = BTreeMap::new();
    let mut conflicts: Vec<(String, String, String)> = Vec::new();
    for id in self.solution_ids() {
      if let Some(group) = problem.block(id).and_then(|b| b.group_id.as_deref()) {
        match keeper.get(group) {
          Some(first) => conflicts.push((id.to_string(), group.to_string(), first.to_string())),
          None => {
            keeper.insert(group, id);
          }
        }
      }
    }

    let mut next = self.clone();
    let evicted = conflicts
      .iter()
      .map(|(id, group, kept)| next.evict(problem, id, group, kept))
      .collect();
    (next, evicted)
  }

  /// Bring an arrangement in line with a (possibly adapted) problem: ids that no
  /// longer exist are dropped, new blocks land at the end of scrap.
  pub fn reconcile(&self, problem: &ProblemDefinition) -> Self {
    let known = |id: &str| id.starts_with(UNMATCHED_PREFIX) || problem.block(id).is_some();
    let mut next = Self {
      solution: self.solution.iter().filter(|p| known(&p.block_id)).cloned().collect(),
      scrap: self.scrap.iter().filter(|s| problem.block(s).is_some()).cloned().collect(),
    };
    for b in &problem.blocks {
      if !next.contains(&b.id) {
        next.scrap.push(b.id.clone());
      }
    }
    next
  }

  fn evict(&mut self, problem: &ProblemDefinition, id: &str, group: &str, replaced_by: &str) -> Eviction {
    self.solution.retain(|p| p.block_id != id);
    let sibling = self
      .scrap
      .iter()
      .position(|s| s != id && in_group(problem, s, group));
    let scrap_index = match sibling {
      Some(idx) => idx + 1,
      None => self.scrap.len(),
    };
    self.scrap.insert(scrap_index, id.to_string());

    let text = |b: &str| problem.block(b).map(|b| b.first_text().to_string()).unwrap_or_default();
    Eviction {
      block_id: id.to_string(),
      group_id: group.to_string(),
      replaced_by: replaced_by.to_string(),
      scrap_index,
      message: format!(
        "Only one variant of a line can be used at a time: \"{}\" went back to the scrap area in favour of \"{}\".",
        text(id),
        text(replaced_by)
      ),
    }
  }
}

fn in_group(problem: &ProblemDefinition, id: &str, group: &str) -> bool {
  problem.block(id).and_then(|b| b.group_id.as_deref()) == Some(group)
}
