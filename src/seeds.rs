//! Built-in problems that make the service useful without any config file.

use tracing::error;

use crate::parse::parse_problem;
use crate::problem::{ProblemOptions, ProblemRecord, ProblemSource};

struct Seed {
  id: &'static str,
  title: &'static str,
  description: &'static str,
  difficulty: &'static str,
  tags: &'static [&'static str],
  source: &'static str,
  can_indent: bool,
}

const SEEDS: &[Seed] = &[
  Seed {
    id: "print-coordinates",
    title: "Print coordinates",
    description: "Print every (row, column) pair of a grid.",
    difficulty: "easy",
    tags: &["loops", "nesting"],
    source: "\
def print_coordinates(rows, cols):
    for i in range(rows):
        for j in range(cols):
            print(f\"({i}, {j})\")",
    can_indent: true,
  },
  Seed {
    id: "count-evens",
    title: "Count even numbers",
    description: "Return how many numbers in the list are even.",
    difficulty: "medium",
    tags: &["loops", "conditionals"],
    source: "\
def count_evens(nums):
    count = 0
    for n in nums:
        if n % 2 == 0:
            count += 1
    return count
    if n % 2 = 0 #distractor
    return nums #distractor",
    can_indent: true,
  },
  Seed {
    id: "average",
    title: "Average of a list",
    description: "Compute the arithmetic mean of a non-empty list.",
    difficulty: "medium",
    tags: &["loops", "arithmetic"],
    source: "\
def average(values):
    total = 0
    for v in values:
        total += v
    count = len(values)
    return total / count
    return total * count #distractor
    for v in value #distractor",
    can_indent: true,
  },
  Seed {
    id: "is-adult",
    title: "Adult check",
    description: "Return True when the age is at least 18.",
    difficulty: "easy",
    tags: &["conditionals"],
    source: "\
def is_adult(age):
    if age >= 18:
        return True
    return False
    if age > 18: #distractor",
    can_indent: false,
  },
];

/// Minimal set of built-in problems. A seed that fails to parse is logged and skipped.
pub fn seed_problems() -> Vec<ProblemRecord> {
  SEEDS
    .iter()
    .filter_map(|s| {
      let options = ProblemOptions { can_indent: s.can_indent, ..ProblemOptions::default() };
      match parse_problem(s.source, options) {
        Ok(problem) => Some(ProblemRecord {
          id: s.id.into(),
          title: s.title.into(),
          description: s.description.into(),
          difficulty: s.difficulty.into(),
          tags: s.tags.iter().map(|t| t.to_string()).collect(),
          source: ProblemSource::Seed,
          problem,
        }),
        Err(e) => {
          error!(target: "problem", id = s.id, error = %e, "Skipping invalid seed problem");
          None
        }
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_seed_parses() {
    let seeds = seed_problems();
    assert_eq!(seeds.len(), SEEDS.len());
    let adult = seeds.iter().find(|r| r.id == "is-adult").expect("seed");
    assert_eq!(adult.problem.distractor_count(), 1);
    assert!(adult.problem.options.allows_indentation_errors());
  }
}
