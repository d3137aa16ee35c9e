//! Problem model: typed options, blocks and the canonical problem definition.
//!
//! A `ProblemDefinition` keeps its blocks in source order. Canonical lines and
//! distractors stay interleaved exactly as the author wrote them; the canonical
//! solution is the subsequence of non-distractor blocks.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize, Serializer};

use crate::error::ProblemError;

/// Rendering width of one level when presented in the text encoding.
pub const RENDER_INDENT: &str = "    ";

/// Which grader family the problem was authored for.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GraderKind {
  #[serde(alias = "ParsonsWidget._graders.LineBasedGrader")]
  LineBased,
  #[serde(alias = "ParsonsWidget._graders.VariableCheckGrader")]
  VariableCheck,
  #[serde(alias = "ParsonsWidget._graders.UnitTestGrader")]
  UnitTest,
  #[serde(alias = "ParsonsWidget._graders.LanguageTranslationGrader")]
  Translation,
  #[serde(alias = "ParsonsWidget._graders.TurtleGrader")]
  Turtle,
}
impl Default for GraderKind {
  fn default() -> Self { GraderKind::LineBased }
}

impl GraderKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      GraderKind::LineBased => "line-based",
      GraderKind::VariableCheck => "variable-check",
      GraderKind::UnitTest => "unit-test",
      GraderKind::Translation => "translation",
      GraderKind::Turtle => "turtle",
    }
  }
}

/// Every option the engine recognizes. Unknown fields are ignored on input.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemOptions {
  #[serde(default = "default_true", alias = "can_indent")]
  pub can_indent: bool,
  #[serde(default, alias = "max_wrong_lines", skip_serializing_if = "Option::is_none")]
  pub max_wrong_lines: Option<usize>,
  #[serde(default = "default_true", alias = "show_feedback")]
  pub show_feedback: bool,
  #[serde(default = "default_exec_limit", alias = "exec_limit", alias = "execution_limit_ms")]
  pub execution_limit_ms: u64,
  #[serde(default)]
  pub grader: GraderKind,
  #[serde(default = "default_indent_px", alias = "x_indent", alias = "indent_unit_px")]
  pub indent_unit_px: u32,
  /// Spaces per nesting level in the text encoding.
  #[serde(default = "default_indent_width", alias = "indent_width")]
  pub indent_width: usize,
  /// Falls back to `!can_indent` when absent.
  #[serde(default, alias = "allow_indentation_errors", skip_serializing_if = "Option::is_none")]
  pub allow_indentation_errors: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub vartests: Option<Vec<serde_json::Value>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub unittests: Option<String>,
  #[serde(default = "default_lang", alias = "programming_lang")]
  pub programming_lang: String,
}

fn default_true() -> bool { true }
fn default_exec_limit() -> u64 { 2500 }
fn default_indent_px() -> u32 { 50 }
fn default_indent_width() -> usize { 4 }
fn default_lang() -> String { "python".into() }

impl Default for ProblemOptions {
  fn default() -> Self {
    Self {
      can_indent: true,
      max_wrong_lines: None,
      show_feedback: true,
      execution_limit_ms: default_exec_limit(),
      grader: GraderKind::default(),
      indent_unit_px: default_indent_px(),
      indent_width: default_indent_width(),
      allow_indentation_errors: None,
      vartests: None,
      unittests: None,
      programming_lang: default_lang(),
    }
  }
}

impl ProblemOptions {
  pub fn allows_indentation_errors(&self) -> bool {
    self.allow_indentation_errors.unwrap_or(!self.can_indent)
  }

  /// Options an execution-based grader cannot run without.
  pub fn check(&self) -> Result<(), ProblemError> {
    if self.indent_width == 0 {
      return Err(ProblemError::InvalidIndentWidth);
    }
    match self.grader {
      GraderKind::VariableCheck if self.vartests.as_ref().map_or(true, |v| v.is_empty()) => {
        Err(ProblemError::MissingOption { option: "vartests", grader: self.grader.as_str() })
      }
      GraderKind::UnitTest if self.unittests.as_deref().map_or(true, |s| s.trim().is_empty()) => {
        Err(ProblemError::MissingOption { option: "unittests", grader: self.grader.as_str() })
      }
      _ => Ok(()),
    }
  }
}

/// One source line with its canonical indentation level.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeLine {
  pub text: String,
  pub indent: usize,
}

/// A fragment the learner arranges. Holds one line, or several once combined.
///
/// Serialized with the derived `content` and `isCombined` fields alongside the
/// stored ones; both are ignored on input.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
  pub id: String,
  pub lines: Vec<CodeLine>,
  /// Indentation the block is presented with (not necessarily the correct one).
  #[serde(default)]
  pub indentation_level: usize,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub group_id: Option<String>,
  #[serde(default)]
  pub is_distractor: bool,
  #[serde(default)]
  pub is_paired_distractor: bool,
}

impl Block {
  pub fn single(id: impl Into<String>, text: impl Into<String>, indent: usize, is_distractor: bool) -> Self {
    Self {
      id: id.into(),
      lines: vec![CodeLine { text: text.into(), indent }],
      indentation_level: 0,
      group_id: None,
      is_distractor,
      is_paired_distractor: false,
    }
  }

  /// Canonical indentation of the block, i.e. of its first line.
  pub fn expected_indent(&self) -> usize {
    self.lines.first().map(|l| l.indent).unwrap_or(0)
  }

  pub fn is_combined(&self) -> bool {
    self.lines.len() > 1
  }

  pub fn first_text(&self) -> &str {
    self.lines.first().map(|l| l.text.as_str()).unwrap_or("")
  }

  /// Display text; inner lines of a combined block keep their relative indentation.
  pub fn content(&self) -> String {
    let base = self.expected_indent();
    self
      .lines
      .iter()
      .enumerate()
      .map(|(i, l)| {
        if i == 0 {
          l.text.clone()
        } else {
          format!("{}{}", RENDER_INDENT.repeat(l.indent.saturating_sub(base)), l.text)
        }
      })
      .collect::<Vec<_>>()
      .join("\n")
  }
}

impl Serialize for Block {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Wire<'a> {
      id: &'a str,
      content: String,
      lines: &'a [CodeLine],
      indentation_level: usize,
      #[serde(skip_serializing_if = "Option::is_none")]
      group_id: Option<&'a str>,
      is_distractor: bool,
      is_paired_distractor: bool,
      is_combined: bool,
    }

    Wire {
      id: &self.id,
      content: self.content(),
      lines: &self.lines,
      indentation_level: self.indentation_level,
      group_id: self.group_id.as_deref(),
      is_distractor: self.is_distractor,
      is_paired_distractor: self.is_paired_distractor,
      is_combined: self.is_combined(),
    }
    .serialize(serializer)
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDefinition {
  pub blocks: Vec<Block>,
  #[serde(default)]
  pub options: ProblemOptions,
}

impl ProblemDefinition {
  pub fn new(blocks: Vec<Block>, options: ProblemOptions) -> Self {
    Self { blocks, options }
  }

  /// Canonical solution in order.
  pub fn solution_blocks(&self) -> impl Iterator<Item = &Block> {
    self.blocks.iter().filter(|b| !b.is_distractor)
  }

  pub fn distractors(&self) -> impl Iterator<Item = &Block> {
    self.blocks.iter().filter(|b| b.is_distractor)
  }

  pub fn solution_len(&self) -> usize {
    self.solution_blocks().count()
  }

  pub fn distractor_count(&self) -> usize {
    self.distractors().count()
  }

  pub fn block(&self, id: &str) -> Option<&Block> {
    self.blocks.iter().find(|b| b.id == id)
  }

  /// Index of a canonical block within the canonical solution.
  pub fn canonical_position(&self, id: &str) -> Option<usize> {
    self.solution_blocks().position(|b| b.id == id)
  }

  pub fn has_unpaired_distractor(&self) -> bool {
    self.distractors().any(|b| b.group_id.is_none())
  }

  pub fn groups(&self) -> BTreeMap<&str, Vec<&Block>> {
    let mut out: BTreeMap<&str, Vec<&Block>> = BTreeMap::new();
    for b in &self.blocks {
      if let Some(g) = b.group_id.as_deref() {
        out.entry(g).or_default().push(b);
      }
    }
    out
  }

  pub fn group_members(&self, group: &str) -> Vec<&Block> {
    self.blocks.iter().filter(|b| b.group_id.as_deref() == Some(group)).collect()
  }

  /// The correct line of a pairing group.
  pub fn canonical_member(&self, group: &str) -> Option<&Block> {
    self.blocks.iter().find(|b| b.group_id.as_deref() == Some(group) && !b.is_distractor)
  }

  /// Structural validation. Run before grading or adapting.
  pub fn check(&self) -> Result<(), ProblemError> {
    self.options.check()?;
    if self.solution_len() == 0 {
      return Err(ProblemError::EmptySolution);
    }

    let mut seen = HashSet::new();
    for b in &self.blocks {
      if !seen.insert(b.id.as_str()) {
        return Err(ProblemError::DuplicateBlockId { id: b.id.clone() });
      }
      if b.lines.is_empty() {
        return Err(ProblemError::EmptyBlock { id: b.id.clone() });
      }
    }

    for (group, members) in self.groups() {
      if members.len() < 2 {
        return Err(ProblemError::UndersizedGroup { group: group.to_string(), members: members.len() });
      }
      let canonical = members.iter().filter(|b| !b.is_distractor).count();
      if canonical != 1 {
        return Err(ProblemError::AmbiguousGroup { group: group.to_string(), canonical });
      }
    }
    Ok(())
  }
}

/// Where a bank entry came from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProblemSource {
  LocalBank,
  Seed,
  Generated,
}

/// A problem as held by the in-memory bank: metadata plus the definition.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemRecord {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  pub difficulty: String,
  #[serde(default)]
  pub tags: Vec<String>,
  pub source: ProblemSource,
  pub problem: ProblemDefinition,
}
