//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Wire names are camelCase; engine types are reused as-is where they already
//! serialize the way clients expect.

use serde::{Deserialize, Serialize};

use crate::adaptive::{AdaptationOutcome, AdaptiveState};
use crate::arrangement::{Area, LearnerArrangement, MoveOutcome};
use crate::indent::IndentationIssue;
use crate::problem::{ProblemDefinition, ProblemOptions, ProblemRecord, ProblemSource};
use crate::validation::ValidationVerdict;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    ListProblems,
    GetProblem {
        #[serde(rename = "problemId")]
        problem_id: String,
    },
    GenerateProblem(GenerateIn),
    Validate(ValidateIn),
    Adapt(AdaptIn),
    Attempt(AttemptIn),
    MoveBlock(MoveIn),
    IndentationHints(HintsIn),
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Problems {
        problems: Vec<ProblemSummary>,
    },
    Problem {
        problem: ProblemOut,
    },
    Verdict {
        verdict: ValidationVerdict,
    },
    Adaptation {
        result: AdaptOut,
    },
    Attempt {
        result: AttemptOut,
    },
    Moved {
        result: MoveOutcome,
    },
    IndentationHints {
        result: HintsOut,
    },
    Error {
        message: String,
    },
}

/// Listing entry; no blocks.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemSummary {
    pub id: String,
    pub title: String,
    pub difficulty: String,
    pub tags: Vec<String>,
    pub source: ProblemSource,
    pub block_count: usize,
}

/// DTO used by both WS and HTTP for problem delivery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemOut {
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub tags: Vec<String>,
    pub source: ProblemSource,
    pub problem: ProblemDefinition,
    /// Every block in scrap, shuffled.
    pub initial_arrangement: LearnerArrangement,
}

pub fn to_summary(r: &ProblemRecord) -> ProblemSummary {
    ProblemSummary {
        id: r.id.clone(),
        title: r.title.clone(),
        difficulty: r.difficulty.clone(),
        tags: r.tags.clone(),
        source: r.source,
        block_count: r.problem.blocks.len(),
    }
}

/// Convert a bank record to the public DTO, scrambling the starting scrap.
pub fn to_out(r: &ProblemRecord) -> ProblemOut {
    let initial_arrangement = LearnerArrangement::scrambled(&r.problem, &mut rand::thread_rng());
    ProblemOut {
        id: r.id.clone(),
        title: r.title.clone(),
        description: r.description.clone(),
        difficulty: r.difficulty.clone(),
        tags: r.tags.clone(),
        source: r.source,
        problem: r.problem.clone(),
        initial_arrangement,
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateIn {
    #[serde(alias = "source_code")]
    pub source_code: String,
    #[serde(default)]
    pub distractors: Option<usize>,
    #[serde(default)]
    pub options: Option<ProblemOptions>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// Every request that targets a problem names a bank entry or carries one inline.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemRef {
    #[serde(default, alias = "problem_id")]
    pub problem_id: Option<String>,
    #[serde(default)]
    pub problem: Option<ProblemDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateIn {
    #[serde(flatten)]
    pub target: ProblemRef,
    #[serde(default)]
    pub arrangement: Option<LearnerArrangement>,
    /// Text submission, one entry per line.
    #[serde(default)]
    pub solution: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptIn {
    #[serde(flatten)]
    pub target: ProblemRef,
    #[serde(default)]
    pub state: AdaptiveState,
    #[serde(default)]
    pub arrangement: Option<LearnerArrangement>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptOut {
    #[serde(flatten)]
    pub outcome: AdaptationOutcome,
    /// The submitted arrangement brought in line with the new problem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrangement: Option<LearnerArrangement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptIn {
    #[serde(default)]
    pub state: AdaptiveState,
    pub correct: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOut {
    pub state: AdaptiveState,
    pub should_adapt: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveIn {
    #[serde(flatten)]
    pub target: ProblemRef,
    pub arrangement: LearnerArrangement,
    pub block_id: String,
    pub to: Area,
    #[serde(default)]
    pub position: usize,
    #[serde(default)]
    pub indent: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintsIn {
    #[serde(flatten)]
    pub target: ProblemRef,
    pub arrangement: LearnerArrangement,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HintsOut {
    pub issues: Vec<IndentationIssue>,
    pub messages: Vec<String>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}
