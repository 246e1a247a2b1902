// Shared prompt constants used across evaluation templates.
// Each mode's template lives in evaluation/prompts.rs; this file holds cross-cutting fragments.

/// System prompt for every evaluation call. The response format is enforced by the
/// JSON schema attached to the request; this keeps the model's register consistent.
pub const EVALUATOR_SYSTEM: &str = "You are an experienced product management interviewer \
    and hiring-committee member. You evaluate mock interview transcripts fairly, \
    strictly and specifically. You respond with a single JSON object that matches \
    the supplied schema. Do NOT include any text outside the JSON object.";

/// Scoring scale shared by all rubrics.
pub const SCORE_SCALE: &str = "\
SCORING SCALE (half points allowed: 1, 1.5, 2, 2.5, 3, 3.5, 4):
- 4: Exceptional. Clearly exceeds the bar for the level.
- 3: Solid. Meets the bar with minor gaps.
- 2: Developing. Noticeable gaps that would concern an interviewer.
- 1: Weak. Missing or incorrect on this dimension.";

/// Evidence rules appended to every evaluation prompt.
pub const EVIDENCE_INSTRUCTION: &str = "\
CRITICAL: Base every score ONLY on what the candidate actually said in the transcript. \
Do NOT credit the candidate for content spoken by the interviewer. \
Every skill MUST include 1-3 short verbatim quotes from the candidate in supportingQuotes; \
if the candidate never addressed the skill, score it 1 and leave supportingQuotes empty.";
