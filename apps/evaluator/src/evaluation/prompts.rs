// Evaluation prompt templates, one per interview mode.
// Shared fragments ({score_scale}, {evidence_instruction}) come from llm_client::prompts.

/// Full mock interview.
/// Replace: {evidence_instruction}, {score_scale}, {rubric}, {verdict_scale},
///          {skill_count}, {transcript}
pub const FULL_INTERVIEW_TEMPLATE: &str = r#"You are evaluating a full product manager mock interview.

{evidence_instruction}

RUBRIC: score EVERY one of these {skill_count} skills, in this order, using these exact names:
{rubric}

{score_scale}

OVERALL VERDICT (pick exactly one):
{verdict_scale}

Also provide:
- overallExplanation: 3-5 sentences justifying the verdict.
- recommendedImprovements: up to 5 specific, actionable improvements, most important first.

TRANSCRIPT:
{transcript}"#;

/// Single practice question.
/// Replace: {evidence_instruction}, {score_scale}, {category}, {question},
///          {rubric}, {verdict_scale}, {skill_count}, {transcript}
pub const QUICK_QUESTION_TEMPLATE: &str = r#"You are evaluating a candidate's answer to a single {category} product manager interview question.

QUESTION:
{question}

{evidence_instruction}

RUBRIC: score EVERY one of these {skill_count} skills, using these exact names.
Each skill lists what a 1, 2, 3 and 4 look like:
{rubric}

{score_scale}

OVERALL VERDICT (pick exactly one):
{verdict_scale}

Also provide:
- overallExplanation: 2-4 sentences on the answer as a whole.
- recommendedImprovements: up to 3 specific, actionable improvements.

TRANSCRIPT:
{transcript}"#;

/// Interview tailored to a specific company and role.
/// Replace: {evidence_instruction}, {score_scale}, {company}, {role},
///          {job_description}, {questions}, {rubric}, {verdict_scale},
///          {skill_count}, {transcript}
pub const JOB_SPECIFIC_TEMPLATE: &str = r#"You are evaluating a mock interview for the {role} role at {company}.

JOB DESCRIPTION (excerpt):
{job_description}

QUESTIONS PREPARED FOR THIS INTERVIEW:
{questions}

{evidence_instruction}

RUBRIC: score EVERY one of these {skill_count} skills, in this order, using these exact names:
{rubric}

{score_scale}

OVERALL VERDICT for the {role} role at {company} (pick exactly one):
{verdict_scale}

Also provide:
- overallExplanation: 3-5 sentences justifying the verdict.
- companyFitAssessment: 2-4 sentences on how well the candidate fits {company} specifically.
- recommendedImprovements: up to 5 specific, actionable improvements for this role.

TRANSCRIPT:
{transcript}"#;

pub const FULL_VERDICT_SCALE: &str = "\
- Strong Hire: Clearly above the bar; would advocate for this candidate.
- Hire: Meets the bar across most skills.
- No Hire: Below the bar on several important skills.
- Strong No Hire: Well below the bar.";

pub const QUICK_VERDICT_SCALE: &str = "\
- Strong: Interview-ready answer.
- Good: Solid answer with a few gaps.
- Needs Work: Noticeable gaps; practice this question type again.
- Weak: The answer does not address the question effectively.";

/// Used when the stored job description is empty.
pub const NO_JOB_DESCRIPTION: &str = "(not provided)";

/// Maximum job-description characters included in the prompt.
pub const JOB_DESCRIPTION_MAX_CHARS: usize = 2000;
