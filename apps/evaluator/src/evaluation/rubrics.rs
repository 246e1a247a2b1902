//! Rubric tables: immutable skill sets and score descriptions for every mode.
//!
//! Quick-question rubrics are keyed by question category. Category names arrive
//! in several spellings ("Behavioral", "behavioral", "product_design", "metrics"),
//! so lookups go through `normalize_category` and an alias list rather than
//! duplicated table entries.

/// A named skill with one description per score level (index 0 = score 1).
#[derive(Debug, Clone, Copy)]
pub struct SkillRubric {
    pub name: &'static str,
    pub levels: [&'static str; 4],
}

/// The four skills evaluated for one quick-question category.
#[derive(Debug)]
pub struct CategoryRubric {
    pub category: &'static str,
    /// Normalized alternative names that resolve to this category.
    pub aliases: &'static [&'static str],
    pub skills: [SkillRubric; 4],
}

/// A skill in the full or job-specific rubric: a name and what it measures.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillDefinition {
    pub name: String,
    pub description: String,
}

/// Category used when a question's category is unknown.
pub const DEFAULT_CATEGORY: &str = "Product Design";

pub static CATEGORY_RUBRICS: [CategoryRubric; 9] = [
    CategoryRubric {
        category: "Behavioral",
        aliases: &["behavioural", "behavior", "leadership principles"],
        skills: [
            SkillRubric {
                name: "Story Structure & Clarity",
                levels: [
                    "Rambling or fragmented; the listener cannot follow what happened.",
                    "A recognizable story, but situation, actions and result blur together.",
                    "Clear situation, task, action and result with minor digressions.",
                    "Tight, well-paced narrative; every detail serves the point.",
                ],
            },
            SkillRubric {
                name: "Ownership & Accountability",
                levels: [
                    "Credits or blames others; own role is unclear.",
                    "Describes team actions with little personal contribution.",
                    "Clearly owns decisions and actions, including mistakes.",
                    "Takes full ownership, reflects candidly on failures and what changed after.",
                ],
            },
            SkillRubric {
                name: "Impact & Results Orientation",
                levels: [
                    "No outcome mentioned.",
                    "Vague outcome with no measure of success.",
                    "Concrete outcome tied to a business or user metric.",
                    "Quantified impact, clearly attributed, with lessons carried forward.",
                ],
            },
            SkillRubric {
                name: "Communication & Executive Presence",
                levels: [
                    "Unclear, hesitant or overly long answers.",
                    "Understandable but unfocused; buries the key message.",
                    "Confident and concise; adapts to follow-up questions.",
                    "Crisp, composed and persuasive; leads with the headline.",
                ],
            },
        ],
    },
    CategoryRubric {
        category: "Product Design",
        aliases: &["product sense", "design", "product thinking"],
        skills: [
            SkillRubric {
                name: "User Empathy & Problem Framing",
                levels: [
                    "Jumps to solutions without identifying users or problems.",
                    "Names a user group but the pain points are generic.",
                    "Segments users and picks a well-reasoned problem to solve.",
                    "Deep, specific insight into user needs that reshapes the problem.",
                ],
            },
            SkillRubric {
                name: "Solution Creativity",
                levels: [
                    "A single obvious idea, or none.",
                    "A few ideas that are incremental or poorly connected to the problem.",
                    "Several distinct ideas that address the chosen pain point.",
                    "Inventive, differentiated ideas grounded in the user insight.",
                ],
            },
            SkillRubric {
                name: "Prioritization & Trade-offs",
                levels: [
                    "No prioritization between ideas.",
                    "Picks an idea without a stated rationale.",
                    "Prioritizes with explicit criteria such as impact and effort.",
                    "Weighs trade-offs candidly and defends the choice under pushback.",
                ],
            },
            SkillRubric {
                name: "Success Metrics Definition",
                levels: [
                    "No way to tell whether the product worked.",
                    "Vanity or loosely related metrics.",
                    "A clear primary metric with supporting guardrails.",
                    "Metrics tied to the user problem, with targets and counter-metrics.",
                ],
            },
        ],
    },
    CategoryRubric {
        category: "Product Strategy",
        aliases: &["strategy", "business strategy", "go to market"],
        skills: [
            SkillRubric {
                name: "Market & Competitive Insight",
                levels: [
                    "No reference to market or competitors.",
                    "Surface-level mentions of competitors.",
                    "Sound read of market dynamics and competitive positioning.",
                    "Sharp, non-obvious insight into where the market is heading.",
                ],
            },
            SkillRubric {
                name: "Strategic Vision",
                levels: [
                    "No long-term direction.",
                    "A direction that is generic or disconnected from the company.",
                    "A coherent vision that builds on company strengths.",
                    "Compelling, differentiated vision with a credible path to get there.",
                ],
            },
            SkillRubric {
                name: "Business Model Thinking",
                levels: [
                    "Ignores how the product makes money or creates value.",
                    "Mentions revenue without connecting it to the strategy.",
                    "Links the strategy to monetization and unit economics.",
                    "Reasons fluently about value capture, pricing and long-term moats.",
                ],
            },
            SkillRubric {
                name: "Risk & Trade-off Analysis",
                levels: [
                    "No risks identified.",
                    "Lists risks without mitigation.",
                    "Identifies key risks and sensible mitigations.",
                    "Anticipates second-order effects and sequences bets to limit downside.",
                ],
            },
        ],
    },
    CategoryRubric {
        category: "Analytical",
        aliases: &["metrics", "analytics", "analytical thinking", "data"],
        skills: [
            SkillRubric {
                name: "Metric Selection",
                levels: [
                    "Picks irrelevant or no metrics.",
                    "Reasonable metrics without explaining why they matter.",
                    "A well-justified north-star metric with supporting metrics.",
                    "A metric tree that links user behavior to business outcomes.",
                ],
            },
            SkillRubric {
                name: "Root Cause Analysis",
                levels: [
                    "Guesses at a single cause.",
                    "Lists possible causes without a way to narrow them down.",
                    "Systematically separates internal, external and data-quality causes.",
                    "Efficiently isolates the cause with targeted cuts of the data.",
                ],
            },
            SkillRubric {
                name: "Data-Driven Reasoning",
                levels: [
                    "Conclusions are not supported by data.",
                    "Uses data but draws shaky inferences.",
                    "Draws sound conclusions and notes limitations.",
                    "Rigorous reasoning, aware of bias, significance and confounders.",
                ],
            },
            SkillRubric {
                name: "Structured Problem Solving",
                levels: [
                    "No discernible structure.",
                    "Some structure that breaks down under follow-ups.",
                    "Clear, logical framework applied consistently.",
                    "Elegant structure that makes the answer easy to follow and extend.",
                ],
            },
        ],
    },
    CategoryRubric {
        category: "Estimation",
        aliases: &["market sizing", "guesstimate", "guesstimates", "sizing"],
        skills: [
            SkillRubric {
                name: "Assumption Setting",
                levels: [
                    "Assumptions are missing or unstated.",
                    "Assumptions are stated but several are unrealistic.",
                    "Reasonable, explicit assumptions.",
                    "Well-calibrated assumptions, each justified and easy to revisit.",
                ],
            },
            SkillRubric {
                name: "Logical Decomposition",
                levels: [
                    "No breakdown of the problem.",
                    "A breakdown with gaps or double counting.",
                    "A clean, mutually exclusive breakdown.",
                    "An insightful decomposition that simplifies the estimate.",
                ],
            },
            SkillRubric {
                name: "Quantitative Accuracy",
                levels: [
                    "Frequent arithmetic errors.",
                    "Minor errors that affect the answer.",
                    "Accurate calculations with sensible rounding.",
                    "Fast, accurate math communicated clearly along the way.",
                ],
            },
            SkillRubric {
                name: "Sanity Checking",
                levels: [
                    "Accepts any result without question.",
                    "Notices an odd result but does not investigate.",
                    "Checks the result against a known benchmark.",
                    "Triangulates with an independent method and adjusts.",
                ],
            },
        ],
    },
    CategoryRubric {
        category: "Execution",
        aliases: &["delivery", "project management", "program management"],
        skills: [
            SkillRubric {
                name: "Goal Setting & Planning",
                levels: [
                    "No clear goal or plan.",
                    "A goal without milestones or ownership.",
                    "Clear goals with a realistic plan and milestones.",
                    "Outcome-based goals with a plan that anticipates dependencies.",
                ],
            },
            SkillRubric {
                name: "Prioritization Under Constraints",
                levels: [
                    "Tries to do everything.",
                    "Cuts scope arbitrarily.",
                    "Cuts scope with a clear rationale tied to the goal.",
                    "Makes hard calls decisively and explains what is deferred and why.",
                ],
            },
            SkillRubric {
                name: "Cross-functional Coordination",
                levels: [
                    "Works in isolation.",
                    "Involves other teams late or reactively.",
                    "Aligns engineering, design and stakeholders proactively.",
                    "Builds shared ownership and resolves blockers across teams.",
                ],
            },
            SkillRubric {
                name: "Decision Making Under Ambiguity",
                levels: [
                    "Stalls without complete information.",
                    "Decides but cannot articulate the reasoning.",
                    "Makes reasoned decisions and states the assumptions.",
                    "Decides quickly, sets checkpoints and adapts as information arrives.",
                ],
            },
        ],
    },
    CategoryRubric {
        category: "Technical",
        aliases: &["technical pm", "tech", "system design"],
        skills: [
            SkillRubric {
                name: "Technical Fluency",
                levels: [
                    "Misuses basic technical concepts.",
                    "Understands concepts at a buzzword level.",
                    "Explains relevant technical concepts accurately.",
                    "Discusses technology with depth comparable to engineers.",
                ],
            },
            SkillRubric {
                name: "System Design Understanding",
                levels: [
                    "Cannot describe how the system works.",
                    "A rough sketch with major gaps.",
                    "A coherent high-level architecture with the main components.",
                    "A clear architecture that addresses scale, reliability and data flow.",
                ],
            },
            SkillRubric {
                name: "Engineering Trade-offs",
                levels: [
                    "Unaware of trade-offs.",
                    "Names trade-offs without weighing them.",
                    "Weighs trade-offs against product goals.",
                    "Frames trade-offs in terms of cost, time and user impact to drive a decision.",
                ],
            },
            SkillRubric {
                name: "Engineering Collaboration",
                levels: [
                    "Treats engineering as an order-taker.",
                    "Collaborates, but hands off requirements with little context.",
                    "Partners with engineers on problem definition and scoping.",
                    "Earns engineering trust; co-creates solutions and protects focus.",
                ],
            },
        ],
    },
    CategoryRubric {
        category: "Prioritization",
        aliases: &["roadmap", "roadmapping", "product prioritization"],
        skills: [
            SkillRubric {
                name: "Framework Application",
                levels: [
                    "Prioritizes by gut feel alone.",
                    "Names a framework but applies it mechanically.",
                    "Applies a suitable framework with sensible inputs.",
                    "Adapts the framework to the context and explains its limits.",
                ],
            },
            SkillRubric {
                name: "Stakeholder Alignment",
                levels: [
                    "Ignores stakeholders.",
                    "Acknowledges stakeholders but does not address conflicts.",
                    "Balances stakeholder needs and communicates the outcome.",
                    "Builds consensus on hard trade-offs while keeping trust.",
                ],
            },
            SkillRubric {
                name: "Impact Assessment",
                levels: [
                    "No estimate of impact.",
                    "Qualitative impact claims only.",
                    "Estimates impact with reasonable data or proxies.",
                    "Quantifies impact and confidence, and compares opportunity costs.",
                ],
            },
            SkillRubric {
                name: "Decisiveness",
                levels: [
                    "Refuses to commit to a priority.",
                    "Commits but wavers under pushback.",
                    "Commits clearly with a rationale.",
                    "Commits, defends the choice and states what would change it.",
                ],
            },
        ],
    },
    CategoryRubric {
        category: "Leadership",
        aliases: &["people management", "leadership & influence", "influence"],
        skills: [
            SkillRubric {
                name: "Vision Setting",
                levels: [
                    "No direction offered.",
                    "A direction that does not inspire or guide decisions.",
                    "A clear vision that the team can act on.",
                    "A motivating vision that aligns the team and guides trade-offs.",
                ],
            },
            SkillRubric {
                name: "Influence Without Authority",
                levels: [
                    "Relies on escalation or title.",
                    "Persuades through persistence rather than reasoning.",
                    "Persuades with data and by understanding others' incentives.",
                    "Builds coalitions and changes minds across the organization.",
                ],
            },
            SkillRubric {
                name: "Team Development",
                levels: [
                    "No attention to others' growth.",
                    "Occasional feedback without follow-through.",
                    "Coaches teammates and delegates meaningfully.",
                    "Deliberately grows people and builds a strong team culture.",
                ],
            },
            SkillRubric {
                name: "Conflict Resolution",
                levels: [
                    "Avoids or escalates conflict.",
                    "Resolves conflict by compromise without addressing root causes.",
                    "Surfaces disagreement and resolves it constructively.",
                    "Turns conflict into better decisions and stronger relationships.",
                ],
            },
        ],
    },
];

/// Lowercases, trims, maps `_`/`-` to spaces and collapses whitespace.
pub fn normalize_category(category: &str) -> String {
    category
        .trim()
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Looks up the rubric for a category, falling back to `DEFAULT_CATEGORY`.
/// Returns `(rubric, matched)` so callers can log a fallback.
pub fn rubric_for_category(category: &str) -> (&'static CategoryRubric, bool) {
    let normalized = normalize_category(category);
    let found = CATEGORY_RUBRICS.iter().find(|r| {
        normalize_category(r.category) == normalized || r.aliases.contains(&normalized.as_str())
    });
    match found {
        Some(rubric) => (rubric, true),
        None => (default_rubric(), false),
    }
}

fn default_rubric() -> &'static CategoryRubric {
    CATEGORY_RUBRICS
        .iter()
        .find(|r| r.category == DEFAULT_CATEGORY)
        .unwrap_or(&CATEGORY_RUBRICS[0])
}

// ────────────────────────────────────────────────────────────────────────────
// Full interview rubric
// ────────────────────────────────────────────────────────────────────────────

pub const FULL_RUBRIC: [(&str, &str); 12] = [
    ("Product Sense", "Identifies real user problems and proposes products that solve them well."),
    ("User Empathy", "Understands users' motivations, pain points and context in specific terms."),
    ("Structured Thinking", "Breaks ambiguous problems into clear, logical components."),
    ("Prioritization", "Chooses what matters most using explicit criteria and trade-offs."),
    ("Metrics & Analytics", "Defines meaningful success metrics and reasons rigorously with data."),
    ("Technical Acumen", "Understands technical constraints and communicates credibly with engineers."),
    ("Strategic Thinking", "Connects product decisions to market, competition and long-term company goals."),
    ("Execution", "Plans, ships and iterates; handles scope, timelines and risks."),
    ("Communication", "Communicates clearly, concisely and adapts to the audience."),
    ("Leadership & Influence", "Aligns and motivates others without relying on authority."),
    ("Stakeholder Management", "Balances the needs of customers, teams and leadership; manages conflict."),
    ("Creativity & Innovation", "Generates original ideas and challenges assumptions constructively."),
];

pub fn full_rubric() -> Vec<SkillDefinition> {
    FULL_RUBRIC
        .iter()
        .map(|(name, description)| SkillDefinition {
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Job-specific rubric (rendered per company and role)
// ────────────────────────────────────────────────────────────────────────────

pub const COMPANY_KNOWLEDGE_SKILL: &str = "Company & Product Knowledge";

pub fn job_specific_rubric(company: &str, role: &str) -> Vec<SkillDefinition> {
    vec![
        SkillDefinition {
            name: "Role-Relevant Experience".to_string(),
            description: format!(
                "How directly the candidate's past work prepares them for the {role} role at {company}."
            ),
        },
        SkillDefinition {
            name: COMPANY_KNOWLEDGE_SKILL.to_string(),
            description: format!(
                "Understanding of {company}'s products, users, market and competitors, \
                 and of how the {role} role contributes to {company}'s goals."
            ),
        },
        SkillDefinition {
            name: "Product Thinking".to_string(),
            description: format!(
                "Quality of product judgment applied to the problems a {role} at {company} would own."
            ),
        },
        SkillDefinition {
            name: "Analytical Problem Solving".to_string(),
            description: "Structures problems, uses data and reaches sound conclusions.".to_string(),
        },
        SkillDefinition {
            name: "Communication & Collaboration".to_string(),
            description: "Clear, concise answers and evidence of working well across functions."
                .to_string(),
        },
        SkillDefinition {
            name: "Motivation & Culture Fit".to_string(),
            description: format!(
                "Specific, credible motivation for joining {company} as {role}, and alignment \
                 with how {company} works."
            ),
        },
    ]
}

/// Verdict scale with the company and role interpolated.
pub fn job_specific_verdict_scale(company: &str, role: &str) -> String {
    format!(
        "- Strong Hire: Would champion hiring this candidate as {role} at {company}.\n\
         - Hire: Meets the bar for the {role} role at {company}.\n\
         - No Hire: Does not yet meet the bar for the {role} role at {company}.\n\
         - Strong No Hire: Clearly not ready for the {role} role at {company}."
    )
}
