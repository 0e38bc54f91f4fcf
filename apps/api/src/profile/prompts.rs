// Prompt for the GitHub profile audit.
// Placeholders: {name}, {bio}, {languages}, {repos}

pub const AUDIT_PROMPT_TEMPLATE: &str = r#"Act as a Senior Staff Engineer at a top tech company. Conduct a deep audit of this candidate's GitHub profile.

PROFILE CONTEXT:
- Name: {name}
- Bio: {bio}
- Top Languages: {languages}
- Repositories: {repos}

TASK:
Return a STRICT JSON object with this structure:
{
  "candidate_tier": "S" | "A" | "B" | "C",
  "score": <integer 0-100>,
  "professional_summary": "<Professional executive summary of their coding style>",
  "tech_stack": {
    "frontend": ["<Specific frameworks>"],
    "backend": ["<Specific languages/DBs>"]
  },
  "soft_skills_detected": ["<Infer 3 skills>"],
  "strengths": ["<Specific coding strength 1>", "<Specific strength 2>"],
  "weaknesses": ["<Specific area to improve 1>", "<Specific area to improve 2>"],
  "best_project_analysis": {
    "name": "<Name of best repo>",
    "insight": "<Why this project stands out (complexity, structure, etc)>"
  },
  "recommended_roles": ["<Role 1>", "<Role 2>"],
  "roast": "<Short, witty roast>"
}"#;
