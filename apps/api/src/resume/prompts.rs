// Prompt for the resume ATS scan.
// Placeholders: {job_description}, {resume}

pub const ATS_PROMPT_TEMPLATE: &str = r#"Act as an Applicant Tracking System used by a top tech recruiter. Compare the resume below against the job description.

JOB DESCRIPTION:
{job_description}

RESUME:
{resume}

TASK:
Return a STRICT JSON object with this structure:
{
  "match_score": <integer 0-100>,
  "hard_skills_missing": ["<Tool, language or certification the job asks for that the resume lacks>"],
  "soft_skills_missing": ["<Soft skill the job asks for that the resume lacks>"],
  "keywords_found": ["<Job keyword the resume already covers>"],
  "correction": "<The single most valuable change to make to this resume>"
}"#;
