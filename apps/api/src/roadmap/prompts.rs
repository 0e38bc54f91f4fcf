// Roadmap generator prompt. Replace `{skill}` and `{level}` before sending.

pub const ROADMAP_PROMPT_TEMPLATE: &str = r#"You are an expert coding mentor. Analyze if "{skill}" is a REAL, LEARNABLE skill/topic. If it IS valid, create a practical learning roadmap for a learner at the {level} level. If NOT, return [] (empty array).

STRICT REJECTION RULES - Return [] IMMEDIATELY if:
1. Gibberish/keyboard mashing: 'asdfgh', 'qwerty', 'gfnhgnrh', 'aaaa', random letter combinations
2. Not a skill: 'stuff', 'thing', 'whatever', 'hello', 'test', 'xyz'
3. Offensive/inappropriate content
4. Single character or non-sensical input

VALID SKILLS include:
- Programming languages (Python, JavaScript, Rust, Go)
- Frameworks/libraries (React, Django, Spring, Vue)
- Technologies (Docker, Kubernetes, AWS, Terraform)
- Concepts (System Design, Microservices, OOP, Design Patterns)
- Tools (Git, Jenkins, Prometheus, Elasticsearch)
- Soft skills (Leadership, Communication, Project Management)
- Data/AI (Machine Learning, Data Science, NLP)
- Infrastructure (Linux, Networking, Database Design)

For VALID topics, decide duration:
- Simple/focused: 3 weeks
- Moderate: 4-5 weeks
- Broad/advanced: 6 weeks

Return ONLY a JSON array with 0 items (invalid) or 3-6 items (valid).

Array structure:
[
  {
    "week": 1,
    "theme": "Foundation & Setup",
    "tasks": ["Task 1", "Task 2", "Task 3"],
    "project": "Deliverable",
    "resources": ["Resource 1", "Resource 2"]
  }
]"#;
