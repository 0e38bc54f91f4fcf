// Skill roadmap generator: validates the requested skill, asks the gateway
// for a 3-6 week plan, and distinguishes "not a real skill" (empty plan)
// from AI failure.

pub mod handlers;
pub mod prompts;
pub mod validation;
