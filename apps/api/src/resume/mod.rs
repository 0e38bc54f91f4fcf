// Resume ATS scan: reads an uploaded PDF or DOCX, then asks the gateway how
// well it matches a job description.

pub mod document;
pub mod handlers;
pub mod prompts;
