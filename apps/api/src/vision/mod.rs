// Profile screenshot critique: accepts an uploaded image and asks the
// gateway for a structured branding review.

pub mod handlers;
pub mod prompts;
