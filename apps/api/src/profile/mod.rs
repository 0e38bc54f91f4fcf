// GitHub profile audit: fetches public profile data, derives language stats
// and role hints locally, and asks the gateway for an engineering audit.
// AI failure degrades to a canned audit instead of failing the request.

pub mod github;
pub mod handlers;
pub mod prompts;
pub mod stats;
