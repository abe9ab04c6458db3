// Job Matcher: compares a user's skills against a pasted job description.

pub mod handlers;
pub mod matcher;
pub mod prompts;
