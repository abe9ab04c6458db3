// Readiness Scorer: career guidance generated from a user's goal and skills.

pub mod handlers;
pub mod prompts;
pub mod readiness;
