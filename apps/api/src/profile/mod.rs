// Onboarding, goal settings and the shareable public profile.

pub mod handlers;
pub mod public;
