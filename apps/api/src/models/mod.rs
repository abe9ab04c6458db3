pub mod course;
pub mod document;
pub mod goal;
pub mod guidance;
pub mod skill;
pub mod snapshot;
