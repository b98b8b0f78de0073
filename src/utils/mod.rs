pub mod compression;
pub mod correlation;
