pub mod discovery;
pub mod metadata;
