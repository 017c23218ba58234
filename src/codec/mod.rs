pub mod capabilities;
pub mod policy;
