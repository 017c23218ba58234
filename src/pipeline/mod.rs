pub mod dispatcher;
pub mod task;
