pub mod flow_control;
pub mod lock;
pub mod model;
pub mod operations;
