pub mod deadline;
pub mod usercases;
