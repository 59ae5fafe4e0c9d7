pub mod arguments;
pub mod domain;
pub mod infra;
pub mod run;
