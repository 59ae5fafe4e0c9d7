pub mod draft;
pub mod engine;
pub mod validation;

pub use {
    draft::DraftState,
    engine::{Command, Engine, Handle, Settings},
    validation::{Rejection, Rules},
};
