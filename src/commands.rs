//! The module for the hostlink CLI commands.

mod inspect;
mod run;

pub use self::{inspect::*, run::*};
