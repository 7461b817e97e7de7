pub mod abtest;
pub mod action;
pub mod ai;
pub mod builder;
pub mod condition;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod inbox;
pub mod integration;
pub mod io;
pub mod privacy;
pub mod rule;
pub mod template;
pub mod types;
pub mod validation;
pub mod workflow;

pub use error::{CadenceError, Result};
