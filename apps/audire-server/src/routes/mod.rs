//! Route modules for the Audire server

pub mod documents;
pub mod health;
pub mod prompts;
pub mod refine;
