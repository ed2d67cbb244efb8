//! Generic multi-step wizard engine: schema, form store, validator and controller.

pub mod controller;
pub mod schema;
pub mod store;
pub mod validator;

pub use controller::{CompletionOutcome, NextOutcome, Progress, SubmitTicket, WizardController, WizardHooks};
pub use schema::EntitySchema;
