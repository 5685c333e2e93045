//! ProcureX client: submits tender PDFs to the analysis backend and follows
//! each job through its pipeline stages until a bid report comes back.

pub mod backend;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod report;
pub mod state_machine;
pub mod submitter;
pub mod ui;
