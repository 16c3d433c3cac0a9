//! Benten: language intelligence for Common Workflow Language documents.
//!
//! This crate is the command line front end; the analysis itself lives in
//! [`cwl_analysis`] and the positioned YAML loader in [`cwl_ast`].

pub mod commands;
pub mod report;
