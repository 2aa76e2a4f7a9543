//! Data types shared by the pipeline stages.

pub mod config;
pub mod document;
pub mod entity;
pub mod result;
pub mod sentiment;
