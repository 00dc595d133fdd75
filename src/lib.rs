pub mod backup;
pub mod config;
pub mod doctor;
pub mod error;
pub mod events;
pub mod install;
pub mod manifest;
pub mod pipeline;
pub mod project;
pub mod rest;
pub mod rewrite;
pub mod templates;
pub mod writer;
