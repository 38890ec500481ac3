// Copyright 2025 Cornell University
// released under MIT License

pub mod backend;
pub mod build_system;
pub mod config;
pub mod errors;
pub mod makefile;
pub mod report;
pub mod templates;
