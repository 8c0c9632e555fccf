//! Subcommand implementations.

pub mod fill_holes;
pub mod info;
pub mod reconstruct;
pub mod repair_soup;
pub mod rm_components;
pub mod simplify;
pub mod smooth;
