//! Query functions, one module per table.

pub mod skill_maps;
pub mod skill_programs;
