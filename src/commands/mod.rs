pub mod completions;
pub mod config;
pub mod doctor;
pub mod memory;
pub mod persona;
pub mod run;
