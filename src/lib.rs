//! A small register machine: ten integer registers, a comparison flag and
//! label based jumps, driven by a line oriented assembly text.

pub mod alu;
pub mod processor;
pub mod program;
pub mod registers;
