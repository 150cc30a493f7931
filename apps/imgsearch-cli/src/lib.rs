//! Support code for the `imgsearch` binary: seed-file loading and argument parsers.

pub mod parse;
pub mod seed;
