//! Message parsing: `.eml` decoding into a structured view, plus lenient
//! date parsing.

pub mod eml;
