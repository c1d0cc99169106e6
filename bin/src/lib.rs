//! Command line front-end for the tome document engine.
//!
//! - `tome layout <file>` prints the composed visual lines of a file
//! - `tome replay <file> <script>` runs an edit script against a file

pub mod cli;
pub mod commands;
