//! Library side of the `pkdb` command line: logging setup, input/output
//! files and summary tables.

pub mod files;
pub mod logging;
pub mod summary;
