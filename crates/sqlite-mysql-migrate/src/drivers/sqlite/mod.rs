//! SQLite database driver.
//!
//! - [`SqliteReader`]: Source database reader
//!
//! The source file is opened read-only; it is never modified by a run.

mod reader;

pub use reader::SqliteReader;
