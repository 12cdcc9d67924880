//! MySQL/MariaDB database driver.
//!
//! This module provides the destination side of a run:
//! - [`MysqlConnector`]: Opens destination sessions from configuration
//! - [`MysqlWriter`]: Target database writer
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod writer;

pub use writer::{MysqlConnector, MysqlWriter};
