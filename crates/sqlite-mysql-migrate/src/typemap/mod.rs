//! Type mapping between SQLite and MySQL.
//!
//! SQLite column types are advisory: any declared type string is accepted
//! and lengths/precisions are never enforced. Mapping therefore works on
//! substrings of the declared type (the same affinity rules SQLite uses)
//! and never fails. Two cases lose information and are flagged lossy so
//! callers can report them:
//!
//! - string lengths outside `1..=65535` are clamped, which may truncate
//!   data on insert
//! - types matching no rule fall back to `TEXT`

use regex::Regex;
use std::num::IntErrorKind;
use std::sync::LazyLock;

/// Largest VARCHAR length emitted.
pub const MAX_VARCHAR_LENGTH: i64 = 65_535;

/// `NAME(ARGS)` prefix of a declared type.
static TYPE_WITH_ARGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]+)\s*\(([^)]+)\)").expect("valid type regex"));

/// Result of mapping a type from source to target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    /// Target type string (e.g., "VARCHAR(255)", "INT").
    pub target_type: String,
    /// Whether this mapping loses data or precision.
    pub is_lossy: bool,
    /// Warning message for lossy mappings.
    pub warning: Option<String>,
}

impl TypeMapping {
    /// Create a lossless type mapping.
    pub fn lossless(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: false,
            warning: None,
        }
    }

    /// Create a lossy type mapping with a warning.
    pub fn lossy(target_type: impl Into<String>, warning: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: true,
            warning: Some(warning.into()),
        }
    }
}

/// Map a SQLite declared type to a MySQL column type.
pub fn sqlite_to_mysql(sqlite_type: &str) -> String {
    map_type(sqlite_type).target_type
}

/// Map a SQLite declared type to a MySQL column type, reporting lossy cases.
pub fn map_type(sqlite_type: &str) -> TypeMapping {
    let t = sqlite_type.trim().to_uppercase();

    let (base, args) = match TYPE_WITH_ARGS.captures(&t) {
        Some(caps) => (
            caps.get(1).map_or("", |m| m.as_str()).to_string(),
            caps.get(2).map(|m| m.as_str().to_string()),
        ),
        None => (t.clone(), None),
    };

    if base.contains("INT") {
        return TypeMapping::lossless("INT");
    }

    if ["CHAR", "CLOB", "TEXT", "VARCHAR"]
        .iter()
        .any(|x| base.contains(x))
    {
        return map_string_type(sqlite_type, args.as_deref());
    }

    if base.contains("BLOB") {
        return TypeMapping::lossless("LONGBLOB");
    }

    if ["REAL", "FLOA", "DOUB"].iter().any(|x| base.contains(x)) {
        return TypeMapping::lossless("DOUBLE");
    }

    if ["NUMERIC", "DECIMAL"].iter().any(|x| base.contains(x)) {
        return TypeMapping::lossless("DECIMAL(38,10)");
    }

    if base.contains("BOOL") {
        return TypeMapping::lossless("TINYINT(1)");
    }

    match base.as_str() {
        "DATE" => TypeMapping::lossless("DATE"),
        "DATETIME" | "TIMESTAMP" => TypeMapping::lossless("DATETIME"),
        "TIME" => TypeMapping::lossless("TIME"),
        _ => TypeMapping::lossy(
            "TEXT",
            format!("unknown type '{}' stored as TEXT", sqlite_type.trim()),
        ),
    }
}

/// Bounded VARCHAR when a usable length is declared, TEXT otherwise.
fn map_string_type(declared: &str, args: Option<&str>) -> TypeMapping {
    let Some(args) = args else {
        return TypeMapping::lossless("TEXT");
    };

    let first = args.split(',').next().unwrap_or("").trim();
    let n = match first.parse::<i64>() {
        Ok(n) => n,
        // Out-of-range lengths still clamp; only non-numbers fall back.
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => i64::MAX,
            IntErrorKind::NegOverflow => i64::MIN,
            _ => return TypeMapping::lossless("TEXT"),
        },
    };

    let clamped = n.clamp(1, MAX_VARCHAR_LENGTH);
    if clamped == n {
        TypeMapping::lossless(format!("VARCHAR({})", n))
    } else {
        TypeMapping::lossy(
            format!("VARCHAR({})", clamped),
            format!(
                "length of '{}' clamped to {}; longer values will be truncated",
                declared.trim(),
                clamped
            ),
        )
    }
}
