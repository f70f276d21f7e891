// src/netdata.rs

//! Formatting for the netdata external-plugin line protocol.
//!
//! A plugin declares its schema once (`CHART` and `DIMENSION` lines), then
//! repeats reporting cycles of `BEGIN`/`SET`/`END`. netdata reads the
//! protocol from the plugin's stdout, so callers must keep stdout clear of
//! anything else and flush after each full cycle.

use std::fmt;
use std::io::{self, Write};

/// How netdata should interpret a dimension's values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Algorithm {
    /// The value is used as-is.
    Absolute,

    /// The value is rendered as a percentage of the sum of its row.
    PercentageOfAbsoluteRow,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Algorithm::Absolute => write!(f, "absolute"),
            Algorithm::PercentageOfAbsoluteRow => write!(f, "percentage-of-absolute-row"),
        }
    }
}

/// How netdata should draw a chart.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChartType {
    /// Each dimension is a line.
    Line,

    /// Each dimension is a filled area.
    Area,

    /// Dimensions are stacked on top of each other.
    Stacked,
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChartType::Line => write!(f, "line"),
            ChartType::Area => write!(f, "area"),
            ChartType::Stacked => write!(f, "stacked"),
        }
    }
}

/// Declare a chart.
///
/// # Errors
///
/// Propagates any `io::Error` from the underlying writer.
pub fn chart(
    out: &mut dyn Write,
    id: &str,
    title: &str,
    units: &str,
    family: &str,
    context: &str,
    chart_type: ChartType,
) -> io::Result<()> {
    writeln!(
        out,
        "CHART {} '' '{}' '{}' '{}' '{}' {}",
        id, title, units, family, context, chart_type
    )
}

/// Declare a dimension of the most recently declared chart.
///
/// # Errors
///
/// Propagates any `io::Error` from the underlying writer.
pub fn dimension(
    out: &mut dyn Write,
    id: &str,
    label: &str,
    algorithm: Algorithm,
    multiplier: i64,
    divisor: i64,
) -> io::Result<()> {
    writeln!(
        out,
        "DIMENSION {} '{}' {} {} {}",
        id, label, algorithm, multiplier, divisor
    )
}

/// Open a reporting cycle for a chart at the given unix timestamp.
///
/// # Errors
///
/// Propagates any `io::Error` from the underlying writer.
pub fn begin(out: &mut dyn Write, id: &str, timestamp: u64) -> io::Result<()> {
    writeln!(out, "BEGIN {} {}", id, timestamp)
}

/// Report one dimension's value within an open cycle.
///
/// # Errors
///
/// Propagates any `io::Error` from the underlying writer.
pub fn set(out: &mut dyn Write, id: &str, value: i64) -> io::Result<()> {
    writeln!(out, "SET {} {}", id, value)
}

/// Close the current reporting cycle.
///
/// # Errors
///
/// Propagates any `io::Error` from the underlying writer.
pub fn end(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "END")
}
