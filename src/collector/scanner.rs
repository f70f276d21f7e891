// src/collector/scanner.rs

//! Statistics for a mail-scanner verdict log.

use std::io::{self, Write};

use crate::netdata::{self, Algorithm, ChartType};

use super::Collector;

const TYPE_CHART: &str = "scannerd.scanner_type";
const SC_CHART: &str = "scannerd.scanner_sc";
const CC_CHART: &str = "scannerd.scanner_cc";

/// Verdict and cache tallies for a scanner log.
///
/// Every line lands in exactly one of the verdict counters: the needles are
/// tried in order and the first match wins, with `other` as the catch-all.
#[derive(Debug, Default)]
pub struct ScannerCollector {
    clear: i64,
    clamdscan: i64,
    spam_tagged: i64,
    spam_rejected: i64,
    spam_deleted: i64,
    other: i64,

    sc_0: i64,
    sc_1: i64,

    cc_0: i64,
    cc_1: i64,
}

impl ScannerCollector {
    /// Construct a collector with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Collector for ScannerCollector {
    fn print_header(&self, out: &mut dyn Write) -> io::Result<()> {
        netdata::chart(out, TYPE_CHART, "", "volume", "scannerd", "type", ChartType::Stacked)?;
        netdata::dimension(out, "clear", "Clear", Algorithm::Absolute, 1, 1)?;
        netdata::dimension(out, "clamdscan", "Clamdscan", Algorithm::Absolute, 1, 1)?;
        netdata::dimension(out, "spam_tagged", "SPAM Tagged", Algorithm::Absolute, 1, 1)?;
        netdata::dimension(out, "spam_rejected", "SPAM Rejected", Algorithm::Absolute, 1, 1)?;
        netdata::dimension(out, "spam_deleted", "SPAM Deleted", Algorithm::Absolute, 1, 1)?;
        netdata::dimension(out, "other", "Other", Algorithm::Absolute, 1, 1)?;

        netdata::chart(
            out,
            SC_CHART,
            "AntiSPAM Cache",
            "percentage",
            "scannerd",
            "sc",
            ChartType::Stacked,
        )?;
        netdata::dimension(out, "sc_0", "SC:0", Algorithm::PercentageOfAbsoluteRow, 1, 1)?;
        netdata::dimension(out, "sc_1", "SC:1", Algorithm::PercentageOfAbsoluteRow, 1, 1)?;

        netdata::chart(
            out,
            CC_CHART,
            "AntiVirus Cache",
            "percentage",
            "scannerd",
            "cc",
            ChartType::Stacked,
        )?;
        // TODO: rename "The Rest" to CC:0 once the scanner logs :CC:0.
        netdata::dimension(out, "cc_0", "The Rest", Algorithm::PercentageOfAbsoluteRow, 1, 1)?;
        netdata::dimension(out, "cc_1", "CC:1", Algorithm::PercentageOfAbsoluteRow, 1, 1)
    }

    fn process(&mut self, line: &str) {
        if line.contains("Clear") {
            self.clear += 1;
        } else if line.contains("CLAMDSCAN") {
            self.clamdscan += 1;
        } else if line.contains(":SPAM-TAGGED") {
            self.spam_tagged += 1;
        } else if line.contains(":SPAM-REJECTED") {
            self.spam_rejected += 1;
        } else if line.contains(":SPAM-DELETED") {
            self.spam_deleted += 1;
        } else {
            self.other += 1;
        }

        if line.contains(":SC:0") {
            self.sc_0 += 1;
        } else if line.contains(":SC:1") {
            self.sc_1 += 1;
        }

        if line.contains(":CC:1") {
            self.cc_1 += 1;
        } else {
            // The scanner never logs :CC:0, so everything that is not a
            // :CC:1 hit counts as a miss.
            self.cc_0 += 1;
        }
    }

    fn print(&self, out: &mut dyn Write, timestamp: u64) -> io::Result<()> {
        netdata::begin(out, TYPE_CHART, timestamp)?;
        netdata::set(out, "clear", self.clear)?;
        netdata::set(out, "clamdscan", self.clamdscan)?;
        netdata::set(out, "spam_tagged", self.spam_tagged)?;
        netdata::set(out, "spam_rejected", self.spam_rejected)?;
        netdata::set(out, "spam_deleted", self.spam_deleted)?;
        netdata::set(out, "other", self.other)?;
        netdata::end(out)?;

        netdata::begin(out, SC_CHART, timestamp)?;
        netdata::set(out, "sc_0", self.sc_0)?;
        netdata::set(out, "sc_1", self.sc_1)?;
        netdata::end(out)?;

        netdata::begin(out, CC_CHART, timestamp)?;
        netdata::set(out, "cc_0", self.cc_0)?;
        netdata::set(out, "cc_1", self.cc_1)?;
        netdata::end(out)
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}
