// src/collector/smtpd.rs

//! Statistics for a qmail `tcpserver` SMTP log.

use std::io::{self, Write};

use crate::netdata::{self, Algorithm, ChartType};

use super::Collector;

const CHART: &str = "qmail.smtpd";

const OK_NEEDLE: &str = "tcpserver: ok";
const DENY_NEEDLE: &str = "tcpserver: deny";
const STATUS_PREFIX: &str = "tcpserver: status: ";

/// Connection counters and a running status average for an SMTP log.
///
/// The needles are not mutually exclusive: a line is counted by every needle
/// it contains.
#[derive(Debug, Default)]
pub struct SmtpdCollector {
    tcp_ok: i64,
    tcp_deny: i64,
    tcp_status_sum: i64,
    tcp_status_count: i64,
}

impl SmtpdCollector {
    /// Construct a collector with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Collector for SmtpdCollector {
    fn print_header(&self, out: &mut dyn Write) -> io::Result<()> {
        netdata::chart(
            out,
            CHART,
            "Qmail SMTPD",
            "# smtpd connections",
            "qmail",
            "smtpd",
            ChartType::Line,
        )?;
        netdata::dimension(out, "tcp_ok", "TCP OK", Algorithm::Absolute, 1, 1)?;
        netdata::dimension(out, "tcp_deny", "TCP Deny", Algorithm::Absolute, 1, 1)?;
        netdata::dimension(
            out,
            "tcp_status_average",
            "status average",
            Algorithm::Absolute,
            1,
            100,
        )
    }

    fn process(&mut self, line: &str) {
        if line.contains(OK_NEEDLE) {
            self.tcp_ok += 1;
        }
        if line.contains(DENY_NEEDLE) {
            self.tcp_deny += 1;
        }
        if let Some(index) = line.find(STATUS_PREFIX) {
            // A sample is recorded whenever the prefix is present, even if no
            // digits follow (the value is then 0).
            let rest = &line[index + STATUS_PREFIX.len()..];
            let digits = rest
                .find(|c: char| !c.is_ascii_digit())
                .map_or(rest, |end| &rest[..end]);
            self.tcp_status_sum += digits.parse::<i64>().unwrap_or(0);
            self.tcp_status_count += 1;
        }
    }

    fn print(&self, out: &mut dyn Write, timestamp: u64) -> io::Result<()> {
        // `tcp_deny` is negated so denials hang below the axis in the chart.
        let average = if self.tcp_status_count == 0 {
            0
        } else {
            self.tcp_status_sum * 100 / self.tcp_status_count
        };

        netdata::begin(out, CHART, timestamp)?;
        netdata::set(out, "tcp_ok", self.tcp_ok)?;
        netdata::set(out, "tcp_deny", -self.tcp_deny)?;
        netdata::set(out, "tcp_status_average", average)?;
        netdata::end(out)
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}
