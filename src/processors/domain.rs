//! Survey domains and their fixed merge order.

use std::fmt;
use std::str::FromStr;

/// One category of survey data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    Directory,
    Admissions,
    Enrollment,
    Finance,
}

impl Domain {
    /// All domains in processing order. The directory comes first because it
    /// defines the institution universe.
    pub const ALL: [Domain; 4] = [
        Domain::Directory,
        Domain::Admissions,
        Domain::Enrollment,
        Domain::Finance,
    ];

    /// Order in which annotating domains are joined onto the directory.
    pub const MERGE_ORDER: [Domain; 3] = [Domain::Admissions, Domain::Enrollment, Domain::Finance];

    pub fn name(&self) -> &'static str {
        match self {
            Domain::Directory => "institutional_directory",
            Domain::Admissions => "admissions",
            Domain::Enrollment => "enrollment",
            Domain::Finance => "finance",
        }
    }

    /// File name of the processed table for this domain.
    pub fn output_file(&self) -> String {
        format!("{}_processed.csv", self.name())
    }

    /// File name of the per-domain validation report.
    pub fn validation_report_file(&self) -> String {
        format!("{}_processed_validation.txt", self.name())
    }

    /// Expected processed row range, used by the audit.
    pub fn expected_rows(&self) -> (usize, usize) {
        match self {
            Domain::Directory => (6000, 7000),
            Domain::Admissions => (1500, 3000),
            Domain::Enrollment => (6000, 7000),
            Domain::Finance => (5000, 8000),
        }
    }

    /// Title-cased display name for reports.
    pub fn title(&self) -> &'static str {
        match self {
            Domain::Directory => "Institutional Directory",
            Domain::Admissions => "Admissions",
            Domain::Enrollment => "Enrollment",
            Domain::Finance => "Finance",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Domain::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let valid: Vec<&str> = Domain::ALL.iter().map(|d| d.name()).collect();
                format!("invalid processor '{}' (valid: {})", s, valid.join(", "))
            })
    }
}

/// Parses a comma-separated list of domain names, preserving order and
/// dropping repeats.
pub fn parse_domain_list(list: &str) -> Result<Vec<Domain>, String> {
    let mut domains = Vec::new();
    for part in list.split(',').filter(|p| !p.trim().is_empty()) {
        let domain: Domain = part.parse()?;
        if !domains.contains(&domain) {
            domains.push(domain);
        }
    }
    if domains.is_empty() {
        return Err("no processors given".to_string());
    }
    Ok(domains)
}
