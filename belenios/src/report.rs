use indexmap::IndexMap;
use std::fmt;

/// Outcome of a single check.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    /// Reported for attention without failing the run.
    Flagged,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CheckRecord {
    pub name: String,
    pub outcome: Outcome,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Append-only log of every check performed in a verification run, keyed by section.
///
/// Sections keep their insertion order. Independent units (ballots, shuffles) each fill their
/// own report and are merged afterwards, so no report is ever shared between threads.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub sections: IndexMap<String, Vec<CheckRecord>>,
}

impl Report {
    pub fn new() -> Self {
        Report::default()
    }

    pub fn record(&mut self, section: &str, name: &str, outcome: Outcome, detail: Option<String>) {
        match outcome {
            Outcome::Failed => {
                tracing::warn!(section, check = name, detail = ?detail, "check failed")
            }
            Outcome::Flagged => {
                tracing::info!(section, check = name, detail = ?detail, "check flagged")
            }
            Outcome::Passed => tracing::debug!(section, check = name, "check passed"),
        }
        self.sections
            .entry(section.to_owned())
            .or_insert_with(Vec::new)
            .push(CheckRecord {
                name: name.to_owned(),
                outcome,
                detail,
            });
    }

    /// Record a pass/fail check, returning `passed`.
    pub fn check(&mut self, section: &str, name: &str, passed: bool) -> bool {
        let outcome = if passed { Outcome::Passed } else { Outcome::Failed };
        self.record(section, name, outcome, None);
        passed
    }

    pub fn check_detail(&mut self, section: &str, name: &str, passed: bool, detail: String) -> bool {
        let outcome = if passed { Outcome::Passed } else { Outcome::Failed };
        self.record(section, name, outcome, Some(detail));
        passed
    }

    pub fn flag(&mut self, section: &str, name: &str, detail: String) {
        self.record(section, name, Outcome::Flagged, Some(detail));
    }

    pub fn merge(&mut self, other: Report) {
        for (section, checks) in other.sections {
            self.sections
                .entry(section)
                .or_insert_with(Vec::new)
                .extend(checks);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CheckRecord)> {
        self.sections
            .iter()
            .flat_map(|(s, checks)| checks.iter().map(move |c| (s.as_str(), c)))
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.iter().filter(|(_, c)| c.outcome == outcome).count()
    }

    pub fn failures(&self) -> Vec<(&str, &CheckRecord)> {
        self.iter()
            .filter(|(_, c)| c.outcome == Outcome::Failed)
            .collect()
    }

    /// No check failed.
    pub fn is_success(&self) -> bool {
        self.count(Outcome::Failed) == 0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (section, checks) in &self.sections {
            writeln!(f, "{}", section)?;
            for check in checks {
                let mark = match check.outcome {
                    Outcome::Passed => "ok",
                    Outcome::Failed => "FAILED",
                    Outcome::Flagged => "flagged",
                };
                match &check.detail {
                    Some(detail) => writeln!(f, "  [{}] {} ({})", mark, check.name, detail)?,
                    None => writeln!(f, "  [{}] {}", mark, check.name)?,
                }
            }
        }
        write!(
            f,
            "{} passed, {} failed, {} flagged",
            self.count(Outcome::Passed),
            self.count(Outcome::Failed),
            self.count(Outcome::Flagged)
        )
    }
}
