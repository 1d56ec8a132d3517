use anyhow::{Context, Result};
use cli_harness::CommandResult;
use regex::Regex;
use serde::Serialize;

/// Checks applied to a finished command.
#[derive(Debug, Default)]
pub struct Expectations {
    status: Option<i32>,
    patterns: Vec<Regex>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectationOutcome {
    pub check: String,
    pub passed: bool,
}

impl Expectations {
    pub fn new(status: Option<i32>, patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("Invalid --expect pattern '{}'", p)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { status, patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.patterns.is_empty()
    }

    pub fn evaluate(&self, result: &CommandResult) -> Vec<ExpectationOutcome> {
        let mut outcomes = Vec::new();
        if let Some(expected) = self.status {
            outcomes.push(ExpectationOutcome {
                check: format!("exit status == {}", expected),
                passed: result.exit_code() == Some(expected),
            });
        }
        for pattern in &self.patterns {
            outcomes.push(ExpectationOutcome {
                check: format!("output =~ /{}/", pattern.as_str()),
                passed: pattern.is_match(&result.output),
            });
        }
        outcomes
    }
}
