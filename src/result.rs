// dkim-validator – validation of DKIM signatures
// Copyright © 2022–2023 David Bürgin <dbuergin@gluet.ch>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.

//! Validation results and their reports.

use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// The outcome of validating one DKIM signature.
///
/// Records the failures, warnings and passes collected for the signature. A
/// signature is valid when it has at least one pass and no failures.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ValidationResult {
    domain: String,
    selector: String,
    fails: Vec<String>,
    warnings: Vec<String>,
    passes: Vec<String>,
}

impl ValidationResult {
    pub fn new(domain: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            selector: selector.into(),
            ..Default::default()
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn fails(&self) -> &[String] {
        &self.fails
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn passes(&self) -> &[String] {
        &self.passes
    }

    pub fn add_fail(&mut self, message: impl Into<String>) {
        self.fails.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn add_pass(&mut self, message: impl Into<String>) {
        self.passes.push(message.into());
    }

    pub fn is_valid(&self) -> bool {
        !self.passes.is_empty() && self.fails.is_empty()
    }
}

/// The outcome of validating all DKIM signatures of a message.
///
/// The overall status is valid when at least one signature is valid.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ValidationResults {
    valid: bool,
    results: Vec<ValidationResult>,
}

impl ValidationResults {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_result(&mut self, result: ValidationResult) {
        self.valid |= result.is_valid();
        self.results.push(result);
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    /// Renders the results as a pretty-printed JSON report.
    ///
    /// ```
    /// # use dkim_validator::ValidationResults;
    /// let json = ValidationResults::new().to_json().unwrap();
    /// assert_eq!(json, "{\n  \"valid\": false,\n  \"signatures\": []\n}");
    /// ```
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Report::from(self))
    }
}

impl Display for ValidationResults {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "DKIM validation results")?;
        writeln!(f, "Overall status: {}", status(self.valid))?;

        for (i, result) in self.results.iter().enumerate() {
            writeln!(f, "Signature #{}", i + 1)?;
            writeln!(f, "Domain and selector: {}/{}", result.domain, result.selector)?;
            writeln!(f, "Validation result: {}", status(result.is_valid()))?;

            write_section(f, "Validation failures:", &result.fails)?;
            write_section(f, "Validation warnings:", &result.warnings)?;
            write_section(f, "Validation passes:", &result.passes)?;
        }

        Ok(())
    }
}

fn status(valid: bool) -> &'static str {
    if valid {
        "pass"
    } else {
        "fail"
    }
}

fn write_section(f: &mut Formatter<'_>, title: &str, messages: &[String]) -> fmt::Result {
    if !messages.is_empty() {
        writeln!(f, "{title}")?;
        for message in messages {
            writeln!(f, "{message}")?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct Report<'a> {
    valid: bool,
    signatures: Vec<SignatureReport<'a>>,
}

#[derive(Serialize)]
struct SignatureReport<'a> {
    valid: bool,
    domain: &'a str,
    selector: &'a str,
    failures: &'a [String],
    warnings: &'a [String],
    passes: &'a [String],
}

impl<'a> From<&'a ValidationResults> for Report<'a> {
    fn from(results: &'a ValidationResults) -> Self {
        let signatures = results
            .results
            .iter()
            .map(|r| SignatureReport {
                valid: r.is_valid(),
                domain: &r.domain,
                selector: &r.selector,
                failures: &r.fails,
                warnings: &r.warnings,
                passes: &r.passes,
            })
            .collect();

        Self {
            valid: results.valid,
            signatures,
        }
    }
}
