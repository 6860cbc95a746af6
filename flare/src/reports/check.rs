//! Check command report data structures.

use std::path::PathBuf;

use flare_templates_codegen::PairFailure;

use super::output::{Output, Report};

/// Report data from configuration and template validation.
#[derive(Debug)]
pub struct CheckReport {
    /// Path to the config file.
    pub config_path: PathBuf,
    pub task_count: usize,
    pub template_set_count: usize,
    /// Number of (template, variant) pairs that rendered.
    pub pair_count: usize,
    /// Warning messages.
    pub warnings: Vec<String>,
    /// Pairs that failed to render.
    pub failures: Vec<PairFailure>,
}

impl CheckReport {
    /// Whether the check passed (no failures).
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Report for CheckReport {
    fn render(&self, out: &mut dyn Output) {
        for failure in &self.failures {
            out.error(&failure.to_string());
        }

        for warning in &self.warnings {
            out.warning(warning);
        }

        if !self.warnings.is_empty() || !self.failures.is_empty() {
            out.newline();
        }

        if self.is_valid() {
            out.preformatted(&format!("✓ {} is valid", self.config_path.display()));
            out.key_value_indented("tasks", &self.task_count.to_string());
            out.key_value_indented("template sets", &self.template_set_count.to_string());
            out.key_value_indented("outputs", &self.pair_count.to_string());
        } else {
            out.preformatted(&format!(
                "✗ {} template variant(s) failed to render",
                self.failures.len()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use flare_templates_codegen::FailureKind;

    use super::*;
    use crate::reports::RecordingOutput;

    #[test]
    fn test_failures_make_report_invalid() {
        let report = CheckReport {
            config_path: PathBuf::from("flare-templates.toml"),
            task_count: 1,
            template_set_count: 1,
            pair_count: 0,
            warnings: Vec::new(),
            failures: vec![PairFailure::new(
                "primitive",
                "VariantHolder.java.tmpl",
                "int",
                FailureKind::TemplateSyntax,
                "template syntax error on line 1: unexpected '${/if}'",
            )],
        };
        assert!(!report.is_valid());

        let mut out = RecordingOutput::default();
        report.render(&mut out);
        assert!(out.lines[0].starts_with("error: primitive/VariantHolder.java.tmpl [int]"));
        assert_eq!(
            out.lines.last().map(String::as_str),
            Some("✗ 1 template variant(s) failed to render")
        );
    }
}
