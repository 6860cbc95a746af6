//! Core operations.
//!
//! This module contains the business logic for flare-templates commands,
//! separated from CLI argument parsing and output rendering.

pub mod check;
pub mod clean;
pub mod generate;
pub mod plan;

pub use check::check;
pub use clean::clean;
use eyre::{Result, bail};
use flare_templates_codegen::{GenerationTask, TaskGraph};
pub use generate::generate;
pub use plan::plan;

/// Tasks to run: the one for `source_set`, or every task when `None`.
pub fn select_tasks<'g>(
    graph: &'g TaskGraph,
    source_set: Option<&str>,
) -> Result<Vec<&'g GenerationTask>> {
    match source_set {
        None => Ok(graph.tasks().iter().collect()),
        Some(name) => match graph.for_source_set(name) {
            Some(task) => Ok(vec![task]),
            None => bail!("no template sets are configured for source set '{}'", name),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use flare_templates_codegen::{RunOptions, TemplatesPlugin};
    use flare_templates_manifest::ManifestFile;
    use tempfile::TempDir;

    use super::*;
    use crate::reports::PlanReport;

    const CONFIG: &str = r#"
[source_sets.main.template_sets.primitive]
data_files = ["src/templateData/primitive.yaml"]
variants = ["int", "long"]

[source_sets.test.template_sets.primitive]
data_files = ["src/templateData/primitive.yaml"]
variants = ["int", "long"]
"#;

    const DATA: &str = "- id: int\n  type: int\n- id: long\n  type: long\n";

    fn project(template: &str) -> (TempDir, ManifestFile) {
        let temp = TempDir::new().unwrap();
        let write = |relative: &str, content: &str| {
            let path = temp.path().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        };
        write("flare-templates.toml", CONFIG);
        write("src/templateData/primitive.yaml", DATA);
        write("src/main/template/primitive/VariantBox.java.tmpl", template);
        write("src/test/template/primitive/VariantBoxTest.java.tmpl", template);

        let file = ManifestFile::open(temp.path().join("flare-templates.toml")).unwrap();
        (temp, file)
    }

    #[test]
    fn test_select_tasks() {
        let (_temp, file) = project("class ${type_name} {}\n");
        let graph = TemplatesPlugin::apply(&file).unwrap();

        assert_eq!(select_tasks(&graph, None).unwrap().len(), 2);

        let tasks = select_tasks(&graph, Some("test")).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name(), "generateTestTemplates");

        let err = select_tasks(&graph, Some("jmh")).unwrap_err();
        assert!(err.to_string().contains("'jmh'"));
    }

    #[test]
    fn test_check_counts_pairs_without_writing() {
        let (temp, file) = project("class ${type_name} { ${type} value; }\n");
        let graph = TemplatesPlugin::apply(&file).unwrap();

        let report = check(&file, &graph).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.task_count, 2);
        assert_eq!(report.template_set_count, 2);
        assert_eq!(report.pair_count, 4);
        assert!(!temp.path().join("build").exists());
    }

    #[test]
    fn test_check_collects_template_failures() {
        let (_temp, file) = project("class ${type_name} { ${missing} value; }\n");
        let graph = TemplatesPlugin::apply(&file).unwrap();

        let report = check(&file, &graph).unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.failures.len(), 4);
    }

    #[test]
    fn test_generate_then_clean() {
        let (temp, file) = project("class ${type_name} {}\n");
        let graph = TemplatesPlugin::apply(&file).unwrap();
        let tasks = select_tasks(&graph, Some("main")).unwrap();

        let report = generate(&file, &graph, &tasks, RunOptions::default()).unwrap();
        assert_eq!(report.tasks.len(), 1);
        let output = temp
            .path()
            .join("build/generated/sources/main-templates/primitive/IntBox.java");
        assert_eq!(fs::read_to_string(&output).unwrap(), "class IntBox {}\n");

        let preview = clean(&file, &graph, &tasks, true).unwrap();
        assert_eq!(preview.removed.len(), 2);
        assert!(output.exists());

        let cleaned = clean(&file, &graph, &tasks, false).unwrap();
        assert_eq!(cleaned.removed.len(), 2);
        assert!(!output.exists());
    }

    #[test]
    fn test_generate_prunes_removed_source_set() {
        let (temp, file) = project("class ${type_name} {}\n");
        let graph = TemplatesPlugin::apply(&file).unwrap();
        let tasks = select_tasks(&graph, None).unwrap();
        generate(&file, &graph, &tasks, RunOptions::default()).unwrap();

        let test_output = temp
            .path()
            .join("build/generated/sources/test-templates/primitive/IntBoxTest.java");
        assert!(test_output.exists());

        let main_only = CONFIG
            .split("[source_sets.test")
            .next()
            .unwrap()
            .to_string();
        fs::write(temp.path().join("flare-templates.toml"), main_only).unwrap();
        let file = ManifestFile::open(temp.path().join("flare-templates.toml")).unwrap();
        let graph = TemplatesPlugin::apply(&file).unwrap();
        let tasks = select_tasks(&graph, None).unwrap();

        let report = generate(&file, &graph, &tasks, RunOptions::default()).unwrap();
        assert_eq!(report.orphans.len(), 2);
        assert!(!test_output.exists());
        assert!(!temp.path().join("build/generated/sources/test-templates").exists());
        assert!(!temp.path().join("build/tmp/generateTestTemplates").exists());
        assert!(
            temp.path()
                .join("build/generated/sources/main-templates/primitive/IntBox.java")
                .exists()
        );
    }

    #[test]
    fn test_plan_cargo_directives_are_deduplicated() {
        let (_temp, file) = project("class ${type_name} {}\n");
        let graph = TemplatesPlugin::apply(&file).unwrap();

        let PlanReport::Cargo(directives) = plan(&file, &graph, plan::PlanFormat::Cargo).unwrap()
        else {
            panic!("expected cargo directives");
        };
        let data_file = directives
            .iter()
            .filter(|d| d.ends_with("primitive.yaml"))
            .count();
        assert_eq!(data_file, 1);
        assert_eq!(directives.len(), 3);
    }
}
