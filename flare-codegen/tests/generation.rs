//! End-to-end tests for template generation tasks.

use std::{fs, path::PathBuf};

use flare_templates_codegen::{
    AGGREGATE_TASK, FailureKind, FileStatus, GenerateError, IncrementalState, RunOptions,
    TaskGraph, TaskOutcome, TaskReport, TemplatesPlugin,
};
use flare_templates_manifest::ManifestFile;
use tempfile::TempDir;

const HOLDER_TEMPLATE: &str = "\
package org.example;

public final class ${type_name} {
    private ${type} value;

    public ${boxed} boxed() {
        return ${boxed}.valueOf(value);
    }
}
";

const PRIMITIVE_DATA: &str = "\
- id: int
  type: int
  boxed: Integer
- id: long
  type: long
  boxed: Long
- id: float
  type: float
  boxed: Float
";

const CONFIG: &str = r#"
[source_sets.main.template_sets.primitive]
data_files = ["src/templateData/primitive.yaml"]
variants = ["int", "long"]
"#;

struct Project {
    temp: TempDir,
}

impl Project {
    fn new(config: &str) -> Self {
        let project = Self::empty(config);
        project.write("src/templateData/primitive.yaml", PRIMITIVE_DATA);
        project.write(
            "src/main/template/primitive/VariantHolder.java.tmpl",
            HOLDER_TEMPLATE,
        );
        project
    }

    fn empty(config: &str) -> Self {
        let project = Self {
            temp: TempDir::new().unwrap(),
        };
        project.write("flare-templates.toml", config);
        project
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.temp.path().join(relative)
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    fn graph(&self) -> TaskGraph {
        let file = ManifestFile::open(self.path("flare-templates.toml")).unwrap();
        TemplatesPlugin::apply(&file).unwrap()
    }

    fn generate(&self, options: RunOptions) -> Result<TaskReport, GenerateError> {
        let graph = self.graph();
        graph.task("generateTemplates").unwrap().run(options)
    }

    fn state(&self) -> IncrementalState {
        IncrementalState::load(&self.path("build/tmp/generateTemplates/state.json"))
    }
}

const OUT: &str = "build/generated/sources/main-templates/primitive";

fn out(file: &str) -> String {
    format!("{}/{}", OUT, file)
}

#[test]
fn test_generates_one_file_per_variant() {
    let project = Project::new(CONFIG);
    let report = project.generate(RunOptions::default()).unwrap();

    assert_eq!(report.outcome, TaskOutcome::Executed);
    assert_eq!(report.count(FileStatus::Rendered), 2);

    let variants: Vec<&str> = report.files.iter().map(|f| f.variant.as_str()).collect();
    assert_eq!(variants, vec!["int", "long"]);
    assert!(!project.path(&out("FloatHolder.java")).exists());
    assert_eq!(fs::read_dir(project.path(OUT)).unwrap().count(), 2);

    insta::assert_snapshot!(project.read(&out("IntHolder.java")), @r"
    package org.example;

    public final class IntHolder {
        private int value;

        public Integer boxed() {
            return Integer.valueOf(value);
        }
    }
    ");
    let long = project.read(&out("LongHolder.java"));
    assert!(long.contains("public final class LongHolder {"));
    assert!(long.contains("private long value;"));
    assert!(long.contains("return Long.valueOf(value);"));
}

#[test]
fn test_generation_is_deterministic() {
    let project = Project::new(CONFIG);
    project.generate(RunOptions::default()).unwrap();
    let first = fs::read(project.path(&out("IntHolder.java"))).unwrap();

    let report = project
        .generate(RunOptions {
            force: true,
            dry_run: false,
        })
        .unwrap();
    let second = fs::read(project.path(&out("IntHolder.java"))).unwrap();

    assert_eq!(first, second);
    assert_eq!(report.count(FileStatus::Unchanged), 2);
}

#[test]
fn test_second_run_is_up_to_date() {
    let project = Project::new(CONFIG);
    let first = project.generate(RunOptions::default()).unwrap();
    let second = project.generate(RunOptions::default()).unwrap();

    assert_eq!(second.outcome, TaskOutcome::UpToDate);
    assert_eq!(second.count(FileStatus::UpToDate), 2);
    let first_prints: Vec<_> = first.files.iter().map(|f| &f.fingerprint).collect();
    let second_prints: Vec<_> = second.files.iter().map(|f| &f.fingerprint).collect();
    assert_eq!(first_prints, second_prints);
}

#[test]
fn test_changing_one_row_rerenders_only_that_variant() {
    let project = Project::new(CONFIG);
    project.generate(RunOptions::default()).unwrap();
    let int_before = project
        .state()
        .get("primitive/VariantHolder.java.tmpl#int")
        .cloned()
        .unwrap();

    project.write(
        "src/templateData/primitive.yaml",
        &PRIMITIVE_DATA.replace("boxed: Long", "boxed: BoxedLong"),
    );
    let report = project.generate(RunOptions::default()).unwrap();

    assert_eq!(report.outcome, TaskOutcome::Executed);
    let status = |variant: &str| {
        report
            .files
            .iter()
            .find(|f| f.variant == variant)
            .map(|f| f.status)
            .unwrap()
    };
    assert_eq!(status("int"), FileStatus::UpToDate);
    assert_eq!(status("long"), FileStatus::Rendered);
    assert!(project.read(&out("LongHolder.java")).contains("BoxedLong"));

    let int_after = project
        .state()
        .get("primitive/VariantHolder.java.tmpl#int")
        .cloned()
        .unwrap();
    assert_eq!(int_before, int_after);
}

#[test]
fn test_template_change_rerenders_every_variant() {
    let project = Project::new(CONFIG);
    project.generate(RunOptions::default()).unwrap();

    project.write(
        "src/main/template/primitive/VariantHolder.java.tmpl",
        &HOLDER_TEMPLATE.replace("final class", "class"),
    );
    let report = project.generate(RunOptions::default()).unwrap();

    assert_eq!(report.count(FileStatus::Rendered), 2);
    assert!(project.read(&out("IntHolder.java")).contains("public class IntHolder"));
}

#[test]
fn test_edited_output_is_regenerated() {
    let project = Project::new(CONFIG);
    project.generate(RunOptions::default()).unwrap();
    project.write(&out("IntHolder.java"), "// edited by hand\n");

    let report = project.generate(RunOptions::default()).unwrap();

    assert_eq!(report.outcome, TaskOutcome::Executed);
    assert_eq!(report.count(FileStatus::Rendered), 1);
    assert!(project.read(&out("IntHolder.java")).contains("class IntHolder"));
}

#[test]
fn test_unresolved_placeholder_fails_without_writing() {
    let project = Project::new(CONFIG);
    project.write(
        "src/main/template/primitive/VariantBroken.java.tmpl",
        "class ${type_name} {\n    ${missing} value;\n}\n",
    );

    let err = project.generate(RunOptions::default()).unwrap_err();

    let failures = err.failures();
    assert_eq!(failures.len(), 2);
    for failure in failures {
        assert_eq!(failure.kind, FailureKind::UnresolvedPlaceholder);
        assert_eq!(failure.template, "VariantBroken.java.tmpl");
        assert!(failure.message.contains("'missing' on line 2"));
    }
    let variants: Vec<&str> = failures.iter().map(|f| f.variant.as_str()).collect();
    assert_eq!(variants, vec!["int", "long"]);

    assert!(!project.path(&out("IntHolder.java")).exists());
    assert!(!project.path(&out("LongHolder.java")).exists());
    assert!(project.state().is_empty());
}

#[test]
fn test_syntax_error_fails_every_variant_of_template() {
    let project = Project::new(CONFIG);
    project.write(
        "src/main/template/primitive/VariantBad.java.tmpl",
        "${#if type}\nnever closed\n",
    );

    let err = project.generate(RunOptions::default()).unwrap_err();

    assert_eq!(err.failures().len(), 2);
    assert!(
        err.failures()
            .iter()
            .all(|f| f.kind == FailureKind::TemplateSyntax)
    );
    assert!(err.to_string().contains("task 'generateTemplates' failed"));
}

#[test]
fn test_output_collision_is_reported() {
    let project = Project::new(CONFIG);
    project.write("src/main/template/primitive/Holder.java.tmpl", "// ${id}\n");

    let err = project.generate(RunOptions::default()).unwrap_err();

    let collisions: Vec<_> = err
        .failures()
        .iter()
        .filter(|f| f.kind == FailureKind::OutputCollision)
        .collect();
    assert_eq!(collisions.len(), 2);
    assert!(collisions[0].message.contains("IntHolder.java"));
    assert!(!project.path(&out("IntHolder.java")).exists());
}

#[test]
fn test_dropped_variant_output_is_removed() {
    let project = Project::new(CONFIG);
    project.generate(RunOptions::default()).unwrap();
    project.write(&out("org/Stray.java"), "// not ours\n");

    project.write(
        "flare-templates.toml",
        &CONFIG.replace(r#"["int", "long"]"#, r#"["int"]"#),
    );
    let report = project.generate(RunOptions::default()).unwrap();

    assert!(project.path(&out("IntHolder.java")).exists());
    assert!(!project.path(&out("LongHolder.java")).exists());
    assert!(!project.path(&out("org")).exists());
    assert_eq!(report.removed.len(), 2);
    assert_eq!(project.state().len(), 1);
}

#[test]
fn test_dry_run_touches_nothing() {
    let project = Project::new(CONFIG);
    let report = project
        .generate(RunOptions {
            force: false,
            dry_run: true,
        })
        .unwrap();

    assert_eq!(report.outcome, TaskOutcome::DryRun);
    assert_eq!(report.files.len(), 2);
    let content = report.files[0].content.as_deref().unwrap();
    assert!(content.contains("class IntHolder"));
    assert!(!project.path(OUT).exists());
    assert!(!project.path("build/tmp").exists());
}

#[test]
fn test_header_is_prepended() {
    let config = format!("[project]\nheader = \"license_header.txt\"\n{}", CONFIG);
    let project = Project::new(&config);
    project.write("license_header.txt", "// Licensed under MIT");

    project.generate(RunOptions::default()).unwrap();

    let int = project.read(&out("IntHolder.java"));
    assert!(int.starts_with("// Licensed under MIT\npackage org.example;\n"));

    project.write("license_header.txt", "// Licensed under Apache-2.0\n");
    let report = project.generate(RunOptions::default()).unwrap();
    assert_eq!(report.count(FileStatus::Rendered), 2);
}

#[test]
fn test_clean_removes_outputs_and_state() {
    let project = Project::new(CONFIG);
    project.generate(RunOptions::default()).unwrap();

    let graph = project.graph();
    let task = graph.task("generateTemplates").unwrap();
    let preview = task.clean(true).unwrap();
    assert_eq!(preview.len(), 2);
    assert!(project.path(&out("IntHolder.java")).exists());

    let removed = task.clean(false).unwrap();
    assert_eq!(removed.len(), 2);
    assert!(!project.path(&out("IntHolder.java")).exists());
    assert!(!project.path("build/tmp/generateTemplates/state.json").exists());
}

#[test]
fn test_unknown_variant_fails_configuration() {
    let project = Project::new(&CONFIG.replace(r#""long""#, r#""short""#));
    let file = ManifestFile::open(project.path("flare-templates.toml")).unwrap();

    let err = TemplatesPlugin::apply(&file).unwrap_err();

    assert!(err.to_string().contains("unknown variant 'short'"));
    assert!(!project.path("build").exists());
}

#[test]
fn test_holder_scenario_substitutes_every_placeholder() {
    let project = Project::empty(CONFIG);
    project.write(
        "src/templateData/primitive.yaml",
        "- id: int\n  boxed: Integer\n  default: \"0\"\n- id: long\n  boxed: Long\n  default: 0L\n",
    );
    project.write(
        "src/main/template/primitive/Holder.java.tmpl",
        "class ${boxed}Holder { ${id} value = ${default}; }\n",
    );

    project.generate(RunOptions::default()).unwrap();

    assert_eq!(
        project.read(&out("IntHolder.java")),
        "class IntegerHolder { int value = 0; }\n"
    );
    assert_eq!(
        project.read(&out("LongHolder.java")),
        "class LongHolder { long value = 0L; }\n"
    );
}

#[test]
fn test_forced_run_prunes_dropped_variant_outside_generated_root() {
    let config = format!("{}output_dir = \"src/generated/java\"\n", CONFIG);
    let project = Project::new(&config);
    project.generate(RunOptions::default()).unwrap();
    assert!(project.path("src/generated/java/LongHolder.java").exists());

    project.write(
        "flare-templates.toml",
        &config.replace(r#"["int", "long"]"#, r#"["int"]"#),
    );
    let report = project
        .generate(RunOptions {
            force: true,
            dry_run: false,
        })
        .unwrap();

    assert_eq!(report.removed, vec![project.path("src/generated/java/LongHolder.java")]);
    assert!(!project.path("src/generated/java/LongHolder.java").exists());
    assert!(project.path("src/generated/java/IntHolder.java").exists());
    assert_eq!(project.state().len(), 1);
}

#[test]
fn test_write_failure_keeps_unpruned_outputs_tracked() {
    let config = format!("{}output_dir = \"src/generated/java\"\n", CONFIG);
    let project = Project::new(&config);
    project.generate(RunOptions::default()).unwrap();

    // A directory where FloatHolder.java should go makes its write fail.
    project.write("src/generated/java/FloatHolder.java/blocker", "");
    project.write(
        "flare-templates.toml",
        &config.replace(r#"["int", "long"]"#, r#"["int", "float"]"#),
    );
    let err = project.generate(RunOptions::default()).unwrap_err();

    assert_eq!(err.failures().len(), 1);
    assert_eq!(err.failures()[0].kind, FailureKind::Io);
    assert_eq!(err.failures()[0].variant, "float");
    assert!(project.path("src/generated/java/LongHolder.java").exists());
    assert!(
        project
            .state()
            .get("primitive/VariantHolder.java.tmpl#long")
            .is_some()
    );

    fs::remove_dir_all(project.path("src/generated/java/FloatHolder.java")).unwrap();
    project.generate(RunOptions::default()).unwrap();

    assert!(!project.path("src/generated/java/LongHolder.java").exists());
    assert!(project.read("src/generated/java/FloatHolder.java").contains("float value"));
}

#[test]
fn test_up_to_date_run_removes_stray_files() {
    let project = Project::new(CONFIG);
    project.generate(RunOptions::default()).unwrap();
    project.write(&out("Stray.java"), "// dropped in by hand\n");

    let report = project.generate(RunOptions::default()).unwrap();

    assert_eq!(report.outcome, TaskOutcome::UpToDate);
    assert_eq!(report.removed, vec![project.path(&out("Stray.java"))]);
    assert!(!project.path(&out("Stray.java")).exists());
    assert!(project.path(&out("IntHolder.java")).exists());
}

#[test]
fn test_unreadable_template_is_reported_with_other_failures() {
    let project = Project::new(CONFIG);
    project.write(
        "src/main/template/primitive/VariantBad.java.tmpl",
        "${#if type}\nnever closed\n",
    );
    let graph = project.graph();
    fs::remove_file(project.path("src/main/template/primitive/VariantHolder.java.tmpl")).unwrap();

    let err = graph
        .task("generateTemplates")
        .unwrap()
        .run(RunOptions::default())
        .unwrap_err();

    let kinds: Vec<(&str, &str, FailureKind)> = err
        .failures()
        .iter()
        .map(|f| (f.template.as_str(), f.variant.as_str(), f.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("VariantBad.java.tmpl", "int", FailureKind::TemplateSyntax),
            ("VariantBad.java.tmpl", "long", FailureKind::TemplateSyntax),
            ("VariantHolder.java.tmpl", "int", FailureKind::Io),
            ("VariantHolder.java.tmpl", "long", FailureKind::Io),
        ]
    );
    assert!(!project.path(OUT).exists());
}

#[test]
fn test_removed_source_set_outputs_are_pruned() {
    let config = format!(
        "{}\n[source_sets.test.template_sets.primitive]\ndata_files = [\"src/templateData/primitive.yaml\"]\nvariants = [\"int\"]\n",
        CONFIG
    );
    let project = Project::new(&config);
    project.write("src/test/template/primitive/VariantTest.java.tmpl", "// ${id}\n");
    let graph = project.graph();
    for task in graph.tasks() {
        task.run(RunOptions::default()).unwrap();
    }
    let test_output = project.path("build/generated/sources/test-templates/primitive/IntTest.java");
    assert!(test_output.exists());

    project.write("flare-templates.toml", CONFIG);
    let graph = project.graph();
    assert_eq!(graph.prune_orphans(true).unwrap(), vec![test_output.clone()]);
    assert!(test_output.exists());

    let removed = graph.prune_orphans(false).unwrap();

    assert_eq!(removed, vec![test_output.clone()]);
    assert!(!project.path("build/generated/sources/test-templates").exists());
    assert!(!project.path("build/tmp/generateTestTemplates").exists());
    assert!(project.path(&out("IntHolder.java")).exists());
    assert!(graph.prune_orphans(false).unwrap().is_empty());
}

#[test]
fn test_task_graph_registration() {
    let config = r#"
[project]
format_step = "licenseFormat"

[source_sets.main.template_sets.primitive]
data_files = ["src/templateData/primitive.yaml"]
variants = ["int", "long"]

[source_sets.test]
compile_step = "compileTestKotlin"

[source_sets.test.template_sets.primitive]
data_files = ["src/templateData/primitive.yaml"]
variants = ["long"]
"#;
    let project = Project::new(config);
    project.write("src/test/template/primitive/VariantTest.java.tmpl", "// ${id}\n");

    let graph = project.graph();
    let names: Vec<&str> = graph.tasks().iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["generateTemplates", "generateTestTemplates"]);

    let main = graph.for_source_set("main").unwrap().descriptor();
    assert_eq!(main.group, "generation");
    assert_eq!(main.must_run_before, vec!["compileJava"]);
    assert_eq!(main.finalized_by, vec!["licenseFormat"]);
    assert_eq!(main.outputs, vec![project.path(OUT)]);

    let test = graph.for_source_set("test").unwrap().descriptor();
    assert_eq!(test.must_run_before, vec!["compileTestKotlin"]);
    assert_eq!(
        test.state_file,
        project.path("build/tmp/generateTestTemplates/state.json")
    );

    assert_eq!(graph.aggregate().name, AGGREGATE_TASK);
    assert_eq!(
        graph.aggregate().depends_on,
        vec!["generateTemplates", "generateTestTemplates"]
    );

    let directives = graph.task("generateTemplates").unwrap().descriptor().cargo_directives();
    assert!(directives.iter().any(|d| d.ends_with("VariantHolder.java.tmpl")));
    assert!(directives.iter().any(|d| d.ends_with("primitive.yaml")));
}

#[test]
fn test_source_sets_are_independent() {
    let config = format!(
        "{}\n[source_sets.test.template_sets.primitive]\ndata_files = [\"src/templateData/primitive.yaml\"]\nvariants = [\"int\"]\n",
        CONFIG
    );
    let project = Project::new(&config);
    project.write("src/test/template/primitive/VariantTest.java.tmpl", "// ${id}\n");

    let graph = project.graph();
    graph
        .task("generateTestTemplates")
        .unwrap()
        .run(RunOptions::default())
        .unwrap();

    assert!(
        project
            .path("build/generated/sources/test-templates/primitive/IntTest.java")
            .exists()
    );
    assert!(!project.path(OUT).exists());
    assert!(
        project
            .path("build/tmp/generateTestTemplates/state.json")
            .exists()
    );
}
