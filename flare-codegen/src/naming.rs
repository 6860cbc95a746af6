//! Output file naming.
//!
//! A template's output name is its file name minus the template suffix, with
//! the name token replaced by the PascalCase variant id:
//!
//! ```text
//! VariantHolder.java.tmpl + int  -> IntHolder.java
//! Holder.java.tmpl        + long -> LongHolder.java
//! ```
//!
//! When the token does not occur, the PascalCase id is prefixed instead so
//! two variants never share an output name.

use std::path::{Path, PathBuf};

use flare_templates_core::to_pascal_case;

/// Output path of `template` for `variant`, relative to the output directory.
///
/// `template` is relative to the template directory; its subdirectories are
/// preserved.
pub fn output_path(template: &Path, variant: &str, name_token: &str, suffix: &str) -> PathBuf {
    let file_name = template
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = output_file_name(&file_name, variant, name_token, suffix);

    match template.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => PathBuf::from(name),
    }
}

/// Output file name for a template file name and variant.
pub fn output_file_name(file_name: &str, variant: &str, name_token: &str, suffix: &str) -> String {
    let stem = strip_template_suffix(file_name, suffix);
    let pascal = to_pascal_case(variant);

    if !name_token.is_empty() && stem.contains(name_token) {
        stem.replace(name_token, &pascal)
    } else {
        format!("{}{}", pascal, stem)
    }
}

/// Class-like name of an output: its file name up to the first `.`.
pub fn type_name(output: &Path) -> String {
    output
        .file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| name.split('.').next().map(str::to_string))
        .unwrap_or_default()
}

fn strip_template_suffix<'a>(file_name: &'a str, suffix: &str) -> &'a str {
    if suffix.is_empty() {
        return file_name;
    }
    file_name
        .strip_suffix(suffix)
        .and_then(|rest| rest.strip_suffix('.'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_replaced_and_suffix_stripped() {
        assert_eq!(
            output_file_name("VariantHolder.java.tmpl", "int", "Variant", "tmpl"),
            "IntHolder.java"
        );
        assert_eq!(
            output_file_name("VariantHolder.java.tmpl", "long", "Variant", "tmpl"),
            "LongHolder.java"
        );
    }

    #[test]
    fn test_missing_token_prefixes_id() {
        assert_eq!(
            output_file_name("Holder.java.tmpl", "double", "Variant", "tmpl"),
            "DoubleHolder.java"
        );
    }

    #[test]
    fn test_non_template_suffix_is_kept() {
        assert_eq!(
            output_file_name("VariantList.java", "int", "Variant", "tmpl"),
            "IntList.java"
        );
        assert_eq!(output_file_name("tmpl", "int", "Variant", "tmpl"), "Inttmpl");
    }

    #[test]
    fn test_multi_word_ids() {
        assert_eq!(
            output_file_name("VariantMap.kt.tmpl", "int_long", "Variant", "tmpl"),
            "IntLongMap.kt"
        );
    }

    #[test]
    fn test_subdirectories_preserved() {
        assert_eq!(
            output_path(
                Path::new("org/example/VariantHolder.java.tmpl"),
                "float",
                "Variant",
                "tmpl"
            ),
            PathBuf::from("org/example/FloatHolder.java")
        );
        assert_eq!(
            output_path(Path::new("VariantHolder.java.tmpl"), "int", "Variant", "tmpl"),
            PathBuf::from("IntHolder.java")
        );
    }

    #[test]
    fn test_type_name() {
        assert_eq!(type_name(Path::new("org/example/IntHolder.java")), "IntHolder");
        assert_eq!(type_name(Path::new("README")), "README");
    }
}
