//! Shared string utilities for naming generated code.

/// Convert a string to PascalCase (e.g., "hello_world" -> "HelloWorld", "int" -> "Int")
pub fn to_pascal_case(s: &str) -> String {
    s.split(['_', '-'])
        .map(capitalize)
        .collect()
}

/// Convert a string to camelCase (e.g., "hello_world" -> "helloWorld")
pub fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_lowercase().chain(chars).collect(),
    }
}

/// Convert a string to snake_case (e.g., "HelloWorld" -> "hello_world")
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() && i > 0 {
            result.push('_');
        }
        result.extend(c.to_lowercase());
    }
    result.replace('-', "_")
}

/// Uppercase the first character, leaving the rest untouched
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().chain(chars).collect(),
    }
}
