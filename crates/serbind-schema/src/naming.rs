//! Accessor naming conventions
//!
//! Readers are named `get<Field>` and writers `set<Field>`, where `<Field>` is
//! the field name with its first character upper-cased. No other mangling is
//! applied.

const READER_PREFIX: &str = "get";
const WRITER_PREFIX: &str = "set";

/// Name of the reader accessor for a field: `id` -> `getId`
pub fn field_to_reader(field: &str) -> String {
    format!("{READER_PREFIX}{}", upper_first(field))
}

/// Name of the writer accessor for a field: `id` -> `setId`
pub fn field_to_writer(field: &str) -> String {
    format!("{WRITER_PREFIX}{}", upper_first(field))
}

/// Field name addressed by an accessor: `getId` -> `id`, `makeCombined` -> `makeCombined`
pub fn accessor_to_field(accessor: &str) -> String {
    let stem = accessor
        .strip_prefix(READER_PREFIX)
        .or_else(|| accessor.strip_prefix(WRITER_PREFIX))
        .unwrap_or(accessor);
    lower_first(stem)
}

/// Whether an accessor name follows the writer convention
pub fn is_writer_name(accessor: &str) -> bool {
    accessor.starts_with(WRITER_PREFIX)
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
