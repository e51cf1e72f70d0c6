//! Deriving Python identifiers from spreadsheet header labels.

use std::sync::OnceLock;

use regex::Regex;

struct NamePatterns {
    title_word: Regex,
    whitespace: Regex,
    non_word: Regex,
    lower_upper: Regex,
}

fn patterns() -> &'static NamePatterns {
    static PATTERNS: OnceLock<NamePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| NamePatterns {
        title_word: Regex::new(r"([^ ])([A-Z][a-z]+)").expect("valid regex"),
        whitespace: Regex::new(r"\s+").expect("valid regex"),
        non_word: Regex::new(r"\W").expect("valid regex"),
        lower_upper: Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"),
    })
}

/// Python keywords that can come out of the lowercasing below.
const PYTHON_KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Convert a header label such as `"Total Cost (EUR)"` or `"interestRate"` into a snake_case
/// identifier (`total_cost_eur`, `interest_rate`).
///
/// CamelCase words are split, whitespace runs become `_`, non-word characters are dropped and
/// the result is lowercased. A leading digit gets a `_` prefix and a Python keyword gets a `_`
/// suffix (`Class` -> `class_`). A label without any word character yields an empty string;
/// callers pick a fallback for it.
#[must_use]
pub fn make_variable_name(label: &str) -> String {
    let p = patterns();
    let name = label.trim();
    let name = p.title_word.replace_all(name, "${1}_${2}");
    let name = p.whitespace.replace_all(&name, "_");
    let name = p.non_word.replace_all(&name, "");
    let name = p.lower_upper.replace_all(&name, "${1}_${2}").to_lowercase();

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{name}")
    } else if PYTHON_KEYWORDS.contains(&name.as_str()) {
        format!("{name}_")
    } else {
        name
    }
}

/// Whether `name` can be used as a Python attribute or method name.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
        && !PYTHON_KEYWORDS.contains(&name)
        && !matches!(name, "None" | "True" | "False")
}
