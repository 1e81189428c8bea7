//! Abbreviation expansion: run the substitution table over one raw line.

use crate::pipeline::rules::SubstitutionTable;
use std::borrow::Cow;
use tracing::trace;

/// Apply every rule of `table`, in order, to `raw`.
///
/// Each rule replaces all non-overlapping case-insensitive matches in the
/// output of the previous rule. Text no rule matches passes through
/// unchanged, so every input yields exactly one cleaned line. Matched case
/// is not preserved; a rule that cares must encode it in its pattern.
pub fn expand(raw: &str, table: &SubstitutionTable) -> String {
    let mut text = raw.to_string();
    for rule in table {
        let replaced = match rule.regex().replace_all(&text, rule.replacement()) {
            Cow::Owned(s) => Some(s),
            Cow::Borrowed(_) => None,
        };
        if let Some(replaced) = replaced {
            trace!("rule '{}' fired on {:?}", rule.pattern(), text);
            text = replaced;
        }
    }
    text
}
