use std::cell::RefCell;
use std::collections::HashMap;

use indexmap::IndexMap;

/// Longest expansion a single property may produce before it is left as
/// literal text.
pub(crate) const MAX_EXPANDED_LEN: usize = 64 * 1024;

/// Expands `${key}` references against a property table.
///
/// Expansion is transitive: a property whose value references another
/// property is expanded in turn. A reference that would re-enter a key
/// already being expanded is a cycle and is left as literal text, as are
/// references to unknown keys and properties whose expansion exceeds
/// [`MAX_EXPANDED_LEN`]. Each property is expanded at most once per
/// interpolator.
pub(crate) struct Interpolator<'a> {
    properties: &'a IndexMap<String, String>,
    resolved: RefCell<HashMap<String, String>>,
}

impl<'a> Interpolator<'a> {
    pub(crate) fn new(properties: &'a IndexMap<String, String>) -> Self {
        Self {
            properties,
            resolved: RefCell::new(HashMap::new()),
        }
    }

    pub(crate) fn expand(&self, raw: &str) -> String {
        let mut stack = Vec::new();
        self.expand_with_stack(raw, &mut stack)
    }

    pub(crate) fn expand_opt(&self, raw: Option<&str>) -> Option<String> {
        raw.map(|value| self.expand(value))
    }

    fn expand_with_stack(&self, raw: &str, stack: &mut Vec<String>) -> String {
        if !raw.contains("${") {
            return raw.to_string();
        }

        let mut result = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let suffix = &rest[start + 2..];
            let Some(end) = suffix.find('}') else {
                // Unterminated reference, keep the remainder verbatim.
                result.push_str(&rest[start..]);
                return result;
            };
            let key = suffix[..end].trim();
            let literal = &rest[start..start + 2 + end + 1];

            match self.properties.get(key) {
                Some(_) if stack.iter().any(|active| active == key) => {
                    tracing::warn!(property = key, "cyclic property reference left unresolved");
                    result.push_str(literal);
                }
                Some(value) => result.push_str(&self.expand_property(key, value, stack)),
                None => result.push_str(literal),
            }

            rest = &suffix[end + 1..];
        }
        result.push_str(rest);
        result
    }

    fn expand_property(&self, key: &str, value: &str, stack: &mut Vec<String>) -> String {
        if let Some(expanded) = self.resolved.borrow().get(key) {
            return expanded.clone();
        }

        stack.push(key.to_string());
        let mut expanded = self.expand_with_stack(value, stack);
        stack.pop();
        if expanded.len() > MAX_EXPANDED_LEN {
            tracing::warn!(
                property = key,
                length = expanded.len(),
                limit = MAX_EXPANDED_LEN,
                "property expansion too long, left unresolved"
            );
            expanded = format!("${{{key}}}");
        }
        self.resolved
            .borrow_mut()
            .insert(key.to_string(), expanded.clone());
        expanded
    }
}
