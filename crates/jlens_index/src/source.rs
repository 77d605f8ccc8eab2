//! Line-oriented scanning of Java source headers.

use std::fs;
use std::io;
use std::path::Path;

/// Imports and package declared by a source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceContext {
    pub package: Option<String>,
    pub imports: Vec<String>,
}

impl SourceContext {
    pub fn from_source(source: &str) -> Self {
        Self {
            package: parse_package(source),
            imports: parse_imports(source),
        }
    }

    pub fn read(path: &Path) -> io::Result<Self> {
        let source = fs::read_to_string(path)?;
        Ok(Self::from_source(&source))
    }
}

/// Header lines with comments removed, stopping at the first type
/// declaration.
fn header_statements(source: &str) -> impl Iterator<Item = &str> {
    let mut in_block_comment = false;
    source
        .lines()
        .map(move |line| {
            let mut line = line.trim();
            if in_block_comment {
                match line.find("*/") {
                    Some(end) => {
                        in_block_comment = false;
                        line = line[end + 2..].trim();
                    }
                    None => return "",
                }
            }
            if let Some(start) = line.find("/*") {
                match line[start..].find("*/") {
                    Some(_) => {}
                    None => {
                        in_block_comment = true;
                        line = line[..start].trim();
                    }
                }
            }
            if let Some(start) = line.find("//") {
                line = line[..start].trim();
            }
            line
        })
        .take_while(|line| !is_type_declaration(line))
        .filter(|line| !line.is_empty())
}

fn is_type_declaration(line: &str) -> bool {
    line.split_whitespace().any(|word| {
        matches!(word, "class" | "interface" | "enum" | "record" | "@interface")
    })
}

/// Package declared by `source`, if any.
pub fn parse_package(source: &str) -> Option<String> {
    header_statements(source).find_map(|line| {
        let rest = line.strip_prefix("package")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let name = rest.trim().trim_end_matches(';').trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}

/// Import targets declared by `source` in declaration order.
///
/// Single-type imports yield `a.b.C`, wildcard imports `a.b.*`. Static imports
/// keep their member path, which is harmless for class resolution since the
/// last segment is a member name rather than the class being looked up.
pub fn parse_imports(source: &str) -> Vec<String> {
    header_statements(source)
        .flat_map(|line| line.split(';'))
        .filter_map(|statement| {
            let rest = statement.trim().strip_prefix("import")?;
            if !rest.starts_with(char::is_whitespace) {
                return None;
            }
            let rest = rest.trim_start();
            let target = rest
                .strip_prefix("static")
                .filter(|tail| tail.starts_with(char::is_whitespace))
                .unwrap_or(rest)
                .trim();
            let target: String = target.chars().filter(|ch| !ch.is_whitespace()).collect();
            (!target.is_empty()).then_some(target)
        })
        .collect()
}
