//! Resolution of unqualified class names against imports and a class index.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::index::ClassIndex;

/// Package whose classes are visible without an import.
pub const IMPLICIT_PACKAGE: &str = "java.lang";

/// `java.lang` classes treated as implicitly imported.
pub const IMPLICIT_CLASSES: &[&str] = &[
    "AutoCloseable",
    "Boolean",
    "Byte",
    "CharSequence",
    "Character",
    "Class",
    "Cloneable",
    "Comparable",
    "Deprecated",
    "Double",
    "Enum",
    "Error",
    "Exception",
    "Float",
    "FunctionalInterface",
    "IllegalArgumentException",
    "IllegalStateException",
    "Integer",
    "InterruptedException",
    "Iterable",
    "Long",
    "Math",
    "NullPointerException",
    "Number",
    "Object",
    "Override",
    "Record",
    "Runnable",
    "Runtime",
    "RuntimeException",
    "Short",
    "String",
    "StringBuilder",
    "SuppressWarnings",
    "System",
    "Thread",
    "Throwable",
    "Void",
];

const STANDARD_LIBRARY_SCORE: u32 = 10;
const ROLE_SCORE: u32 = 5;
const IMPORT_PREFIX_SCORE: u32 = 3;
const IMPORT_PREFIX_LEN: usize = 10;

/// Class name suffixes and the package segment conventionally holding them.
const ROLE_WORDS: &[(&str, &str)] = &[
    ("Factory", "factory"),
    ("Service", "service"),
    ("DAO", "dao"),
    ("Dao", "dao"),
];

const BASE_CONFIDENCE: f64 = 0.5;
const IMPORT_CONFIDENCE: f64 = 0.2;
const STANDARD_LIBRARY_CONFIDENCE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionKind {
    FullyQualified,
    SamePackage,
    ExplicitImport,
    WildcardImport,
    ImplicitStandardLibrary,
    Ambiguous,
    NotFound,
}

impl ResolutionKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ResolutionKind::FullyQualified => "FULLY_QUALIFIED",
            ResolutionKind::SamePackage => "SAME_PACKAGE",
            ResolutionKind::ExplicitImport => "EXPLICIT_IMPORT",
            ResolutionKind::WildcardImport => "WILDCARD_IMPORT",
            ResolutionKind::ImplicitStandardLibrary => "IMPLICIT_STANDARD_LIBRARY",
            ResolutionKind::Ambiguous => "AMBIGUOUS",
            ResolutionKind::NotFound => "NOT_FOUND",
        }
    }
}

impl fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`resolve_class_name`].
///
/// `possible_packages` is filled only for [`ResolutionKind::Ambiguous`], as is
/// a non-zero `confidence`. For ambiguous results `resolved_name` holds the
/// best guess and `matched_packages` every candidate sharing its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub simple_name: String,
    pub resolved_name: Option<String>,
    pub kind: ResolutionKind,
    pub possible_packages: Vec<String>,
    pub matched_packages: Vec<String>,
    pub confidence: f64,
}

impl ResolutionResult {
    fn certain(simple_name: &str, package: &str, kind: ResolutionKind) -> Self {
        Self {
            simple_name: simple_name.to_string(),
            resolved_name: Some(format!("{package}.{simple_name}")),
            kind,
            possible_packages: Vec::new(),
            matched_packages: vec![package.to_string()],
            confidence: 0.0,
        }
    }

    fn not_found(simple_name: &str) -> Self {
        Self {
            simple_name: simple_name.to_string(),
            resolved_name: None,
            kind: ResolutionKind::NotFound,
            possible_packages: Vec::new(),
            matched_packages: Vec::new(),
            confidence: 0.0,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(
            self.kind,
            ResolutionKind::Ambiguous | ResolutionKind::NotFound
        )
    }
}

/// Import statement reduced to what resolution needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Import<'a> {
    Single { package: &'a str, name: &'a str },
    Wildcard { package: &'a str },
}

fn parse_import(raw: &str) -> Option<Import<'_>> {
    let mut text = raw.trim();
    text = text.strip_prefix("import ").unwrap_or(text).trim_start();
    text = text.strip_prefix("static ").unwrap_or(text).trim_start();
    text = text.trim_end_matches(';').trim_end();

    if let Some(package) = text.strip_suffix(".*") {
        return (!package.is_empty()).then_some(Import::Wildcard { package });
    }
    let (package, name) = text.rsplit_once('.')?;
    Some(Import::Single { package, name })
}

/// Resolves `simple_name` to its most probable fully-qualified name.
///
/// Precedence, first match wins:
/// 1. a name containing `.` is already qualified;
/// 2. a class of that name in `current_package`;
/// 3. a single-type import ending in the name (trusted without the index);
/// 4. a wildcard import whose package the index lists for the name;
/// 5. an implicitly imported `java.lang` class;
/// 6. every indexed package, reported as ambiguous with a scored best guess.
pub fn resolve_class_name(
    simple_name: &str,
    imports: &[String],
    current_package: Option<&str>,
    index: &ClassIndex,
) -> ResolutionResult {
    let simple_name = simple_name.trim();

    if let Some((package, _)) = simple_name.rsplit_once('.') {
        return ResolutionResult {
            simple_name: simple_name.to_string(),
            resolved_name: Some(simple_name.to_string()),
            kind: ResolutionKind::FullyQualified,
            possible_packages: Vec::new(),
            matched_packages: vec![package.to_string()],
            confidence: 0.0,
        };
    }

    if let Some(package) = current_package.filter(|package| !package.is_empty()) {
        if index.contains(simple_name, package) {
            return ResolutionResult::certain(simple_name, package, ResolutionKind::SamePackage);
        }
    }

    let parsed: Vec<Import<'_>> = imports.iter().filter_map(|raw| parse_import(raw)).collect();

    for import in &parsed {
        if let Import::Single { package, name } = import {
            if *name == simple_name {
                return ResolutionResult::certain(
                    simple_name,
                    package,
                    ResolutionKind::ExplicitImport,
                );
            }
        }
    }

    for import in &parsed {
        if let Import::Wildcard { package } = import {
            if index.contains(simple_name, package) {
                return ResolutionResult::certain(
                    simple_name,
                    package,
                    ResolutionKind::WildcardImport,
                );
            }
        }
    }

    if IMPLICIT_CLASSES.contains(&simple_name) {
        return ResolutionResult::certain(
            simple_name,
            IMPLICIT_PACKAGE,
            ResolutionKind::ImplicitStandardLibrary,
        );
    }

    let candidates = index.packages_for(simple_name);
    if candidates.is_empty() {
        return ResolutionResult::not_found(simple_name);
    }

    let scored: Vec<(u32, &String)> = candidates
        .iter()
        .map(|package| (score_candidate(simple_name, package, imports), package))
        .collect();
    let best_score = scored.iter().map(|(score, _)| *score).max().unwrap_or(0);
    // Candidates are sorted, so the first top scorer is the lexicographically
    // smallest one.
    let winners: Vec<String> = scored
        .iter()
        .filter(|(score, _)| *score == best_score)
        .map(|(_, package)| (*package).clone())
        .collect();
    let best = winners[0].clone();

    ResolutionResult {
        simple_name: simple_name.to_string(),
        resolved_name: Some(format!("{best}.{simple_name}")),
        kind: ResolutionKind::Ambiguous,
        confidence: confidence_for(&best, imports),
        possible_packages: candidates,
        matched_packages: winners,
    }
}

fn is_standard_library(package: &str) -> bool {
    package.starts_with("java.") || package.starts_with("javax.")
}

fn import_prefix_matches<'a>(
    package: &str,
    imports: &'a [String],
) -> impl Iterator<Item = &'a String> {
    let prefix: String = package.chars().take(IMPORT_PREFIX_LEN).collect();
    imports.iter().filter(move |import| {
        let import = import.trim();
        let import = import.strip_prefix("import ").unwrap_or(import).trim_start();
        let import = import.strip_prefix("static ").unwrap_or(import).trim_start();
        import.starts_with(&prefix)
    })
}

fn score_candidate(simple_name: &str, package: &str, imports: &[String]) -> u32 {
    let mut score = 0;
    if is_standard_library(package) {
        score += STANDARD_LIBRARY_SCORE;
    }
    let role_match = ROLE_WORDS.iter().any(|(suffix, segment)| {
        simple_name.ends_with(suffix) && package.rsplit('.').next() == Some(*segment)
    });
    if role_match {
        score += ROLE_SCORE;
    }
    score + IMPORT_PREFIX_SCORE * import_prefix_matches(package, imports).count() as u32
}

fn confidence_for(package: &str, imports: &[String]) -> f64 {
    let mut confidence = BASE_CONFIDENCE;
    if import_prefix_matches(package, imports).next().is_some() {
        confidence += IMPORT_CONFIDENCE;
    }
    if is_standard_library(package) {
        confidence += STANDARD_LIBRARY_CONFIDENCE;
    }
    confidence.min(1.0)
}
