use std::fmt::Write as _;
use std::path::Path;

use jlens_index::{ClassIndex, ClassSearchHit, IndexSummary, ResolutionKind, ResolutionResult};
use jlens_maven::{DependencyInfo, ModuleContext};

pub(crate) fn module_details(context: &ModuleContext) -> String {
    let mut buffer = String::new();
    let _ = writeln!(buffer, "Module       : {}", context.coordinates());
    let _ = writeln!(buffer, "Packaging    : {}", context.packaging());
    let _ = writeln!(buffer, "Descriptor   : {}", context.pom_file().display());
    let _ = writeln!(buffer, "Base dir     : {}", context.base_directory().display());
    let _ = writeln!(buffer, "Scope        : {}", context.scope());
    if context.active_profiles().is_empty() {
        let _ = writeln!(buffer, "Profiles     : -");
    } else {
        let _ = writeln!(buffer, "Profiles     : {}", context.active_profiles().join(", "));
    }
    if !context.modules().is_empty() {
        let _ = writeln!(buffer, "Modules      : {}", context.modules().join(", "));
    }
    let _ = writeln!(buffer, "Repository   : {}", display_optional(context.local_repository()));
    let _ = writeln!(buffer, "Dependencies : {}", context.dependencies().len());
    let _ = writeln!(buffer, "Archives     : {}", context.classpath_jars().len());
    let _ = writeln!(buffer, "Sources      : {}", context.source_jars().len());

    buffer.push_str("Classpath:\n");
    for entry in context.classpath() {
        let _ = writeln!(buffer, "  {}", entry.display());
    }
    buffer
}

pub(crate) fn dependency_table(dependencies: &[DependencyInfo]) -> String {
    if dependencies.is_empty() {
        return "No dependencies.\n".to_string();
    }
    let rows = dependencies
        .iter()
        .map(|dependency| {
            vec![
                dependency.coordinates(),
                dependency.scope.to_string(),
                yes_no(dependency.optional),
                display_optional(dependency.jar_path.as_deref()),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&["dependency", "scope", "optional", "archive"], rows)
}

pub(crate) fn index_summary(
    context: &ModuleContext,
    index: &ClassIndex,
    summary: &IndexSummary,
) -> String {
    let mut buffer = String::new();
    let _ = writeln!(buffer, "Module       : {}", context.coordinates());
    let _ = writeln!(buffer, "Archives     : {}", summary.binary_archives);
    let _ = writeln!(buffer, "Directories  : {}", summary.directories);
    let _ = writeln!(buffer, "Sources      : {}", summary.source_archives);
    let _ = writeln!(buffer, "Skipped      : {}", summary.failed);
    let _ = writeln!(buffer, "Classes      : {}", index.class_count());
    let _ = writeln!(buffer, "Simple names : {}", index.simple_name_count());
    let _ = writeln!(buffer, "Elapsed      : {} ms", summary.elapsed_ms);
    buffer
}

pub(crate) fn search_table(hits: &[ClassSearchHit]) -> String {
    let rows = hits
        .iter()
        .map(|hit| {
            vec![
                hit.class_name.clone(),
                hit.dependency.clone().unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&["class", "dependency"], rows)
}

pub(crate) fn resolutions(results: &[ResolutionResult]) -> String {
    let mut buffer = String::new();
    for result in results {
        match (result.kind, result.resolved_name.as_deref()) {
            (ResolutionKind::Ambiguous, Some(best)) => {
                let _ = writeln!(
                    buffer,
                    "{} -> {best} ({}, confidence {:.2})",
                    result.simple_name, result.kind, result.confidence
                );
                let _ = writeln!(buffer, "  candidates: {}", result.possible_packages.join(", "));
            }
            (kind, Some(resolved)) => {
                let _ = writeln!(buffer, "{} -> {resolved} ({kind})", result.simple_name);
            }
            (kind, None) => {
                let _ = writeln!(buffer, "{} -> ? ({kind})", result.simple_name);
            }
        }
    }
    buffer
}

fn render_table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut widths = headers.iter().map(|h| h.len()).collect::<Vec<_>>();
    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(cell.len());
        }
    }

    let mut buffer = String::new();
    append_row(&mut buffer, headers, &widths);
    append_separator(&mut buffer, &widths);
    for row in rows {
        let refs = row.iter().map(|cell| cell.as_str()).collect::<Vec<_>>();
        append_row(&mut buffer, &refs, &widths);
    }
    buffer
}

fn append_row(buffer: &mut String, cells: &[&str], widths: &[usize]) {
    for (idx, cell) in cells.iter().enumerate() {
        if idx > 0 {
            buffer.push_str("  ");
        }
        if idx + 1 == cells.len() {
            buffer.push_str(cell);
        } else {
            let width = widths[idx];
            let _ = write!(buffer, "{cell:<width$}");
        }
    }
    buffer.push('\n');
}

fn append_separator(buffer: &mut String, widths: &[usize]) {
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            buffer.push_str("  ");
        }
        buffer.push_str(&"-".repeat(*width));
    }
    buffer.push('\n');
}

fn display_optional(path: Option<&Path>) -> String {
    path.map(|path| path.display().to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn yes_no(value: bool) -> String {
    if value {
        "yes".to_string()
    } else {
        "no".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jlens_maven::Scope;

    #[test]
    fn dependency_table_aligns_columns() {
        let dependencies = vec![
            DependencyInfo::new("org.slf4j", "slf4j-api", "2.0.9"),
            DependencyInfo::new("org.junit", "junit", "5.10.0")
                .with_scope(Scope::Test)
                .with_optional(true),
        ];
        let table = dependency_table(&dependencies);
        let lines = table.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("dependency"));
        assert!(lines[1].starts_with("---"));
        assert!(lines[2].contains("org.slf4j:slf4j-api:jar:2.0.9"));
        assert!(lines[3].contains("test"));
        assert!(lines[3].contains("yes"));
        let scope_column = lines[0].find("scope").expect("scope header");
        assert_eq!(lines[3].find("test"), Some(scope_column));
    }

    #[test]
    fn resolutions_show_candidates_for_ambiguous_names() {
        let results = vec![
            ResolutionResult {
                simple_name: "Foo".to_string(),
                resolved_name: Some("com.example.Foo".to_string()),
                kind: ResolutionKind::Ambiguous,
                possible_packages: vec!["com.example".to_string(), "org.other".to_string()],
                matched_packages: vec!["com.example".to_string(), "org.other".to_string()],
                confidence: 0.5,
            },
            ResolutionResult {
                simple_name: "Missing".to_string(),
                resolved_name: None,
                kind: ResolutionKind::NotFound,
                possible_packages: Vec::new(),
                matched_packages: Vec::new(),
                confidence: 0.0,
            },
        ];
        let text = resolutions(&results);
        assert!(text.contains("Foo -> com.example.Foo (AMBIGUOUS, confidence 0.50)"));
        assert!(text.contains("candidates: com.example, org.other"));
        assert!(text.contains("Missing -> ? (NOT_FOUND)"));
    }

    #[test]
    fn module_details_list_classpath() {
        let context = ModuleContext::builder("/work/app/pom.xml")
            .group_id("com.example")
            .artifact_id("app")
            .version("1.0.0")
            .active_profiles(["dev"])
            .modules(["core", "web"])
            .classpath(vec!["/work/app/target/classes".into()])
            .build();
        let block = module_details(&context);
        assert!(block.contains("Module       : com.example:app:1.0.0"));
        assert!(block.contains("Profiles     : dev"));
        assert!(block.contains("Modules      : core, web"));
        assert!(block.contains("  /work/app/target/classes"));
    }
}
