use std::borrow::Cow;
use std::collections::HashMap;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node};

/// Descriptor fields as written, before interpolation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RawDescriptor {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<RawParent>,
    pub properties: IndexMap<String, String>,
    pub dependencies: Vec<RawDependency>,
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RawParent {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RawDependency {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub classifier: Option<String>,
    pub dep_type: Option<String>,
    pub system_path: Option<String>,
    pub optional: bool,
}

/// How a descriptor was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParseMode {
    Structural,
    Scraped,
}

impl RawDescriptor {
    /// Structural parse, falling back to a tolerant scrape of the raw text
    /// when the document is not well-formed.
    pub(crate) fn read(text: &str) -> (Self, ParseMode) {
        match Self::parse(text) {
            Ok(descriptor) => (descriptor, ParseMode::Structural),
            Err(reason) => {
                tracing::debug!(%reason, "structural descriptor parse failed, scraping raw text");
                (Self::scrape(text), ParseMode::Scraped)
            }
        }
    }

    pub(crate) fn parse(xml: &str) -> Result<Self, String> {
        let normalized = normalize_xml_entities(xml);
        let document = Document::parse(normalized.as_ref())
            .map_err(|error| format!("malformed descriptor: {error}"))?;
        let project = document
            .descendants()
            .find(|node| node.has_tag_name("project"))
            .ok_or_else(|| "no <project> element".to_string())?;

        let parent = child(&project, "parent").map(|node| RawParent {
            group_id: node_text(&node, "groupId"),
            artifact_id: node_text(&node, "artifactId"),
            version: node_text(&node, "version"),
        });

        let managed: HashMap<(String, String), String> = child(&project, "dependencyManagement")
            .and_then(|management| child(&management, "dependencies"))
            .map(|deps| parse_dependency_list(&deps))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|dep| Some(((dep.group_id?, dep.artifact_id?), dep.version?)))
            .collect();

        let mut dependencies = child(&project, "dependencies")
            .map(|deps| parse_dependency_list(&deps))
            .unwrap_or_default();
        for dependency in &mut dependencies {
            if dependency.version.is_some() {
                continue;
            }
            if let (Some(group), Some(artifact)) = (&dependency.group_id, &dependency.artifact_id)
            {
                dependency.version = managed.get(&(group.clone(), artifact.clone())).cloned();
            }
        }

        let modules = child(&project, "modules")
            .map(|modules| {
                modules
                    .children()
                    .filter(|node| node.is_element() && node.tag_name().name() == "module")
                    .filter_map(|node| node.text())
                    .map(|text| text.trim().to_string())
                    .filter(|text| !text.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            group_id: node_text(&project, "groupId"),
            artifact_id: node_text(&project, "artifactId"),
            version: node_text(&project, "version"),
            packaging: node_text(&project, "packaging"),
            parent,
            properties: parse_properties(&project),
            dependencies,
            modules,
        })
    }

    /// Pattern-based extraction over raw text. Accepts documents the
    /// structural parser rejects, at the cost of precision.
    pub(crate) fn scrape(text: &str) -> Self {
        let text = COMMENT.replace_all(text, "");

        let parent = PARENT_BLOCK.captures(&text).map(|captures| {
            let tags = first_tags(&captures[1]);
            RawParent {
                group_id: tags.get("groupId").cloned(),
                artifact_id: tags.get("artifactId").cloned(),
                version: tags.get("version").cloned(),
            }
        });

        let properties = PROPERTIES_BLOCK
            .captures(&text)
            .map(|captures| {
                TAG.captures_iter(&captures[1])
                    .filter(|tag| tag[1] == tag[3])
                    .map(|tag| (tag[1].to_string(), tag[2].trim().to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let without_management = MANAGEMENT_BLOCK.replace_all(&text, "");
        let dependencies = DEPENDENCY_BLOCK
            .captures_iter(&without_management)
            .map(|captures| {
                let body = EXCLUSIONS_BLOCK.replace_all(&captures[1], "");
                let tags = first_tags(&body);
                RawDependency {
                    group_id: tags.get("groupId").cloned(),
                    artifact_id: tags.get("artifactId").cloned(),
                    version: tags.get("version").cloned(),
                    scope: tags.get("scope").cloned(),
                    classifier: tags.get("classifier").cloned(),
                    dep_type: tags.get("type").cloned(),
                    system_path: tags.get("systemPath").cloned(),
                    optional: tags
                        .get("optional")
                        .map(|value| value.eq_ignore_ascii_case("true"))
                        .unwrap_or(false),
                }
            })
            .filter(|dep| dep.group_id.is_some() || dep.artifact_id.is_some())
            .collect();

        let mut identity_text = without_management.into_owned();
        for block in [
            &*PARENT_BLOCK,
            &*PROPERTIES_BLOCK,
            &*DEPENDENCIES_BLOCK,
            &*BUILD_BLOCK,
            &*PROFILES_BLOCK,
        ] {
            identity_text = block.replace_all(&identity_text, "").into_owned();
        }
        let identity = first_tags(&identity_text);

        Self {
            group_id: identity.get("groupId").cloned(),
            artifact_id: identity.get("artifactId").cloned(),
            version: identity.get("version").cloned(),
            packaging: identity.get("packaging").cloned(),
            parent,
            properties,
            dependencies,
            modules: MODULE_TAG
                .captures_iter(&identity_text)
                .map(|captures| captures[1].trim().to_string())
                .collect(),
        }
    }

    /// Own group id, else the one inherited from `<parent>`.
    pub(crate) fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.group_id.as_deref()))
    }

    pub(crate) fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.version.as_deref()))
    }
}

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment regex"));
static PARENT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<parent>(.*?)</parent>").expect("parent regex"));
static PROPERTIES_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<properties>(.*?)</properties>").expect("properties regex"));
static MANAGEMENT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<dependencyManagement>.*?</dependencyManagement>").expect("management regex")
});
static DEPENDENCIES_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<dependencies>.*?</dependencies>").expect("dependencies regex"));
static DEPENDENCY_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<dependency>(.*?)</dependency>").expect("dependency regex"));
static EXCLUSIONS_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<exclusions>.*?</exclusions>").expect("exclusions regex"));
static BUILD_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<build>.*?</build>").expect("build regex"));
static PROFILES_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<profiles>.*?</profiles>").expect("profiles regex"));
static MODULE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<module>([^<]+)</module>").expect("module regex"));
static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([A-Za-z_][\w.\-]*)>([^<]*)</([A-Za-z_][\w.\-]*)>").expect("tag regex")
});

/// First occurrence of each simple `<tag>value</tag>` pair in `text`.
fn first_tags(text: &str) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    for captures in TAG.captures_iter(text) {
        if captures[1] != captures[3] {
            continue;
        }
        let value = captures[2].trim();
        if value.is_empty() {
            continue;
        }
        tags.entry(captures[1].to_string())
            .or_insert_with(|| value.to_string());
    }
    tags
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|candidate| candidate.is_element() && candidate.tag_name().name() == tag)
}

fn parse_properties(node: &Node<'_, '_>) -> IndexMap<String, String> {
    child(node, "properties")
        .map(|props| {
            props
                .children()
                .filter(|prop| prop.is_element())
                .filter_map(|prop| {
                    let key = prop.tag_name().name().to_string();
                    let value = prop.text().map(|text| text.trim().to_string())?;
                    Some((key, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_dependency_list(node: &Node<'_, '_>) -> Vec<RawDependency> {
    node.children()
        .filter(|child| child.is_element() && child.tag_name().name() == "dependency")
        .map(|dependency| RawDependency {
            group_id: node_text(&dependency, "groupId"),
            artifact_id: node_text(&dependency, "artifactId"),
            version: node_text(&dependency, "version"),
            scope: node_text(&dependency, "scope"),
            classifier: node_text(&dependency, "classifier"),
            dep_type: node_text(&dependency, "type"),
            system_path: node_text(&dependency, "systemPath"),
            optional: node_text(&dependency, "optional")
                .map(|value| value.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
        .collect()
}

fn node_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Replaces entities roxmltree does not know (DTD-declared ones) with a
/// space so that otherwise valid descriptors still parse.
fn normalize_xml_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '&' {
            output.push(ch);
            continue;
        }

        let mut entity = String::new();
        while let Some(&next) = chars.peek() {
            entity.push(next);
            chars.next();
            if next == ';' || entity.len() > 32 {
                break;
            }
        }

        match entity.strip_suffix(';') {
            Some(name)
                if ["lt", "gt", "amp", "quot", "apos"]
                    .iter()
                    .any(|known| name.eq_ignore_ascii_case(known))
                    || name.starts_with('#') =>
            {
                output.push('&');
                output.push_str(&entity);
            }
            Some(_) => output.push(' '),
            None => {
                output.push('&');
                output.push_str(&entity);
            }
        }
    }

    Cow::Owned(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>com.example.platform</groupId>
    <artifactId>platform-parent</artifactId>
    <version>7</version>
  </parent>
  <artifactId>service</artifactId>
  <packaging>war</packaging>
  <properties>
    <guava.version>32.1.2-jre</guava.version>
  </properties>
  <modules>
    <module>core</module>
  </modules>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>org.slf4j</groupId>
        <artifactId>slf4j-api</artifactId>
        <version>2.0.9</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
  <dependencies>
    <dependency>
      <groupId>com.google.guava</groupId>
      <artifactId>guava</artifactId>
      <version>${guava.version}</version>
      <exclusions>
        <exclusion>
          <groupId>com.google.code.findbugs</groupId>
          <artifactId>jsr305</artifactId>
        </exclusion>
      </exclusions>
    </dependency>
    <dependency>
      <groupId>org.slf4j</groupId>
      <artifactId>slf4j-api</artifactId>
      <scope>provided</scope>
      <optional>true</optional>
    </dependency>
  </dependencies>
</project>
"#;

    #[test]
    fn structural_parse_reads_project_level_fields() {
        let (descriptor, mode) = RawDescriptor::read(POM);
        assert_eq!(mode, ParseMode::Structural);
        assert_eq!(descriptor.group_id, None);
        assert_eq!(descriptor.effective_group_id(), Some("com.example.platform"));
        assert_eq!(descriptor.artifact_id.as_deref(), Some("service"));
        assert_eq!(descriptor.effective_version(), Some("7"));
        assert_eq!(descriptor.packaging.as_deref(), Some("war"));
        assert_eq!(descriptor.modules, vec!["core".to_string()]);
        assert_eq!(
            descriptor.properties.get("guava.version").map(String::as_str),
            Some("32.1.2-jre")
        );

        assert_eq!(descriptor.dependencies.len(), 2);
        let slf4j = &descriptor.dependencies[1];
        assert_eq!(slf4j.version.as_deref(), Some("2.0.9"));
        assert_eq!(slf4j.scope.as_deref(), Some("provided"));
        assert!(slf4j.optional);
    }

    #[test]
    fn scrape_handles_malformed_documents() {
        let broken = r#"<project>
  <groupId>com.example</groupId>
  <artifactId>broken</artifactId>
  <version>1.0</version>
  <properties><lib.version>3.3</lib.version></properties>
  <dependencies>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>lib</artifactId>
      <version>${lib.version}</version>
      <scope>test</scope>
    </dependency>
  </dependencies>
  <unclosed>
</project>"#;
        let (descriptor, mode) = RawDescriptor::read(broken);
        assert_eq!(mode, ParseMode::Scraped);
        assert_eq!(descriptor.group_id.as_deref(), Some("com.example"));
        assert_eq!(descriptor.artifact_id.as_deref(), Some("broken"));
        assert_eq!(descriptor.version.as_deref(), Some("1.0"));
        assert_eq!(
            descriptor.properties.get("lib.version").map(String::as_str),
            Some("3.3")
        );
        assert_eq!(descriptor.dependencies.len(), 1);
        assert_eq!(descriptor.dependencies[0].scope.as_deref(), Some("test"));
    }

    #[test]
    fn scrape_ignores_parent_and_exclusion_identity() {
        let scraped = RawDescriptor::scrape(POM);
        assert_eq!(scraped.group_id, None);
        assert_eq!(scraped.effective_group_id(), Some("com.example.platform"));
        assert_eq!(scraped.artifact_id.as_deref(), Some("service"));
        assert_eq!(scraped.dependencies.len(), 2);
        assert_eq!(
            scraped.dependencies[0].group_id.as_deref(),
            Some("com.google.guava")
        );
    }

    #[test]
    fn unknown_entities_do_not_break_structural_parse() {
        let xml = "<project><groupId>a&nbsp;</groupId><artifactId>b</artifactId></project>";
        let descriptor = RawDescriptor::parse(xml).expect("parse with entity");
        assert_eq!(descriptor.group_id.as_deref(), Some("a"));
    }
}
