use tree_sitter::Node;

use crate::{named_children, node_text};

/// A marker or normal annotation on a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Annotation {
    /// Simple name, without package qualifier.
    pub name: String,
    /// The unnamed single element, as in `@Service("x")`.
    pub value: Option<String>,
    pub args: Vec<(String, String)>,
}

impl Annotation {
    pub fn parse(node: Node, source: &str) -> Option<Self> {
        let name_node = node.child_by_field_name("name")?;
        let name = simple_name(node_text(name_node, source)).to_string();
        let mut value = None;
        let mut args = Vec::new();

        if let Some(arguments) = node.child_by_field_name("arguments") {
            for arg in named_children(arguments) {
                if arg.kind() == "element_value_pair" {
                    let key = arg.child_by_field_name("key");
                    let val = arg.child_by_field_name("value");
                    if let (Some(key), Some(val)) = (key, val) {
                        args.push((node_text(key, source).to_string(), element_value(val, source)));
                    }
                } else if value.is_none() {
                    value = Some(element_value(arg, source));
                }
            }
        }

        Some(Self { name, value, args })
    }

    pub fn is(&self, names: &[&str]) -> bool {
        names.contains(&self.name.as_str())
    }

    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// The name given by `@X("n")`, `@X(value = "n")` or `@X(name = "n")`.
    pub fn explicit_name(&self) -> Option<&str> {
        self.value
            .as_deref()
            .filter(|v| !v.is_empty())
            .or_else(|| self.arg("value"))
            .or_else(|| self.arg("name"))
    }
}

/// Annotations in the `modifiers` child of a declaration.
pub(crate) fn annotations_of(node: Node, source: &str) -> Vec<Annotation> {
    named_children(node)
        .into_iter()
        .filter(|child| child.kind() == "modifiers")
        .flat_map(named_children)
        .filter(|m| matches!(m.kind(), "marker_annotation" | "annotation"))
        .filter_map(|m| Annotation::parse(m, source))
        .collect()
}

/// String content of an annotation element value.
///
/// String literals lose their quotes; arrays yield their first element;
/// scope constants map to their scope name; anything else is kept verbatim.
fn element_value(node: Node, source: &str) -> String {
    match node.kind() {
        "string_literal" => unquote(node_text(node, source)),
        "element_value_array_initializer" => named_children(node)
            .into_iter()
            .next()
            .map(|first| element_value(first, source))
            .unwrap_or_default(),
        _ => {
            let text = node_text(node, source).trim();
            if text.ends_with("SCOPE_PROTOTYPE") {
                "prototype".to_string()
            } else if text.ends_with("SCOPE_SINGLETON") {
                "singleton".to_string()
            } else {
                text.to_string()
            }
        }
    }
}

fn unquote(text: &str) -> String {
    text.trim()
        .trim_start_matches("\"\"\"")
        .trim_end_matches("\"\"\"")
        .trim_matches('"')
        .trim()
        .to_string()
}

pub(crate) fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name).trim()
}
