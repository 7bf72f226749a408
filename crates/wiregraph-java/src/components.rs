use std::path::Path;

use tree_sitter::Node;
use wiregraph_core::types::{derive_component_id, ComponentRecord, DeclarationOrigin};

use crate::annotations::{annotations_of, simple_name, Annotation};
use crate::{named_children, node_text};

/// Role markers that make a class a DI-managed component.
const ROLE_MARKERS: &[&str] = &[
    "Component",
    "Service",
    "Repository",
    "Controller",
    "RestController",
    "Configuration",
    "Named",
    "ManagedBean",
];

const INJECT_MARKERS: &[&str] = &["Autowired", "Inject"];
const QUALIFIERS: &[&str] = &["Qualifier", "Named"];

/// Wrappers that defer to the single component they carry.
const WRAPPERS: &[&str] = &["Optional", "Provider", "ObjectProvider", "ObjectFactory", "Lazy"];

/// Container types whose injection does not name a single component.
const COLLECTIONS: &[&str] = &[
    "List",
    "Set",
    "Collection",
    "Iterable",
    "Map",
    "SortedSet",
    "SortedMap",
    "Stream",
];

/// Build marker-origin component records for one class declaration.
///
/// Returns nothing for classes without a role marker. `@Bean` methods of a
/// marked class produce one extra record each.
pub(crate) fn class_components(
    class: Node,
    source: &str,
    package: Option<&str>,
    path: &Path,
) -> Vec<ComponentRecord> {
    let annotations = annotations_of(class, source);
    let Some(role) = annotations.iter().find(|a| a.is(ROLE_MARKERS)) else {
        return Vec::new();
    };
    let Some(class_name) = qualified_class_name(class, source, package) else {
        return Vec::new();
    };

    let mut record = ComponentRecord::marker(&class_name);
    record.source = Some(path.to_path_buf());
    record.id = role.explicit_name().map(str::to_string);
    record.scope = scope_of(&annotations);

    let mut extra = Vec::new();
    let mut constructors = Vec::new();
    let body = class.child_by_field_name("body");

    for member in body.map(named_children).unwrap_or_default() {
        match member.kind() {
            "field_declaration" => field_references(member, source, &mut record.references),
            "constructor_declaration" => constructors.push(member),
            "method_declaration" => {
                let method_annotations = annotations_of(member, source);
                let method_name = member
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source).to_string());

                if method_annotations.iter().any(|a| a.is(INJECT_MARKERS)) {
                    parameter_references(member, source, &mut record.references);
                }
                if method_annotations.iter().any(|a| a.is(&["PostConstruct"])) {
                    record.init_method = record.init_method.take().or(method_name.clone());
                }
                if method_annotations.iter().any(|a| a.is(&["PreDestroy"])) {
                    record.destroy_method = record.destroy_method.take().or(method_name.clone());
                }
                if let Some(bean) = method_annotations.iter().find(|a| a.is(&["Bean"])) {
                    if let Some(bean_record) =
                        bean_method(member, source, bean, &method_annotations, path)
                    {
                        extra.push(bean_record);
                    }
                }
            }
            _ => {}
        }
    }

    let injected: Vec<Node> = constructors
        .iter()
        .copied()
        .filter(|c| annotations_of(*c, source).iter().any(|a| a.is(INJECT_MARKERS)))
        .collect();
    let chosen = if injected.is_empty() && constructors.len() == 1 {
        constructors
    } else {
        injected
    };
    if chosen.is_empty() && class.kind() == "record_declaration" {
        // Canonical constructor: the record header.
        parameter_references(class, source, &mut record.references);
    }
    for constructor in chosen {
        parameter_references(constructor, source, &mut record.references);
    }

    let mut records = vec![record];
    records.extend(extra);
    records
}

/// `package.Outer$Inner` for a (possibly nested) class declaration.
fn qualified_class_name(class: Node, source: &str, package: Option<&str>) -> Option<String> {
    let mut names = vec![node_text(class.child_by_field_name("name")?, source).to_string()];
    let mut current = class.parent();
    while let Some(node) = current {
        if matches!(
            node.kind(),
            "class_declaration" | "interface_declaration" | "enum_declaration" | "record_declaration"
        ) {
            if let Some(name) = node.child_by_field_name("name") {
                names.push(node_text(name, source).to_string());
            }
        }
        current = node.parent();
    }
    names.reverse();
    let binary = names.join("$");
    Some(match package.filter(|p| !p.is_empty()) {
        Some(package) => format!("{package}.{binary}"),
        None => binary,
    })
}

fn scope_of(annotations: &[Annotation]) -> Option<String> {
    annotations
        .iter()
        .find(|a| a.is(&["Scope"]))
        .and_then(|a| a.value.clone().or_else(|| a.arg("value").or(a.arg("scopeName")).map(str::to_string)))
        .filter(|s| !s.is_empty())
}

/// References from an injected field declaration.
fn field_references(field: Node, source: &str, out: &mut Vec<String>) {
    let annotations = annotations_of(field, source);
    let injected = annotations.iter().any(|a| a.is(INJECT_MARKERS));
    let resource = annotations.iter().find(|a| a.is(&["Resource"]));
    if !injected && resource.is_none() {
        return;
    }
    if annotations.iter().any(|a| a.is(&["Value"])) {
        return;
    }

    let declarators: Vec<Node> = named_children(field)
        .into_iter()
        .filter(|n| n.kind() == "variable_declarator")
        .collect();

    if let Some(id) = qualifier(&annotations) {
        out.push(id);
        return;
    }
    if let Some(resource) = resource {
        // @Resource resolves by name first: explicit name, else the field name.
        if let Some(name) = resource.arg("name") {
            out.push(name.to_string());
            return;
        }
        for declarator in declarators {
            if let Some(name) = declarator.child_by_field_name("name") {
                out.push(node_text(name, source).to_string());
            }
        }
        return;
    }
    if let Some(id) = field
        .child_by_field_name("type")
        .and_then(|t| injected_type_id(t, source))
    {
        out.push(id);
    }
}

/// References from the formal parameters of a constructor or method.
fn parameter_references(callable: Node, source: &str, out: &mut Vec<String>) {
    let Some(parameters) = callable.child_by_field_name("parameters") else {
        return;
    };
    for param in named_children(parameters) {
        if param.kind() != "formal_parameter" {
            continue;
        }
        if let Some(id) = parameter_reference(param, source) {
            out.push(id);
        }
    }
}

fn parameter_reference(param: Node, source: &str) -> Option<String> {
    let annotations = annotations_of(param, source);
    if annotations.iter().any(|a| a.is(&["Value"])) {
        return None;
    }
    qualifier(&annotations).or_else(|| {
        param
            .child_by_field_name("type")
            .and_then(|t| injected_type_id(t, source))
    })
}

fn qualifier(annotations: &[Annotation]) -> Option<String> {
    annotations
        .iter()
        .filter(|a| a.is(QUALIFIERS))
        .find_map(|a| a.explicit_name().map(str::to_string))
}

/// Derived component id for an injected type, or `None` when the type does
/// not name exactly one component.
fn injected_type_id(type_node: Node, source: &str) -> Option<String> {
    match type_node.kind() {
        "type_identifier" | "scoped_type_identifier" => {
            derive_component_id(simple_name(node_text(type_node, source)))
        }
        "generic_type" => {
            let children = named_children(type_node);
            let base = children
                .iter()
                .find(|c| matches!(c.kind(), "type_identifier" | "scoped_type_identifier"))?;
            let base_name = simple_name(node_text(*base, source));
            if COLLECTIONS.contains(&base_name) {
                return None;
            }
            if WRAPPERS.contains(&base_name) {
                let arguments = children.iter().find(|c| c.kind() == "type_arguments")?;
                let inner = named_children(*arguments).into_iter().next()?;
                return injected_type_id(inner, source);
            }
            derive_component_id(base_name)
        }
        _ => None,
    }
}

/// Marker-origin record for a `@Bean` factory method.
fn bean_method(
    method: Node,
    source: &str,
    bean: &Annotation,
    annotations: &[Annotation],
    path: &Path,
) -> Option<ComponentRecord> {
    let method_name = node_text(method.child_by_field_name("name")?, source).to_string();
    let return_type = method
        .child_by_field_name("type")
        .map(|t| strip_generics(node_text(t, source)))
        .filter(|t| !t.is_empty() && t != "void");

    let mut record = match return_type.as_deref() {
        Some(ty) => ComponentRecord::marker(ty),
        None => ComponentRecord::new(DeclarationOrigin::Marker, None),
    };
    record.id = Some(bean.explicit_name().unwrap_or(&method_name).to_string());
    record.scope = scope_of(annotations);
    record.init_method = bean.arg("initMethod").map(str::to_string);
    record.destroy_method = bean.arg("destroyMethod").map(str::to_string);
    record.source = Some(path.to_path_buf());
    parameter_references(method, source, &mut record.references);
    Some(record)
}

fn strip_generics(type_text: &str) -> String {
    type_text
        .split('<')
        .next()
        .unwrap_or(type_text)
        .trim()
        .to_string()
}
