use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator};

use wiregraph_core::analyzer::{LanguageAnalyzer, ParsedFile};
use wiregraph_core::error::ExtractError;
use wiregraph_core::types::{ComponentRecord, SourceFact};

mod annotations;
mod components;

/// Top-level declaration kinds that name a type.
const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

/// Java source-fact and component-marker extractor using tree-sitter.
pub struct JavaAnalyzer {
    language: Language,
    package_query: Query,
    import_query: Query,
    class_query: Query,
}

impl JavaAnalyzer {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_java::LANGUAGE.into();

        let package_query = Query::new(
            &language,
            r#"
            (package_declaration
              [(identifier) (scoped_identifier)] @name)
            "#,
        )
        .context("failed to compile package query")?;

        let import_query = Query::new(&language, "(import_declaration) @import")
            .context("failed to compile import query")?;

        // Matches nested classes too; components.rs rebuilds their binary names.
        let class_query = Query::new(
            &language,
            "[(class_declaration) (record_declaration)] @class",
        )
            .context("failed to compile class query")?;

        Ok(Self {
            language,
            package_query,
            import_query,
            class_query,
        })
    }

    fn package_name(&self, parsed: &ParsedFile) -> Option<String> {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(
            &self.package_query,
            parsed.tree.root_node(),
            parsed.content.as_bytes(),
        );
        while let Some(m) = matches.next() {
            if let Some(capture) = m.captures.first() {
                let name = node_text(capture.node, &parsed.content).trim();
                if !name.is_empty() {
                    return Some(name.to_string());
                }
            }
        }
        None
    }

    fn imports(&self, parsed: &ParsedFile) -> Vec<String> {
        let mut imports = Vec::new();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(
            &self.import_query,
            parsed.tree.root_node(),
            parsed.content.as_bytes(),
        );
        while let Some(m) = matches.next() {
            for capture in m.captures {
                if let Some(import) = import_path(capture.node, &parsed.content) {
                    imports.push(import);
                }
            }
        }
        imports
    }
}

impl LanguageAnalyzer for JavaAnalyzer {
    fn language(&self) -> &'static str {
        "java"
    }

    fn file_extensions(&self) -> &[&str] {
        &["java"]
    }

    fn parse_file(&self, path: &Path, content: &str) -> Result<ParsedFile> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .context("failed to set Java language")?;
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| ExtractError::Parse {
                path: path.to_path_buf(),
                message: "parser produced no tree".to_string(),
            })?;
        if tree.root_node().has_error() {
            debug!(path = %path.display(), "source has syntax errors; extracting what parsed");
        }
        Ok(ParsedFile {
            path: path.to_path_buf(),
            tree,
            content: content.to_string(),
        })
    }

    fn extract_source_fact(&self, parsed: &ParsedFile) -> SourceFact {
        let types = named_children(parsed.tree.root_node())
            .into_iter()
            .filter(|n| TYPE_DECLARATIONS.contains(&n.kind()))
            .filter_map(|n| n.child_by_field_name("name"))
            .map(|n| node_text(n, &parsed.content).to_string())
            .collect();

        SourceFact {
            file: parsed.path.clone(),
            package: self.package_name(parsed),
            types,
            imports: self.imports(parsed),
        }
    }

    fn extract_component_records(&self, parsed: &ParsedFile) -> Vec<ComponentRecord> {
        let package = self.package_name(parsed);
        let mut records = Vec::new();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(
            &self.class_query,
            parsed.tree.root_node(),
            parsed.content.as_bytes(),
        );
        while let Some(m) = matches.next() {
            for capture in m.captures {
                records.extend(components::class_components(
                    capture.node,
                    &parsed.content,
                    package.as_deref(),
                    &parsed.path,
                ));
            }
        }
        records
    }
}

/// Normalized import target of an `import_declaration`.
///
/// Wildcards keep a `.*` suffix; static imports are reduced to their type.
fn import_path(decl: Node, source: &str) -> Option<String> {
    let mut cursor = decl.walk();
    let children: Vec<Node> = decl.children(&mut cursor).collect();
    let is_static = children.iter().any(|c| c.kind() == "static");
    let is_wildcard = children.iter().any(|c| c.kind() == "asterisk");
    let name = children
        .iter()
        .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))?;
    let path = node_text(*name, source).trim().to_string();

    match (is_static, is_wildcard) {
        (false, false) => Some(path),
        (false, true) => Some(format!("{path}.*")),
        (true, true) => Some(path),
        (true, false) => path.rsplit_once('.').map(|(ty, _)| ty.to_string()),
    }
}

pub(crate) fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Extract text from a tree-sitter node.
pub(crate) fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use wiregraph_core::types::DeclarationOrigin;

    fn parse(path: &str, content: &str) -> (JavaAnalyzer, ParsedFile) {
        let analyzer = JavaAnalyzer::new().unwrap();
        let parsed = analyzer.parse_file(&PathBuf::from(path), content).unwrap();
        (analyzer, parsed)
    }

    fn records(content: &str) -> Vec<ComponentRecord> {
        let (analyzer, parsed) = parse("src/main/java/com/acme/Test.java", content);
        analyzer.extract_component_records(&parsed)
    }

    fn find<'a>(records: &'a [ComponentRecord], class_suffix: &str) -> &'a ComponentRecord {
        records
            .iter()
            .find(|r| r.class_name.as_deref().is_some_and(|c| c.ends_with(class_suffix)))
            .unwrap_or_else(|| panic!("no record for {class_suffix}: {records:?}"))
    }

    #[test]
    fn test_extract_package_types_and_imports() {
        let (analyzer, parsed) = parse(
            "src/main/java/com/acme/application/UserService.java",
            r#"
package com.acme.application;

import java.util.List;
import com.acme.domain.user.User;
import com.acme.domain.shared.*;
import static com.acme.util.Strings.isBlank;
import static com.acme.util.Checks.*;

public class UserService {}
interface Helper {}
"#,
        );
        let fact = analyzer.extract_source_fact(&parsed);

        assert_eq!(fact.package.as_deref(), Some("com.acme.application"));
        assert_eq!(fact.types, vec!["UserService", "Helper"]);
        assert_eq!(fact.primary_type(), Some("UserService"));
        assert_eq!(
            fact.imports,
            vec![
                "java.util.List",
                "com.acme.domain.user.User",
                "com.acme.domain.shared.*",
                "com.acme.util.Strings",
                "com.acme.util.Checks",
            ]
        );
    }

    #[test]
    fn test_default_package_has_no_owner() {
        let (analyzer, parsed) = parse("Main.java", "import com.acme.Thing;\nclass Main {}\n");
        let fact = analyzer.extract_source_fact(&parsed);
        assert_eq!(fact.package, None);
        assert_eq!(fact.imports, vec!["com.acme.Thing"]);
    }

    #[test]
    fn test_unmarked_class_is_not_a_component() {
        let found = records(
            r#"
package com.acme.domain;

public class User {
    @Autowired private Clock clock;
}
"#,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_service_with_constructor_injection() {
        let found = records(
            r#"
package com.acme.application;

@Service
public class UserService {
    private final UserRepository repo;
    private final Optional<AuditLog> audit;

    public UserService(UserRepository repo, Optional<AuditLog> audit, List<Listener> listeners) {
        this.repo = repo;
        this.audit = audit;
    }
}
"#,
        );
        let svc = find(&found, "UserService");

        assert_eq!(svc.class_name.as_deref(), Some("com.acme.application.UserService"));
        assert_eq!(svc.origin, DeclarationOrigin::Marker);
        assert_eq!(svc.component_id().as_deref(), Some("userService"));
        assert_eq!(svc.references, vec!["userRepository", "auditLog"]);
    }

    #[test]
    fn test_explicit_id_and_scope() {
        let found = records(
            r#"
package com.acme.infra;

@Repository("users")
@Scope("prototype")
public class JdbcUserRepository {}
"#,
        );
        let repo = find(&found, "JdbcUserRepository");
        assert_eq!(repo.component_id().as_deref(), Some("users"));
        assert_eq!(repo.scope.as_deref(), Some("prototype"));
    }

    #[test]
    fn test_field_setter_and_qualifier_injection() {
        let found = records(
            r#"
package com.acme.web;

@RestController
public class OrderController {
    @Autowired
    private OrderService orderService;

    @Autowired
    @Qualifier("fastPayments")
    private PaymentGateway gateway;

    @Resource
    private Clock systemClock;

    @Resource(name = "mailer")
    private Notifier notifier;

    @Value("${timeout}")
    private Duration timeout;

    private Unrelated notInjected;

    @Inject
    public void setTracer(@Named("zipkin") Tracer tracer) {}

    public OrderController() {}

    @Autowired
    public OrderController(Metrics metrics) {}
}
"#,
        );
        let ctrl = find(&found, "OrderController");
        assert_eq!(
            ctrl.references,
            vec!["orderService", "fastPayments", "systemClock", "mailer", "zipkin", "metrics"]
        );
    }

    #[test]
    fn test_lifecycle_hooks() {
        let found = records(
            r#"
package com.acme;

@Component
public class Warmup {
    @PostConstruct
    void start() {}

    @PreDestroy
    void stop() {}
}
"#,
        );
        let warmup = find(&found, "Warmup");
        assert_eq!(warmup.init_method.as_deref(), Some("start"));
        assert_eq!(warmup.destroy_method.as_deref(), Some("stop"));
    }

    #[test]
    fn test_bean_methods_declare_components() {
        let found = records(
            r#"
package com.acme.config;

@Configuration
public class AppConfig {
    @Bean
    public DataSource dataSource() { return null; }

    @Bean(name = "txManager", initMethod = "init")
    public PlatformTransactionManager transactionManager(DataSource dataSource) { return null; }

    @Bean("cache")
    @Scope("prototype")
    public Map<String, Object> cacheStore(@Qualifier("clock") Clock c) { return null; }
}
"#,
        );
        assert_eq!(found.len(), 4);

        let config = find(&found, "AppConfig");
        assert_eq!(config.component_id().as_deref(), Some("appConfig"));

        let ds = find(&found, "DataSource");
        assert_eq!(ds.component_id().as_deref(), Some("dataSource"));

        let tx = find(&found, "PlatformTransactionManager");
        assert_eq!(tx.component_id().as_deref(), Some("txManager"));
        assert_eq!(tx.init_method.as_deref(), Some("init"));
        assert_eq!(tx.references, vec!["dataSource"]);

        let cache = find(&found, "Map");
        assert_eq!(cache.component_id().as_deref(), Some("cache"));
        assert_eq!(cache.scope.as_deref(), Some("prototype"));
        assert_eq!(cache.references, vec!["clock"]);
    }

    #[test]
    fn test_nested_component_binary_name() {
        let found = records(
            r#"
package com.acme;

public class Outer {
    @Component
    static class InnerWorker {}
}
"#,
        );
        let inner = find(&found, "InnerWorker");
        assert_eq!(inner.class_name.as_deref(), Some("com.acme.Outer$InnerWorker"));
        assert_eq!(inner.component_id().as_deref(), Some("innerWorker"));
    }

    #[test]
    fn test_record_component_injects_through_header() {
        let found = records(
            r#"
package com.acme;

@Component("audit")
public record AuditTrail(Clock clock, @Qualifier("events") EventSink sink) {
    @PostConstruct
    void open() {}
}
"#,
        );
        let audit = find(&found, "AuditTrail");
        assert_eq!(audit.class_name.as_deref(), Some("com.acme.AuditTrail"));
        assert_eq!(audit.component_id().as_deref(), Some("audit"));
        assert_eq!(audit.references, vec!["clock".to_string(), "events".to_string()]);
        assert_eq!(audit.init_method.as_deref(), Some("open"));
    }

    #[test]
    fn test_record_with_explicit_constructor() {
        let found = records(
            r#"
package com.acme;

@Service
record Pricing(Rates rates) {
    @Autowired
    Pricing(Catalog catalog) { this(catalog.rates()); }
}
"#,
        );
        assert_eq!(find(&found, "Pricing").references, vec!["catalog".to_string()]);
    }

    #[test]
    fn test_qualified_role_marker() {
        let found = records(
            r#"
package com.acme;

@org.springframework.stereotype.Service(value = "billing")
public class BillingService {}
"#,
        );
        assert_eq!(find(&found, "BillingService").component_id().as_deref(), Some("billing"));
    }

    #[test]
    fn test_records_serialize() {
        let found = records("package com.acme;\n@Service class A { @Autowired B b; }\n");
        let json = serde_json::to_string(&found).unwrap();
        assert!(json.contains("\"origin\":\"marker\""));
        assert!(json.contains("\"b\""));
    }
}
