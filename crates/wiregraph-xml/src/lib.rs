use std::path::{Path, PathBuf};

use anyhow::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use wiregraph_core::analyzer::{MarkupAnalyzer, MarkupDocument};
use wiregraph_core::error::ExtractError;
use wiregraph_core::types::{AliasDecl, ComponentRecord, DeclarationOrigin};

/// Attributes on value-carrying elements that name another bean.
const REF_ATTRIBUTES: &[&str] = &["ref", "value-ref", "key-ref"];

/// Extractor for XML bean-definition documents (`<beans>` roots).
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlBeansAnalyzer;

impl XmlBeansAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl MarkupAnalyzer for XmlBeansAnalyzer {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn accepts(&self, path: &Path, content: &str) -> bool {
        let is_xml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xml"));
        is_xml && (content.contains("<beans") || content.contains(":beans"))
    }

    fn extract(&self, path: &Path, content: &str) -> Result<MarkupDocument> {
        if !content.contains("beans") {
            return Err(ExtractError::Unsupported {
                path: path.to_path_buf(),
            }
            .into());
        }
        let document = BeansParser::new(path).parse(content)?;
        debug!(
            path = %path.display(),
            records = document.records.len(),
            aliases = document.aliases.len(),
            "extracted bean definitions"
        );
        Ok(document)
    }
}

/// Open element on the parser stack.
enum Frame {
    Bean,
    Other,
}

struct BeansParser {
    path: PathBuf,
    document: MarkupDocument,
    stack: Vec<Frame>,
    /// Record of the outermost open `<bean>`; inner beans write here.
    current: Option<usize>,
}

impl BeansParser {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            document: MarkupDocument::default(),
            stack: Vec::new(),
            current: None,
        }
    }

    fn parse(mut self, content: &str) -> Result<MarkupDocument, ExtractError> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        loop {
            let event = reader
                .read_event()
                .map_err(|e| self.error(format!("at byte {}: {e}", reader.buffer_position())))?;
            match event {
                Event::Start(e) => {
                    let frame = self.open(&e, false)?;
                    self.stack.push(frame);
                }
                Event::Empty(e) => {
                    self.open(&e, true)?;
                }
                Event::End(_) => {
                    if let Some(Frame::Bean) = self.stack.pop() {
                        if !self.stack.iter().any(|f| matches!(f, Frame::Bean)) {
                            self.current = None;
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !self.stack.is_empty() {
            return Err(self.error("unexpected end of document".to_string()));
        }
        Ok(self.document)
    }

    /// Handle a start or empty element and return its stack frame.
    fn open(&mut self, element: &BytesStart, empty: bool) -> Result<Frame, ExtractError> {
        let local = element.local_name();
        let name = String::from_utf8_lossy(local.as_ref()).into_owned();
        let attrs = self.attributes(element)?;

        match name.as_str() {
            "bean" => {
                self.bean(&attrs, empty);
                return Ok(Frame::Bean);
            }
            "alias" => {
                if let (Some(canonical), Some(alias)) = (attr(&attrs, "name"), attr(&attrs, "alias")) {
                    self.document.aliases.push(AliasDecl {
                        alias: alias.to_string(),
                        canonical: canonical.to_string(),
                    });
                }
            }
            // `<idref>` only passes a bean name as a string value.
            "ref" => {
                for key in ["bean", "local", "parent"] {
                    if let Some(target) = attr(&attrs, key) {
                        self.reference(target);
                    }
                }
            }
            "lookup-method" => {
                if let Some(target) = attr(&attrs, "bean") {
                    self.reference(target);
                }
            }
            _ => {
                for key in REF_ATTRIBUTES {
                    if let Some(target) = attr(&attrs, key) {
                        self.reference(target);
                    }
                }
            }
        }
        Ok(Frame::Other)
    }

    fn bean(&mut self, attrs: &[(String, String)], empty: bool) {
        let nested = self.current.is_some();

        if !nested {
            let class = attr(attrs, "class");
            let mut record = ComponentRecord::new(DeclarationOrigin::Declarative, class);
            record.source = Some(self.path.clone());
            record.scope = attr(attrs, "scope").map(str::to_string);
            record.init_method = attr(attrs, "init-method").map(str::to_string);
            record.destroy_method = attr(attrs, "destroy-method").map(str::to_string);

            let mut names = attr(attrs, "name")
                .map(split_names)
                .unwrap_or_default()
                .into_iter();
            record.id = attr(attrs, "id").map(str::to_string).or_else(|| names.next());

            if let Some(canonical) = record.component_id() {
                for alias in names.filter(|n| *n != canonical) {
                    self.document.aliases.push(AliasDecl {
                        alias,
                        canonical: canonical.clone(),
                    });
                }
            }

            self.document.records.push(record);
            self.current = Some(self.document.records.len() - 1);
        }

        for target in attr(attrs, "depends-on").map(split_names).unwrap_or_default() {
            self.reference(&target);
        }
        if let Some(factory) = attr(attrs, "factory-bean") {
            self.reference(factory);
        }
        for (key, value) in attrs {
            if is_namespace_ref(key) && !value.is_empty() {
                self.reference(value);
            }
        }

        if empty && !nested {
            self.current = None;
        }
    }

    fn reference(&mut self, target: &str) {
        let target = target.trim();
        if target.is_empty() {
            return;
        }
        match self.current.and_then(|i| self.document.records.get_mut(i)) {
            Some(record) => record.references.push(target.to_string()),
            None => debug!(path = %self.path.display(), target, "reference outside any bean"),
        }
    }

    fn attributes(&self, element: &BytesStart) -> Result<Vec<(String, String)>, ExtractError> {
        let mut attrs = Vec::new();
        for attribute in element.attributes() {
            let attribute = attribute.map_err(|e| self.error(e.to_string()))?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|e| self.error(e.to_string()))?;
            attrs.push((key, value.trim().to_string()));
        }
        Ok(attrs)
    }

    fn error(&self, message: String) -> ExtractError {
        ExtractError::Markup {
            path: self.path.clone(),
            message,
        }
    }
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

fn split_names(value: &str) -> Vec<String> {
    value
        .split([',', ';', ' ', '\t', '\n'])
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

/// `p:name-ref` / `c:name-ref` style attributes.
fn is_namespace_ref(key: &str) -> bool {
    match key.split_once(':') {
        Some((prefix, local)) => prefix != "xmlns" && local.ends_with("-ref"),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<beans xmlns="http://www.springframework.org/schema/beans"
       xmlns:p="http://www.springframework.org/schema/p"
       xmlns:c="http://www.springframework.org/schema/c">"#;

    fn extract(body: &str) -> MarkupDocument {
        let xml = format!("{HEADER}\n{body}\n</beans>");
        XmlBeansAnalyzer::new()
            .extract(Path::new("src/main/resources/context.xml"), &xml)
            .unwrap()
    }

    fn record<'a>(doc: &'a MarkupDocument, id: &str) -> &'a ComponentRecord {
        doc.records
            .iter()
            .find(|r| r.component_id().as_deref() == Some(id))
            .unwrap_or_else(|| panic!("no bean {id}: {doc:?}"))
    }

    #[test]
    fn test_accepts_only_bean_documents() {
        let analyzer = XmlBeansAnalyzer::new();
        assert!(analyzer.accepts(Path::new("app.xml"), "<beans></beans>"));
        assert!(analyzer.accepts(Path::new("APP.XML"), "<b:beans xmlns:b=\"x\"/>"));
        assert!(!analyzer.accepts(Path::new("pom.xml"), "<project></project>"));
        assert!(!analyzer.accepts(Path::new("beans.txt"), "<beans></beans>"));
    }

    #[test]
    fn test_bean_with_property_and_constructor_refs() {
        let doc = extract(
            r#"
  <bean id="orderService" class="com.acme.OrderService" scope="prototype"
        init-method="start" destroy-method="stop">
    <constructor-arg ref="orderRepository"/>
    <property name="clock" ref="systemClock"/>
    <property name="gateway"><ref bean="paymentGateway"/></property>
    <property name="name" value="orders"/>
  </bean>
"#,
        );
        let svc = record(&doc, "orderService");
        assert_eq!(svc.origin, DeclarationOrigin::Declarative);
        assert_eq!(svc.class_name.as_deref(), Some("com.acme.OrderService"));
        assert_eq!(svc.scope.as_deref(), Some("prototype"));
        assert_eq!(svc.init_method.as_deref(), Some("start"));
        assert_eq!(svc.destroy_method.as_deref(), Some("stop"));
        assert_eq!(svc.references, vec!["orderRepository", "systemClock", "paymentGateway"]);
        assert_eq!(
            svc.source.as_deref(),
            Some(Path::new("src/main/resources/context.xml"))
        );
    }

    #[test]
    fn test_id_falls_back_to_name_then_class() {
        let doc = extract(
            r#"
  <bean name="mailer, notifier;smtp" class="com.acme.SmtpMailer"/>
  <bean class="com.acme.AuditLog"/>
  <bean id="cache" name="store" class="com.acme.Cache"/>
"#,
        );
        assert_eq!(doc.records.len(), 3);
        record(&doc, "mailer");
        record(&doc, "auditLog");
        record(&doc, "cache");

        let aliases: Vec<(&str, &str)> = doc
            .aliases
            .iter()
            .map(|a| (a.alias.as_str(), a.canonical.as_str()))
            .collect();
        assert_eq!(
            aliases,
            vec![("notifier", "mailer"), ("smtp", "mailer"), ("store", "cache")]
        );
    }

    #[test]
    fn test_alias_elements() {
        let doc = extract(r#"<alias name="dataSource" alias="primaryDb"/>"#);
        assert_eq!(
            doc.aliases,
            vec![AliasDecl {
                alias: "primaryDb".to_string(),
                canonical: "dataSource".to_string(),
            }]
        );
    }

    #[test]
    fn test_inner_beans_attribute_refs_to_enclosing_bean() {
        let doc = extract(
            r#"
  <bean id="outer" class="com.acme.Outer">
    <property name="helper">
      <bean id="ignoredInner" class="com.acme.Helper">
        <property name="dep" ref="innerDep"/>
      </bean>
    </property>
    <property name="after" ref="afterInner"/>
  </bean>
  <bean id="next" class="com.acme.Next"/>
"#,
        );
        assert_eq!(doc.records.len(), 2);
        assert_eq!(record(&doc, "outer").references, vec!["innerDep", "afterInner"]);
        assert!(record(&doc, "next").references.is_empty());
    }

    #[test]
    fn test_namespace_and_attribute_refs() {
        let doc = extract(
            r#"
  <bean id="repo" class="com.acme.Repo" p:dataSource-ref="ds" c:clock-ref="clock"
        p:name="plain" depends-on="migrator, warmup" factory-bean="repoFactory"/>
  <bean id="registry" class="com.acme.Registry">
    <property name="handlers">
      <map><entry key="a" value-ref="handlerA"/></map>
    </property>
    <property name="target"><idref bean="repo"/></property>
    <lookup-method name="create" bean="prototypeThing"/>
  </bean>
"#,
        );
        let mut repo_refs = record(&doc, "repo").references.clone();
        repo_refs.sort();
        assert_eq!(repo_refs, vec!["clock", "ds", "migrator", "repoFactory", "warmup"]);
        assert_eq!(
            record(&doc, "registry").references,
            vec!["handlerA", "prototypeThing"]
        );
    }

    #[test]
    fn test_idref_is_not_a_dependency() {
        let doc = extract(
            r#"
  <bean id="scheduler" class="com.acme.Scheduler">
    <property name="targetName"><idref bean="job"/></property>
    <property name="fallback"><idref local="backupJob"/></property>
    <property name="clock"><ref bean="clock"/></property>
  </bean>
"#,
        );
        assert_eq!(record(&doc, "scheduler").references, vec!["clock"]);
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let analyzer = XmlBeansAnalyzer::new();
        let path = Path::new("broken.xml");

        let err = analyzer
            .extract(path, "<beans><bean id=\"a\"></beans>")
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractError>(),
            Some(ExtractError::Markup { .. })
        ));

        assert!(analyzer.extract(path, "<beans><bean id=\"a\">").is_err());
    }

    #[test]
    fn test_non_bean_document_is_unsupported() {
        let err = XmlBeansAnalyzer::new()
            .extract(Path::new("pom.xml"), "<project/>")
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractError>(),
            Some(ExtractError::Unsupported { .. })
        ));
    }
}
