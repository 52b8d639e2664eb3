use std::collections::HashMap;

use async_trait::async_trait;

use super::args::KeywordArgs;
use super::builtin::BuiltinKeyword;
use super::value::KeywordValue;
use crate::error::SqlKeywordError;
use crate::registry::ConnectionRegistry;

/// Extension point: a component contributes extra keywords that run against the shared registry.
#[async_trait]
pub trait LibraryComponent: Send + Sync {
    /// Name used in error messages.
    fn name(&self) -> &str;

    /// Display names of the keywords this component provides.
    fn keywords(&self) -> Vec<String>;

    /// Run one of this component's keywords. `keyword` is the display name from `keywords()`.
    async fn run_keyword(
        &self,
        keyword: &str,
        registry: &mut ConnectionRegistry,
        args: KeywordArgs,
    ) -> Result<KeywordValue, SqlKeywordError>;
}

/// Fold a keyword name the way test runners match them: case, spaces and underscores ignored.
#[must_use]
pub fn normalize_keyword(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Who handles a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordHandler {
    Builtin(BuiltinKeyword),
    /// Index into the component list the table was built from
    Component(usize),
}

#[derive(Debug, Clone)]
pub struct KeywordEntry {
    pub name: String,
    pub handler: KeywordHandler,
}

/// Registration table from normalized keyword name to handler.
#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    entries: HashMap<String, KeywordEntry>,
    order: Vec<String>,
}

impl KeywordTable {
    /// Register the built-in keywords followed by every component's keywords.
    ///
    /// # Errors
    /// Returns `SqlKeywordError::ConfigError` when two keywords normalize to the same name.
    pub fn build(components: &[Box<dyn LibraryComponent>]) -> Result<Self, SqlKeywordError> {
        let mut table = KeywordTable::default();
        for keyword in BuiltinKeyword::ALL {
            table.insert(keyword.name(), KeywordHandler::Builtin(keyword), "builtin")?;
        }
        for (idx, component) in components.iter().enumerate() {
            for name in component.keywords() {
                table.insert(&name, KeywordHandler::Component(idx), component.name())?;
            }
        }
        Ok(table)
    }

    fn insert(
        &mut self,
        name: &str,
        handler: KeywordHandler,
        owner: &str,
    ) -> Result<(), SqlKeywordError> {
        let key = normalize_keyword(name);
        if key.is_empty() {
            return Err(SqlKeywordError::ConfigError(format!(
                "component {owner} registers an empty keyword name"
            )));
        }
        if let Some(existing) = self.entries.get(&key) {
            return Err(SqlKeywordError::ConfigError(format!(
                "keyword '{name}' from {owner} conflicts with '{}'",
                existing.name
            )));
        }
        self.order.push(key.clone());
        self.entries.insert(
            key,
            KeywordEntry {
                name: name.to_string(),
                handler,
            },
        );
        Ok(())
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&KeywordEntry> {
        self.entries.get(&normalize_keyword(name))
    }

    /// Display names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key))
            .map(|entry| entry.name.as_str())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(Vec<&'static str>);

    #[async_trait]
    impl LibraryComponent for Named {
        fn name(&self) -> &str {
            "named"
        }

        fn keywords(&self) -> Vec<String> {
            self.0.iter().map(|k| (*k).to_string()).collect()
        }

        async fn run_keyword(
            &self,
            _keyword: &str,
            _registry: &mut ConnectionRegistry,
            _args: KeywordArgs,
        ) -> Result<KeywordValue, SqlKeywordError> {
            Ok(KeywordValue::None)
        }
    }

    #[test]
    fn normalizes_like_a_runner() {
        assert_eq!(normalize_keyword("Connect To Db"), "connecttodb");
        assert_eq!(normalize_keyword("connect_to_db"), "connecttodb");
        assert_eq!(normalize_keyword("CONNECT TO DB"), "connecttodb");
    }

    #[test]
    fn builtins_and_components() {
        let components: Vec<Box<dyn LibraryComponent>> =
            vec![Box::new(Named(vec!["Get Table Names"]))];
        let table = KeywordTable::build(&components).unwrap();
        assert_eq!(table.len(), BuiltinKeyword::ALL.len() + 1);
        assert_eq!(table.names()[0], "Connect To Db");
        assert_eq!(
            table.lookup("get_table_names").map(|e| e.handler),
            Some(KeywordHandler::Component(0))
        );
        assert_eq!(
            table.lookup("query").map(|e| e.handler),
            Some(KeywordHandler::Builtin(BuiltinKeyword::Query))
        );
    }

    #[test]
    fn duplicates_are_rejected() {
        let components: Vec<Box<dyn LibraryComponent>> = vec![Box::new(Named(vec!["execute"]))];
        assert!(matches!(
            KeywordTable::build(&components),
            Err(SqlKeywordError::ConfigError(_))
        ));

        let components: Vec<Box<dyn LibraryComponent>> =
            vec![Box::new(Named(vec!["Foo Bar", "foo_bar"]))];
        assert!(KeywordTable::build(&components).is_err());
    }
}
