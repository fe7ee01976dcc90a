//! Address-book contact resolver.
//!
//! Contacts live in a small YAML file:
//!
//! ```yaml
//! contacts:
//!   - name: Linda Kamysz
//!     aliases: [mom, mum]
//!     phone: "+1 555 0100"
//!     email: linda@example.com
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::domain::ActionKind;

use super::{ContactResolver, ResolvedContact};

/// One address-book entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContactEntry {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl ContactEntry {
    fn matches(&self, needle: &str) -> bool {
        self.name.eq_ignore_ascii_case(needle) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(needle))
    }

    fn address_for(&self, kind: ActionKind) -> Option<&str> {
        let address = match kind {
            ActionKind::Call | ActionKind::Text => self.phone.as_deref(),
            ActionKind::Email => self.email.as_deref(),
            _ => None,
        };
        address.map(str::trim).filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    contacts: Vec<ContactEntry>,
}

/// In-memory address book
#[derive(Debug, Clone, Default)]
pub struct DirectoryResolver {
    entries: Vec<ContactEntry>,
}

impl DirectoryResolver {
    pub fn new(entries: Vec<ContactEntry>) -> Self {
        Self { entries }
    }

    /// Parse an address book from YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: DirectoryFile = serde_yaml::from_str(content).context("Failed to parse contacts YAML")?;
        Ok(Self::new(file.contacts))
    }

    /// Load an address book; a missing file is an empty book
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No contacts file, using empty directory");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read contacts file: {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, name: &str, kind: ActionKind) -> Option<ResolvedContact> {
        let needle = name.trim();
        self.entries
            .iter()
            .filter(|entry| entry.matches(needle))
            .find_map(|entry| {
                entry.address_for(kind).map(|target| ResolvedContact {
                    target: target.to_string(),
                    canonical_name: entry.name.clone(),
                })
            })
    }
}

#[async_trait]
impl ContactResolver for DirectoryResolver {
    async fn resolve(&self, name: &str, kind: ActionKind) -> Result<Option<ResolvedContact>> {
        Ok(self.lookup(name, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK: &str = r#"
contacts:
  - name: Linda Kamysz
    aliases: [mom, Mum]
    phone: "+1 555 0100"
  - name: Jake
    email: jake@example.com
"#;

    #[tokio::test]
    async fn test_alias_resolves_to_canonical_name() {
        let resolver = DirectoryResolver::from_yaml(BOOK).unwrap();
        let resolved = resolver.resolve("Mom", ActionKind::Call).await.unwrap().unwrap();
        assert_eq!(resolved.canonical_name, "Linda Kamysz");
        assert_eq!(resolved.target, "+1 555 0100");
    }

    #[tokio::test]
    async fn test_missing_address_for_kind_is_no_match() {
        let resolver = DirectoryResolver::from_yaml(BOOK).unwrap();
        assert!(resolver.resolve("mom", ActionKind::Email).await.unwrap().is_none());
        assert!(resolver.resolve("jake", ActionKind::Text).await.unwrap().is_none());
        assert_eq!(
            resolver.resolve("jake", ActionKind::Email).await.unwrap().unwrap().target,
            "jake@example.com"
        );
    }

    #[tokio::test]
    async fn test_unknown_name() {
        let resolver = DirectoryResolver::from_yaml(BOOK).unwrap();
        assert!(resolver.resolve("dentist", ActionKind::Call).await.unwrap().is_none());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp = tempfile::TempDir::new().unwrap();
        let resolver = DirectoryResolver::load(&temp.path().join("contacts.yaml")).unwrap();
        assert!(resolver.is_empty());
    }
}
