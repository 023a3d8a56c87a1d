//! Legal and information documents (`/legal`, `/rules`).

use crate::config::LegalSettings;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct LegalService {
    documents: RwLock<BTreeMap<String, Vec<String>>>,
}

impl LegalService {
    pub fn new(settings: &LegalSettings) -> Self {
        Self {
            documents: RwLock::new(normalize(settings)),
        }
    }

    pub async fn reload(&self, settings: &LegalSettings) {
        *self.documents.write().await = normalize(settings);
    }

    /// Lines of a document, looked up case-insensitively.
    pub async fn document(&self, name: &str) -> Option<Vec<String>> {
        self.documents.read().await.get(&name.to_lowercase()).cloned()
    }

    pub async fn names(&self) -> Vec<String> {
        self.documents.read().await.keys().cloned().collect()
    }
}

fn normalize(settings: &LegalSettings) -> BTreeMap<String, Vec<String>> {
    settings
        .documents
        .iter()
        .map(|(name, lines)| (name.to_lowercase(), lines.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let mut settings = LegalSettings::default();
        settings
            .documents
            .insert("Privacy".to_string(), vec!["We store your name.".to_string()]);
        let legal = LegalService::new(&settings);

        assert_eq!(legal.document("PRIVACY").await.unwrap(), vec!["We store your name.".to_string()]);
        assert!(legal.document("imprint").await.is_none());
        assert_eq!(legal.names().await, vec!["privacy".to_string(), "rules".to_string()]);
    }
}
