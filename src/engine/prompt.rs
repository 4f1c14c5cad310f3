//! Prompt builder: the out-of-core consumer that enforces label
//! integrity. In scope only as validation, not as the template-loading
//! mechanics (which are the CLI's concern).

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::TaskId;
use crate::error::Result;
use crate::label::{IntegrityStatus, LabelCatalog};

#[derive(Debug, Clone)]
pub struct PromptResult {
    pub prompt: String,
    pub warnings: Vec<String>,
}

#[async_trait]
pub trait PromptBuilder: Send + Sync {
    async fn build(&self, task_id: &TaskId, label_names: &[String], base_prompt: &str) -> Result<PromptResult>;
}

pub struct LabelPromptBuilder {
    catalog: Arc<dyn LabelCatalog>,
}

impl LabelPromptBuilder {
    pub fn new(catalog: Arc<dyn LabelCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl PromptBuilder for LabelPromptBuilder {
    async fn build(&self, _task_id: &TaskId, label_names: &[String], base_prompt: &str) -> Result<PromptResult> {
        let mut warnings = Vec::new();
        let mut template_bodies: Vec<String> = Vec::new();
        let mut resolved_names: Vec<String> = Vec::new();

        for name in label_names {
            let label = match self.catalog.find_by_name(name).await {
                Ok(label) => label,
                Err(_) => {
                    warnings.push(format!("Label '{name}': not found, falling back to templateless substitution"));
                    continue;
                }
            };
            resolved_names.push(label.name.clone());

            for path in &label.template_paths {
                let stored_hash = label.content_hashes.get(path).cloned().unwrap_or_default();
                match IntegrityStatus::check(path, &stored_hash).await? {
                    IntegrityStatus::Ok => {
                        if let Ok(body) = tokio::fs::read_to_string(path).await {
                            template_bodies.push(body);
                        }
                    }
                    IntegrityStatus::Modified => {
                        warnings.push(format!(
                            "Label '{}': template file has been modified since last sync",
                            label.name
                        ));
                    }
                    IntegrityStatus::Missing => {
                        warnings.push(format!("Label '{}': template file is missing", label.name));
                    }
                }
            }
        }

        let mut prompt = base_prompt.to_string();
        if !template_bodies.is_empty() {
            prompt.push_str("\n\n## Label-Specific Guidelines\n\n");
            prompt.push_str(&template_bodies.join("\n\n"));
        } else if !resolved_names.is_empty() {
            prompt.push_str("\n\n## Task Labels\n\n");
            for name in &resolved_names {
                prompt.push_str(&format!("- {name}\n"));
            }
        }

        Ok(PromptResult { prompt, warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::InMemoryLabelCatalog;

    #[tokio::test]
    async fn modified_template_emits_exact_warning_and_still_produces_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backend.md");
        tokio::fs::write(&path, b"Follow backend conventions.").await.unwrap();

        let catalog = Arc::new(InMemoryLabelCatalog::new());
        catalog
            .register("backend", "", vec![path.clone()], None, 0, "#000", true)
            .await
            .unwrap();

        tokio::fs::write(&path, b"mutated").await.unwrap();

        let builder = LabelPromptBuilder::new(catalog);
        let result = builder
            .build(&"s1".to_string(), &["backend".to_string()], "Implement the fix.")
            .await
            .unwrap();

        assert!(result
            .warnings
            .iter()
            .any(|w| w == "Label 'backend': template file has been modified since last sync"));
        assert!(result.prompt.starts_with("Implement the fix."));
    }

    #[tokio::test]
    async fn unknown_label_falls_back_to_templateless_substitution() {
        let catalog = Arc::new(InMemoryLabelCatalog::new());
        let builder = LabelPromptBuilder::new(catalog);
        let result = builder
            .build(&"s1".to_string(), &["ghost".to_string()], "Do the thing.")
            .await
            .unwrap();
        assert_eq!(result.prompt, "Do the thing.");
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn resolved_label_with_no_loadable_template_falls_back_to_task_labels_list() {
        let catalog = Arc::new(InMemoryLabelCatalog::new());
        catalog
            .register("backend", "", vec![], None, 0, "#000", true)
            .await
            .unwrap();
        let builder = LabelPromptBuilder::new(catalog);
        let result = builder
            .build(&"s1".to_string(), &["backend".to_string()], "Do the thing.")
            .await
            .unwrap();
        assert!(result.prompt.contains("## Task Labels"));
        assert!(result.prompt.contains("- backend"));
    }
}
