//! On-disk layout: every path any component writes or reads is derived
//! from one workspace root, the way `WorkflowDefinition::load_from_file`
//! resolves relative to a single base directory in `ob-workflow`.

use std::path::{Path, PathBuf};

use crate::domain::TaskId;
use crate::error::Result;

#[cfg(unix)]
const DIR_MODE: u32 = 0o755;
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join("var/state.json")
    }

    pub fn health_path(&self) -> PathBuf {
        self.root.join("var/health.json")
    }

    pub fn journal_path(&self) -> PathBuf {
        self.root.join("var/journal.ndjson")
    }

    pub fn agents_config_path(&self) -> PathBuf {
        self.root.join("etc/agents.yaml")
    }

    pub fn workflow_config_path(&self) -> PathBuf {
        self.root.join("etc/workflow.yaml")
    }

    pub fn label_template_path(&self, name: &str) -> PathBuf {
        self.root.join("labels").join(format!("{name}.md"))
    }

    pub fn sbi_dir(&self, sbi_id: &TaskId) -> PathBuf {
        self.root.join("specs/sbi").join(sbi_id)
    }

    pub fn sbi_meta_path(&self, sbi_id: &TaskId) -> PathBuf {
        self.sbi_dir(sbi_id).join("meta.yaml")
    }

    pub fn turn_artifacts_dir(&self, sbi_id: &TaskId, turn: u32) -> PathBuf {
        self.sbi_dir(sbi_id).join("artifacts").join(format!("turn{turn}"))
    }

    pub fn fb_draft_path(&self, sbi_id: &TaskId) -> PathBuf {
        self.sbi_dir(sbi_id).join("fb_draft.yaml")
    }

    pub fn fb_context_path(&self, sbi_id: &TaskId) -> PathBuf {
        self.sbi_dir(sbi_id).join("fb_context.md")
    }

    pub fn fb_evidence_path(&self, sbi_id: &TaskId) -> PathBuf {
        self.sbi_dir(sbi_id).join("fb_evidence.txt")
    }

    /// Create every directory this workspace needs up front (`var/`,
    /// `etc/`, `labels/`, `specs/sbi/`), `0755` on Unix.
    pub async fn ensure_dirs(&self) -> Result<()> {
        for dir in ["var", "etc", "labels", "specs/sbi"] {
            self.ensure_dir(&self.root.join(dir)).await?;
        }
        Ok(())
    }

    pub async fn ensure_sbi_dirs(&self, sbi_id: &TaskId, turn: u32) -> Result<()> {
        self.ensure_dir(&self.sbi_dir(sbi_id)).await?;
        self.ensure_dir(&self.turn_artifacts_dir(sbi_id, turn)).await?;
        Ok(())
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path).await?;
        self.set_dir_mode(path).await?;
        Ok(())
    }

    #[cfg(unix)]
    async fn set_dir_mode(&self, path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(DIR_MODE);
        tokio::fs::set_permissions(path, perms).await?;
        Ok(())
    }

    #[cfg(not(unix))]
    async fn set_dir_mode(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    /// Write `contents` to `path`, creating parent directories and
    /// setting `0644` on Unix.
    pub async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.ensure_dir(parent).await?;
        }
        tokio::fs::write(path, contents).await?;
        self.set_file_mode(path).await?;
        Ok(())
    }

    #[cfg(unix)]
    async fn set_file_mode(&self, path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(FILE_MODE);
        tokio::fs::set_permissions(path, perms).await?;
        Ok(())
    }

    #[cfg(not(unix))]
    async fn set_file_mode(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted_consistently() {
        let ws = Workspace::new("/srv/taskflow");
        assert_eq!(ws.state_path(), Path::new("/srv/taskflow/var/state.json"));
        assert_eq!(
            ws.turn_artifacts_dir(&"s1".to_string(), 2),
            Path::new("/srv/taskflow/specs/sbi/s1/artifacts/turn2")
        );
        assert_eq!(
            ws.label_template_path("backend"),
            Path::new("/srv/taskflow/labels/backend.md")
        );
    }

    #[tokio::test]
    async fn ensure_dirs_creates_the_expected_tree() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        ws.ensure_dirs().await.unwrap();
        assert!(dir.path().join("var").is_dir());
        assert!(dir.path().join("etc").is_dir());
        assert!(dir.path().join("labels").is_dir());
        assert!(dir.path().join("specs/sbi").is_dir());
    }

    #[tokio::test]
    async fn write_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        let path = ws.fb_draft_path(&"s1".to_string());
        ws.write_file(&path, b"reasonCode: DEP_UNRESOLVED\n").await.unwrap();
        let body = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(body.contains("DEP_UNRESOLVED"));
    }
}
