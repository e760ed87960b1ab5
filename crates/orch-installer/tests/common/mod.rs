use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const VALID_CONFIG: &str = r#"
version: 4
provider: aws
global:
  orchName: demo
  parentDomain: example.com
  adminEmail: admin@example.com
  scale: 100
aws:
  region: us-west-2
"#;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_config(&self, content: &str) -> PathBuf {
        let path = self.path().join("config.yaml");
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    pub fn log_dir(&self) -> PathBuf {
        self.path().join(".logs")
    }
}
