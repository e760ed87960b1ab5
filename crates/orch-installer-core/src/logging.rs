//! Per-step log files for external tool output

use std::path::{Path, PathBuf};

/// Log file a step appends external tool output to.
pub fn step_log_file(log_dir: impl AsRef<Path>, file_name: &str) -> PathBuf {
    log_dir.as_ref().join(format!("{file_name}.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_log_file_is_deterministic() {
        assert_eq!(
            step_log_file("/var/log/orch", "aws_vpc"),
            PathBuf::from("/var/log/orch/aws_vpc.log")
        );
        assert_eq!(
            step_log_file("/var/log/orch", "aws_vpc"),
            step_log_file("/var/log/orch", "aws_vpc")
        );
    }
}
