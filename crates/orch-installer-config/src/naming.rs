//! Names of external resources that must be globally unique

use crate::runtime_state::RuntimeState;
use uuid::Uuid;

const DEPLOYMENT_ID_LEN: usize = 8;

/// Generate a new lowercase alphanumeric deployment id.
pub fn generate_deployment_id() -> String {
    Uuid::new_v4().simple().to_string()[..DEPLOYMENT_ID_LEN].to_string()
}

/// Assign a deployment id unless the state already carries one.
///
/// Returns `true` when a new id was generated.
pub fn ensure_deployment_id(state: &mut RuntimeState) -> bool {
    if !state.deployment_id.is_empty() {
        return false;
    }
    state.deployment_id = generate_deployment_id();
    tracing::info!("Generated deployment ID {}", state.deployment_id);
    true
}

/// Name of the bucket holding runtime state and module state objects.
pub fn state_bucket_name(orch_name: &str, deployment_id: &str) -> String {
    format!("{orch_name}-{deployment_id}")
}

pub fn resource_name(orch_name: &str, deployment_id: &str, suffix: &str) -> String {
    format!("{orch_name}-{deployment_id}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_shape() {
        let id = generate_deployment_id();
        assert_eq!(id.len(), DEPLOYMENT_ID_LEN);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
    }

    #[test]
    fn test_ensure_deployment_id_is_set_once() {
        let mut state = RuntimeState::default();
        assert!(ensure_deployment_id(&mut state));
        let first = state.deployment_id.clone();

        assert!(!ensure_deployment_id(&mut state));
        assert_eq!(state.deployment_id, first);
    }

    #[test]
    fn test_state_bucket_name_is_exact() {
        assert_eq!(state_bucket_name("demo", "ab12cd34"), "demo-ab12cd34");
        // No trimming or case folding.
        assert_eq!(state_bucket_name("Demo ", "X1"), "Demo -X1");
    }

    #[test]
    fn test_resource_name() {
        assert_eq!(resource_name("demo", "ab12cd34", "o11y"), "demo-ab12cd34-o11y");
    }
}
