//! Deep merge of runtime states
//!
//! Both records are lowered to a `serde_yaml::Value` tree keyed by field
//! name, merged, and lifted back. A source value only wins when it is
//! non-zero, so a step that leaves a field untouched never clobbers what an
//! earlier step produced.

use crate::error::{ConfigError, Result};
use crate::runtime_state::RuntimeState;
use serde_yaml::Value;

/// Merge `src` into `dest`.
pub fn merge_runtime_state(dest: &mut RuntimeState, src: &RuntimeState) -> Result<()> {
    if src.is_empty() {
        return Ok(());
    }
    let mut merged = serde_yaml::to_value(&*dest).map_err(|e| ConfigError::Serialization {
        what: "destination runtime state",
        message: e.to_string(),
    })?;
    let source = serde_yaml::to_value(src).map_err(|e| ConfigError::Serialization {
        what: "source runtime state",
        message: e.to_string(),
    })?;

    merge_value(&mut merged, source);

    *dest = serde_yaml::from_value(merged).map_err(|e| ConfigError::Serialization {
        what: "merged runtime state",
        message: e.to_string(),
    })?;
    Ok(())
}

/// Merge one value tree into another. Mappings recurse, anything else is
/// replaced by a non-zero source.
pub fn merge_value(dest: &mut Value, src: Value) {
    match (dest, src) {
        (Value::Mapping(dest_map), Value::Mapping(src_map)) => {
            for (key, value) in src_map {
                if is_zero(&value) {
                    continue;
                }
                match dest_map.get_mut(&key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        dest_map.insert(key, value);
                    }
                }
            }
        }
        (dest, src) => {
            if !is_zero(&src) {
                *dest = src;
            }
        }
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Sequence(seq) => seq.is_empty(),
        Value::Mapping(map) => map.values().all(is_zero),
        Value::Tagged(tagged) => is_zero(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime_state::{Action, LoadBalancerState};

    fn populated() -> RuntimeState {
        let mut state = RuntimeState::new(Action::Install);
        state.log_dir = "/tmp/logs".to_string();
        state.deployment_id = "k3x9q2m1".to_string();
        state.aws.vpc_id = "vpc-1".to_string();
        state.aws.private_subnet_ids = vec!["s1".to_string()];
        state.aws.jump_host.tunnel_port = 2222;
        state.database.port = 5432;
        state
    }

    #[test]
    fn test_merge_with_zero_is_identity() {
        let mut dest = populated();
        merge_runtime_state(&mut dest, &RuntimeState::default()).unwrap();
        assert_eq!(dest, populated());
    }

    #[test]
    fn test_merge_with_self_is_identity() {
        let mut dest = populated();
        let src = populated();
        merge_runtime_state(&mut dest, &src).unwrap();
        assert_eq!(dest, populated());
    }

    #[test]
    fn test_merge_preserves_prior_fields() {
        let mut dest = RuntimeState {
            action: "install".to_string(),
            ..Default::default()
        };
        dest.aws.vpc_id = "vpc-1".to_string();
        dest.aws.private_subnet_ids = vec!["s1".to_string()];

        let mut src = RuntimeState::default();
        src.aws.jump_host.ip = "10.0.0.1".to_string();

        merge_runtime_state(&mut dest, &src).unwrap();

        assert_eq!(dest.action, "install");
        assert_eq!(dest.aws.vpc_id, "vpc-1");
        assert_eq!(dest.aws.private_subnet_ids, vec!["s1".to_string()]);
        assert_eq!(dest.aws.jump_host.ip, "10.0.0.1");
    }

    #[test]
    fn test_zero_source_fields_do_not_clobber() {
        let mut dest = populated();
        let mut src = populated();
        src.aws.vpc_id.clear();
        src.aws.private_subnet_ids.clear();
        src.database.port = 0;
        src.aws.eks_oidc_issuer = "https://oidc.example".to_string();

        merge_runtime_state(&mut dest, &src).unwrap();

        assert_eq!(dest.aws.vpc_id, "vpc-1");
        assert_eq!(dest.aws.private_subnet_ids, vec!["s1".to_string()]);
        assert_eq!(dest.database.port, 5432);
        assert_eq!(dest.aws.eks_oidc_issuer, "https://oidc.example");
    }

    #[test]
    fn test_non_empty_sequence_replaces() {
        let mut dest = populated();
        let mut src = RuntimeState::default();
        src.aws.private_subnet_ids = vec!["s2".to_string(), "s3".to_string()];

        merge_runtime_state(&mut dest, &src).unwrap();
        assert_eq!(
            dest.aws.private_subnet_ids,
            vec!["s2".to_string(), "s3".to_string()]
        );
    }

    #[test]
    fn test_nested_maps_merge_by_key() {
        let mut dest = RuntimeState::default();
        let mut traefik = LoadBalancerState {
            arn: "arn:traefik".to_string(),
            ..Default::default()
        };
        traefik
            .target_groups
            .insert("https".to_string(), "arn:tg-https".to_string());
        dest.aws.load_balancers.insert("traefik".to_string(), traefik);

        let mut src = RuntimeState::default();
        let mut update = LoadBalancerState::default();
        update
            .target_groups
            .insert("grpc".to_string(), "arn:tg-grpc".to_string());
        src.aws.load_balancers.insert("traefik".to_string(), update);
        src.aws.load_balancers.insert(
            "argocd".to_string(),
            LoadBalancerState {
                arn: "arn:argocd".to_string(),
                ..Default::default()
            },
        );

        merge_runtime_state(&mut dest, &src).unwrap();

        let traefik = &dest.aws.load_balancers["traefik"];
        assert_eq!(traefik.arn, "arn:traefik");
        assert_eq!(traefik.target_groups.len(), 2);
        assert_eq!(dest.aws.load_balancers["argocd"].arn, "arn:argocd");
    }

    #[test]
    fn test_merge_value_scalars() {
        let mut dest = Value::from("keep");
        merge_value(&mut dest, Value::from(""));
        assert_eq!(dest, Value::from("keep"));

        merge_value(&mut dest, Value::from("new"));
        assert_eq!(dest, Value::from("new"));
    }
}
