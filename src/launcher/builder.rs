//! Manifest Builder
//!
//! Turns a caller-supplied Job template into the manifest actually submitted:
//! role and group labels, a unique name, the resolved namespace, a restart
//! policy and a one-shot polling interval.

use rand::Rng;
use serde_json::{Value, json};

use crate::error::MalformedManifestError;
use crate::kubernetes_objects::manifest::display_path;
use crate::kubernetes_objects::{
    GROUP_LABEL, Manifest, NamespaceContext, ROLE_JOB, ROLE_LABEL, ROLE_POD,
};

pub const INTERVAL_ENV: &str = "INTERVAL";
pub const DEFAULT_RESTART_POLICY: &str = "OnFailure";

const NAME_SUFFIX_LEN: usize = 5;
const NAME_SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

const CONTAINERS_PATH: [&str; 4] = ["spec", "template", "spec", "containers"];
const RESTART_POLICY_PATH: [&str; 4] = ["spec", "template", "spec", "restartPolicy"];

/// Build the manifest for a new worker Job of `group`. `base` is left untouched.
pub fn build(
    base: &Manifest,
    group: &str,
    namespace: &NamespaceContext,
) -> Result<Manifest, MalformedManifestError> {
    let mut manifest = base.clone();

    let job_labels = manifest.mapping_mut(&["metadata", "labels"])?;
    job_labels.insert(ROLE_LABEL.to_string(), json!(ROLE_JOB));
    job_labels.insert(GROUP_LABEL.to_string(), json!(group));

    let pod_labels = manifest.mapping_mut(&["spec", "template", "metadata", "labels"])?;
    pod_labels.insert(ROLE_LABEL.to_string(), json!(ROLE_POD));
    pod_labels.insert(GROUP_LABEL.to_string(), json!(group));

    manifest.set(&["metadata", "name"], json!(unique_name(group)))?;
    manifest.set(&["metadata", "namespace"], json!(namespace.namespace))?;

    ensure_restart_policy(&mut manifest)?;
    force_interval_env(&mut manifest)?;

    Ok(manifest)
}

/// `<group>-` followed by five random lowercase alphanumerics. Not checked for
/// collisions; the cluster rejects a duplicate name on create.
pub fn unique_name(group: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..NAME_SUFFIX_LEN)
        .map(|_| NAME_SUFFIX_CHARSET[rng.gen_range(0..NAME_SUFFIX_CHARSET.len())] as char)
        .collect();
    format!("{group}-{suffix}")
}

fn ensure_restart_policy(manifest: &mut Manifest) -> Result<(), MalformedManifestError> {
    let missing = match manifest.get(&RESTART_POLICY_PATH) {
        Some(Value::String(policy)) => policy.is_empty(),
        None | Some(Value::Null) => true,
        Some(_) => {
            return Err(MalformedManifestError::NotAString(display_path(
                &RESTART_POLICY_PATH,
            )));
        }
    };
    if missing {
        manifest.set(&RESTART_POLICY_PATH, json!(DEFAULT_RESTART_POLICY))?;
    }
    Ok(())
}

/// Workers run once and exit, so the first container always gets `INTERVAL=0`.
fn force_interval_env(manifest: &mut Manifest) -> Result<(), MalformedManifestError> {
    let containers = manifest
        .get_mut(&CONTAINERS_PATH)
        .ok_or_else(|| MalformedManifestError::MissingField(display_path(&CONTAINERS_PATH)))?
        .as_array_mut()
        .ok_or_else(|| MalformedManifestError::NotASequence(display_path(&CONTAINERS_PATH)))?;
    let container = containers
        .first_mut()
        .ok_or(MalformedManifestError::NoContainers)?
        .as_object_mut()
        .ok_or_else(|| {
            MalformedManifestError::NotAMapping(format!("{}[0]", display_path(&CONTAINERS_PATH)))
        })?;

    let env = container.entry("env").or_insert(Value::Null);
    if env.is_null() {
        *env = Value::Array(Vec::new());
    }
    let env = env.as_array_mut().ok_or_else(|| {
        MalformedManifestError::NotASequence(format!("{}[0].env", display_path(&CONTAINERS_PATH)))
    })?;

    // Every duplicate is rewritten: the kubelet applies the last one.
    let mut found = false;
    for var in env
        .iter_mut()
        .filter_map(Value::as_object_mut)
        .filter(|var| var.get("name").and_then(Value::as_str) == Some(INTERVAL_ENV))
    {
        var.remove("valueFrom");
        var.insert("value".to_string(), json!("0"));
        found = true;
    }
    if !found {
        env.push(json!({ "name": INTERVAL_ENV, "value": "0" }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes_objects::NamespaceSource;

    fn namespace(name: &str) -> NamespaceContext {
        NamespaceContext {
            namespace: name.to_string(),
            source: NamespaceSource::Fallback,
        }
    }

    fn template() -> Manifest {
        Manifest::from_yaml_str(
            r#"
apiVersion: batch/v1
kind: Job
metadata:
  name: thumbnails
  labels:
    team: media
spec:
  template:
    metadata:
      name: thumbnails
    spec:
      containers:
        - name: worker
          image: example/worker
          env:
            - name: QUEUE
              value: thumbnails
"#,
        )
        .unwrap()
    }

    fn assert_generated_name(name: &str, group: &str) {
        let suffix = name
            .strip_prefix(&format!("{group}-"))
            .unwrap_or_else(|| panic!("'{name}' does not start with '{group}-'"));
        assert_eq!(suffix.len(), 5, "suffix of '{name}'");
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()),
            "suffix of '{name}'"
        );
    }

    #[test]
    fn test_labels() {
        let manifest = build(&template(), "thumbnails", &namespace("default")).unwrap();

        assert_eq!(
            manifest.get(&["metadata", "labels"]),
            Some(&json!({
                "team": "media",
                "resque-kubernetes": "job",
                "resque-kubernetes-group": "thumbnails",
            }))
        );
        assert_eq!(
            manifest.get(&["spec", "template", "metadata", "labels"]),
            Some(&json!({
                "resque-kubernetes": "pod",
                "resque-kubernetes-group": "thumbnails",
            }))
        );
    }

    #[test]
    fn test_labels_are_overwritten_not_duplicated() {
        let once = build(&template(), "thumbnails", &namespace("default")).unwrap();
        let twice = build(&once, "thumbnails", &namespace("default")).unwrap();

        assert_eq!(
            twice.get(&["metadata", "labels"]),
            once.get(&["metadata", "labels"])
        );
        assert_eq!(
            twice.get(&["spec", "template", "metadata", "labels"]),
            once.get(&["spec", "template", "metadata", "labels"])
        );
        let env = twice
            .get(&["spec", "template", "spec", "containers"])
            .and_then(|c| c[0]["env"].as_array())
            .unwrap();
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn test_unique_name() {
        for _ in 0..50 {
            assert_generated_name(&unique_name("thumbnails"), "thumbnails");
        }

        let manifest = build(&template(), "thumbnails", &namespace("default")).unwrap();
        assert_generated_name(manifest.name().unwrap(), "thumbnails");
    }

    #[test]
    fn test_base_manifest_is_not_mutated() {
        let base = template();
        let before = base.clone();

        build(&base, "thumbnails", &namespace("default")).unwrap();

        assert_eq!(base, before);
    }

    #[test]
    fn test_namespace_is_set() {
        let manifest = build(&template(), "thumbnails", &namespace("staging")).unwrap();

        assert_eq!(manifest.namespace(), Some("staging"));
    }

    #[test]
    fn test_restart_policy_defaults_to_on_failure() {
        let manifest = build(&template(), "thumbnails", &namespace("default")).unwrap();

        assert_eq!(manifest.get_str(&RESTART_POLICY_PATH), Some("OnFailure"));
    }

    #[test]
    fn test_restart_policy_is_preserved() {
        let mut base = template();
        base.set(&RESTART_POLICY_PATH, json!("Always")).unwrap();

        let manifest = build(&base, "thumbnails", &namespace("default")).unwrap();

        assert_eq!(manifest.get_str(&RESTART_POLICY_PATH), Some("Always"));
    }

    #[test]
    fn test_interval_env_is_appended() {
        let manifest = build(&template(), "thumbnails", &namespace("default")).unwrap();

        assert_eq!(
            manifest.get(&CONTAINERS_PATH).map(|c| &c[0]["env"]),
            Some(&json!([
                { "name": "QUEUE", "value": "thumbnails" },
                { "name": "INTERVAL", "value": "0" },
            ]))
        );
    }

    #[test]
    fn test_interval_env_is_overwritten() {
        let mut base = template();
        base.set(
            &["spec", "template", "spec", "containers"],
            json!([{
                "name": "worker",
                "env": [
                    { "name": "INTERVAL", "value": "5" },
                    { "name": "QUEUE", "value": "thumbnails" },
                ],
            }]),
        )
        .unwrap();

        let manifest = build(&base, "thumbnails", &namespace("default")).unwrap();

        assert_eq!(
            manifest.get(&CONTAINERS_PATH).map(|c| &c[0]["env"]),
            Some(&json!([
                { "name": "INTERVAL", "value": "0" },
                { "name": "QUEUE", "value": "thumbnails" },
            ]))
        );
    }

    #[test]
    fn test_duplicate_interval_env_all_overwritten() {
        let mut base = template();
        base.set(
            &["spec", "template", "spec", "containers"],
            json!([{
                "name": "worker",
                "env": [
                    { "name": "INTERVAL", "value": "5" },
                    { "name": "QUEUE", "value": "thumbnails" },
                    { "name": "INTERVAL", "value": "7" },
                ],
            }]),
        )
        .unwrap();

        let manifest = build(&base, "thumbnails", &namespace("default")).unwrap();

        assert_eq!(
            manifest.get(&CONTAINERS_PATH).map(|c| &c[0]["env"]),
            Some(&json!([
                { "name": "INTERVAL", "value": "0" },
                { "name": "QUEUE", "value": "thumbnails" },
                { "name": "INTERVAL", "value": "0" },
            ]))
        );
    }

    #[test]
    fn test_interval_env_from_reference_is_replaced() {
        let mut base = template();
        base.set(
            &["spec", "template", "spec", "containers"],
            json!([{
                "name": "worker",
                "env": [{
                    "name": "INTERVAL",
                    "valueFrom": { "configMapKeyRef": { "name": "worker", "key": "interval" } },
                }],
            }]),
        )
        .unwrap();

        let manifest = build(&base, "thumbnails", &namespace("default")).unwrap();

        assert_eq!(
            manifest.get(&CONTAINERS_PATH).map(|c| &c[0]["env"]),
            Some(&json!([{ "name": "INTERVAL", "value": "0" }]))
        );
    }

    #[test]
    fn test_interval_env_only_on_first_container() {
        let mut base = template();
        base.set(
            &["spec", "template", "spec", "containers"],
            json!([{ "name": "worker" }, { "name": "sidecar" }]),
        )
        .unwrap();

        let manifest = build(&base, "thumbnails", &namespace("default")).unwrap();
        let containers = manifest.get(&CONTAINERS_PATH).unwrap();

        assert_eq!(
            containers[0]["env"],
            json!([{ "name": "INTERVAL", "value": "0" }])
        );
        assert!(containers[1].get("env").is_none());
    }

    #[test]
    fn test_missing_containers() {
        let base = Manifest::new(json!({ "metadata": { "name": "thumbnails" } }));

        let err = build(&base, "thumbnails", &namespace("default")).unwrap_err();

        assert!(
            matches!(err, MalformedManifestError::MissingField(ref path) if path == "spec.template.spec.containers")
        );
    }

    #[test]
    fn test_empty_containers() {
        let mut base = template();
        base.set(&CONTAINERS_PATH, json!([])).unwrap();

        let err = build(&base, "thumbnails", &namespace("default")).unwrap_err();

        assert!(matches!(err, MalformedManifestError::NoContainers));
    }
}
