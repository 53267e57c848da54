use super::FALLBACK_NAMESPACE;
use super::manifest::Manifest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceSource {
    Manifest,
    AuthContext,
    Fallback,
}

/// Namespace a single admission decision runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceContext {
    pub namespace: String,
    pub source: NamespaceSource,
}

impl NamespaceContext {
    /// Manifest value wins over the auth context, which wins over `default`.
    pub fn resolve(manifest: &Manifest, auth_context: Option<&str>) -> NamespaceContext {
        let non_empty = |ns: &&str| !ns.is_empty();
        if let Some(namespace) = manifest.namespace().filter(non_empty) {
            return NamespaceContext {
                namespace: namespace.to_string(),
                source: NamespaceSource::Manifest,
            };
        }
        if let Some(namespace) = auth_context.filter(non_empty) {
            return NamespaceContext {
                namespace: namespace.to_string(),
                source: NamespaceSource::AuthContext,
            };
        }
        NamespaceContext {
            namespace: FALLBACK_NAMESPACE.to_string(),
            source: NamespaceSource::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_manifest_namespace_wins() {
        let manifest = Manifest::new(json!({
            "metadata": { "name": "thumbnails", "namespace": "staging" }
        }));

        let ctx = NamespaceContext::resolve(&manifest, Some("space"));

        assert_eq!(ctx.namespace, "staging");
        assert_eq!(ctx.source, NamespaceSource::Manifest);
    }

    #[test]
    fn test_auth_context_namespace() {
        let manifest = Manifest::new(json!({ "metadata": { "name": "thumbnails" } }));

        let ctx = NamespaceContext::resolve(&manifest, Some("space"));

        assert_eq!(ctx.namespace, "space");
        assert_eq!(ctx.source, NamespaceSource::AuthContext);
    }

    #[test]
    fn test_fallback_namespace() {
        let manifest = Manifest::new(json!({
            "metadata": { "name": "thumbnails", "namespace": "" }
        }));

        let ctx = NamespaceContext::resolve(&manifest, None);

        assert_eq!(ctx.namespace, "default");
        assert_eq!(ctx.source, NamespaceSource::Fallback);
        assert_eq!(NamespaceContext::resolve(&manifest, Some("")).namespace, "default");
    }
}
