//! Process-wide XMP namespace registry
//!
//! Maps namespace URIs to the prefixes used when serializing. Registration is
//! idempotent and safe from any thread.

use std::{
    collections::HashMap,
    sync::{LazyLock, RwLock},
};

/// `x:` namespace of the `x:xmpmeta` wrapper element
pub const ADOBE_META_NAMESPACE: &str = "adobe:ns:meta/";
/// RDF syntax namespace
pub const RDF_NAMESPACE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
/// Dublin Core
pub const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
/// XMP basic
pub const XMP_NAMESPACE: &str = "http://ns.adobe.com/xap/1.0/";
/// XMP media management
pub const XMP_MM_NAMESPACE: &str = "http://ns.adobe.com/xap/1.0/mm/";
/// XMP note, home of `HasExtendedXMP`
pub const XMP_NOTE_NAMESPACE: &str = "http://ns.adobe.com/xmp/note/";
/// Google panorama
pub const GPANO_NAMESPACE: &str = "http://ns.google.com/photos/1.0/panorama/";

/// Property linking a standard packet to its extended XMP GUID
pub const HAS_EXTENDED_XMP: &str = "HasExtendedXMP";

#[derive(Debug, Default)]
struct Registry {
    prefix_by_uri: HashMap<String, String>,
    uri_by_prefix: HashMap<String, String>,
}

impl Registry {
    fn insert(&mut self, uri: &str, suggested_prefix: &str) -> String {
        if let Some(prefix) = self.prefix_by_uri.get(uri) {
            return prefix.clone();
        }

        let mut prefix = suggested_prefix.to_string();
        let mut n = 1;
        while self.uri_by_prefix.contains_key(&prefix) {
            prefix = format!("{}_{}", suggested_prefix, n);
            n += 1;
        }

        self.prefix_by_uri.insert(uri.to_string(), prefix.clone());
        self.uri_by_prefix.insert(prefix.clone(), uri.to_string());
        prefix
    }
}

static REGISTRY: LazyLock<RwLock<Registry>> = LazyLock::new(|| {
    let mut registry = Registry::default();
    for (uri, prefix) in [
        (ADOBE_META_NAMESPACE, "x"),
        (RDF_NAMESPACE, "rdf"),
        (DC_NAMESPACE, "dc"),
        (XMP_NAMESPACE, "xmp"),
        (XMP_MM_NAMESPACE, "xmpMM"),
    ] {
        registry.insert(uri, prefix);
    }
    RwLock::new(registry)
});

/// Register `uri` under `suggested_prefix`, returning the prefix bound to it
///
/// An already registered URI keeps its prefix. If the suggested prefix is
/// taken by another URI, a numbered variant (`prefix_1`, ...) is used.
pub fn register_namespace(uri: &str, suggested_prefix: &str) -> String {
    let mut registry = REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    registry.insert(uri, suggested_prefix)
}

/// Prefix registered for `uri`
pub fn namespace_prefix(uri: &str) -> Option<String> {
    let registry = REGISTRY.read().unwrap_or_else(|e| e.into_inner());
    registry.prefix_by_uri.get(uri).cloned()
}

/// URI registered for `prefix`
pub fn namespace_uri(prefix: &str) -> Option<String> {
    let registry = REGISTRY.read().unwrap_or_else(|e| e.into_inner());
    registry.uri_by_prefix.get(prefix).cloned()
}

/// Check if `uri` has a registered prefix
pub fn is_namespace_registered(uri: &str) -> bool {
    namespace_prefix(uri).is_some()
}

/// Register the namespaces this crate writes (`xmpNote`, `GPano`)
///
/// Every public operation calls this first; calling it again is harmless.
pub fn init() {
    register_namespace(GPANO_NAMESPACE, "GPano");
    register_namespace(XMP_NOTE_NAMESPACE, "xmpNote");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        assert_eq!(namespace_prefix(RDF_NAMESPACE).as_deref(), Some("rdf"));
        assert_eq!(namespace_uri("dc").as_deref(), Some(DC_NAMESPACE));
    }

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        assert_eq!(namespace_prefix(XMP_NOTE_NAMESPACE).as_deref(), Some("xmpNote"));
        assert_eq!(namespace_prefix(GPANO_NAMESPACE).as_deref(), Some("GPano"));
    }

    #[test]
    fn test_registration_keeps_first_prefix() {
        let uri = "http://example.com/ns/keep/";
        assert_eq!(register_namespace(uri, "keepA"), "keepA");
        assert_eq!(register_namespace(uri, "keepB"), "keepA");
    }

    #[test]
    fn test_prefix_collision_gets_suffix() {
        let first = "http://example.com/ns/collide/1/";
        let second = "http://example.com/ns/collide/2/";
        assert_eq!(register_namespace(first, "collide"), "collide");
        assert_eq!(register_namespace(second, "collide"), "collide_1");
        assert_eq!(namespace_uri("collide_1").as_deref(), Some(second));
    }

    #[test]
    fn test_concurrent_registration() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(init))
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(namespace_prefix(XMP_NOTE_NAMESPACE).as_deref(), Some("xmpNote"));
    }
}
