use plist::Value;

use crate::material::profile::bundle_id_matches;

/// Entitlement-shaped capability map, keyed by capability name.
///
/// Targets declare the capabilities they require and provisioning profiles
/// declare the ones they grant; both use this shape.
pub type CapabilitySet = plist::Dictionary;

/// Whether `granted` satisfies every capability in `required`.
///
/// Scalars must be equal, arrays in `required` must be a subset of the
/// granted array, and dictionaries are compared recursively. A required
/// capability set to `false` imposes nothing. Granted strings ending in `*`
/// match required strings the same way wildcard bundle identifiers do.
pub fn is_compatible(required: &CapabilitySet, granted: &CapabilitySet) -> bool {
    required
        .iter()
        .all(|(key, value)| capability_satisfied(value, granted.get(key)))
}

/// The required capability names that `granted` does not satisfy, in
/// `required`'s key order.
pub fn missing_capabilities(required: &CapabilitySet, granted: &CapabilitySet) -> Vec<String> {
    required
        .iter()
        .filter(|(key, value)| !capability_satisfied(value, granted.get(key)))
        .map(|(key, _)| key.clone())
        .collect()
}

fn capability_satisfied(required: &Value, granted: Option<&Value>) -> bool {
    if is_disabled(required) {
        return true;
    }
    match granted {
        Some(granted) => value_satisfied(required, granted),
        None => false,
    }
}

fn is_disabled(value: &Value) -> bool {
    matches!(value, Value::Boolean(false))
}

fn value_satisfied(required: &Value, granted: &Value) -> bool {
    match (required, granted) {
        (Value::Dictionary(required), Value::Dictionary(granted)) => {
            is_compatible(required, granted)
        }
        (Value::Array(required), Value::Array(granted)) => required
            .iter()
            .all(|r| granted.iter().any(|g| element_satisfied(r, g))),
        // a single wildcard grant covers every requested element
        (Value::Array(required), Value::String(pattern)) if pattern.ends_with('*') => required
            .iter()
            .all(|r| element_satisfied(r, granted)),
        _ => element_satisfied(required, granted),
    }
}

fn element_satisfied(required: &Value, granted: &Value) -> bool {
    match (required, granted) {
        (Value::String(required), Value::String(granted)) => {
            required == granted || (granted.ends_with('*') && bundle_id_matches(granted, required))
        }
        (Value::Dictionary(_), Value::Dictionary(_)) | (Value::Array(_), Value::Array(_)) => {
            value_satisfied(required, granted)
        }
        _ => required == granted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(xml: &str) -> CapabilitySet {
        let doc = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><plist version="1.0">{xml}</plist>"#
        );
        plist::Value::from_reader_xml(doc.as_bytes())
            .unwrap()
            .into_dictionary()
            .unwrap()
    }

    #[test]
    fn empty_requirements_always_compatible() {
        let granted = caps("<dict><key>aps-environment</key><string>production</string></dict>");
        assert!(is_compatible(&CapabilitySet::new(), &granted));
        assert!(is_compatible(&CapabilitySet::new(), &CapabilitySet::new()));
    }

    #[test]
    fn scalars_must_match() {
        let required = caps("<dict><key>aps-environment</key><string>production</string></dict>");
        let dev = caps("<dict><key>aps-environment</key><string>development</string></dict>");
        let prod = caps("<dict><key>aps-environment</key><string>production</string></dict>");

        assert!(!is_compatible(&required, &dev));
        assert!(is_compatible(&required, &prod));
        assert_eq!(missing_capabilities(&required, &dev), vec!["aps-environment"]);
    }

    #[test]
    fn arrays_are_subsets() {
        let required = caps(
            "<dict><key>com.apple.security.application-groups</key>\
             <array><string>group.b</string><string>group.a</string></array></dict>",
        );
        let granted = caps(
            "<dict><key>com.apple.security.application-groups</key>\
             <array><string>group.a</string><string>group.b</string>\
             <string>group.c</string></array></dict>",
        );
        let too_few = caps(
            "<dict><key>com.apple.security.application-groups</key>\
             <array><string>group.a</string></array></dict>",
        );

        assert!(is_compatible(&required, &granted));
        assert!(!is_compatible(&required, &too_few));
    }

    #[test]
    fn wildcard_grants_cover_requested_values() {
        let required = caps(
            "<dict><key>keychain-access-groups</key>\
             <array><string>ABCDE12345.com.acme.shared</string></array>\
             <key>application-identifier</key><string>ABCDE12345.com.acme.app</string></dict>",
        );
        let granted = caps(
            "<dict><key>keychain-access-groups</key>\
             <array><string>ABCDE12345.*</string></array>\
             <key>application-identifier</key><string>ABCDE12345.*</string></dict>",
        );
        assert!(is_compatible(&required, &granted));

        let scalar_grant = caps(
            "<dict><key>keychain-access-groups</key><string>ABCDE12345.*</string>\
             <key>application-identifier</key><string>ABCDE12345.*</string></dict>",
        );
        assert!(is_compatible(&required, &scalar_grant));
    }

    #[test]
    fn nested_dictionaries_recurse() {
        let required = caps("<dict><key>outer</key><dict><key>inner</key><true/></dict></dict>");
        let granted = caps(
            "<dict><key>outer</key><dict><key>inner</key><true/>\
             <key>extra</key><integer>1</integer></dict></dict>",
        );
        let missing_inner =
            caps("<dict><key>outer</key><dict><key>extra</key><integer>1</integer></dict></dict>");

        assert!(is_compatible(&required, &granted));
        assert!(!is_compatible(&required, &missing_inner));
    }

    #[test]
    fn disabled_requirements_are_ignored() {
        let required = caps(
            "<dict><key>com.apple.developer.game-center</key><false/>\
             <key>push</key><true/></dict>",
        );
        let granted = caps("<dict><key>push</key><true/></dict>");

        assert!(is_compatible(&required, &granted));
    }

    #[test]
    fn type_mismatch_is_incompatible() {
        let required = caps("<dict><key>push</key><true/></dict>");
        let granted = caps("<dict><key>push</key><string>true</string></dict>");

        assert!(!is_compatible(&required, &granted));
    }
}
