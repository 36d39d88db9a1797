//! The `key: value` annotation grammar.
//!
//! Annotation strings are an escape hatch for domain-specific metadata that
//! travels with types, nodes, circuits, and modules. The grammar is a
//! convention, not a schema: `key: value (, key: value)*`, whitespace
//! tolerant. Unknown keys are preserved verbatim through every round-trip;
//! lookups are best-effort and return `""` when the key is absent.

/// Producer identity of an input/output (a small party index).
pub const OWNER: &str = "owner";
/// Alternative spelling of [`OWNER`] used by some producers.
pub const PARTY: &str = "party";
/// Number of SIMD lanes of a fused node.
pub const SIMD: &str = "simd";
/// Condition-group size of a fused Mux node.
pub const COND: &str = "cond";
/// Value-group size of a fused Mux node.
pub const VAL: &str = "val";
/// Marks the constant-input operand of a binary operation.
pub const CONST: &str = "const";

/// Looks up `key` in an annotation string, returning its value or `""`.
pub fn attribute<'a>(annotations: &'a str, key: &str) -> &'a str {
    for token in annotations.split(',') {
        if let Some((k, v)) = token.split_once(':') {
            if k.trim() == key {
                return v.trim();
            }
        }
    }
    ""
}

/// Replaces the value of `key` in an annotation string, or appends the pair
/// when the key is absent. All other tokens are preserved verbatim.
pub fn set_attribute(annotations: &str, key: &str, value: &str) -> String {
    let mut tokens: Vec<String> = Vec::new();
    let mut replaced = false;
    for token in annotations.split(',') {
        if token.trim().is_empty() {
            continue;
        }
        match token.split_once(':') {
            Some((k, _)) if k.trim() == key => {
                tokens.push(format!("{key}: {value}"));
                replaced = true;
            }
            _ => tokens.push(token.trim().to_string()),
        }
    }
    if !replaced {
        tokens.push(format!("{key}: {value}"));
    }
    tokens.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_lookup_finds_value() {
        assert_eq!(attribute("owner: 2, simd: 8", "simd"), "8");
        assert_eq!(attribute("owner: 2, simd: 8", "owner"), "2");
    }

    #[test]
    fn attribute_lookup_is_whitespace_tolerant() {
        assert_eq!(attribute("  owner :  3 ", "owner"), "3");
    }

    #[test]
    fn absent_key_returns_empty() {
        assert_eq!(attribute("owner: 2", "party"), "");
        assert_eq!(attribute("", "owner"), "");
    }

    #[test]
    fn set_attribute_replaces_existing() {
        let out = set_attribute("owner: 1, simd: 4", "simd", "16");
        assert_eq!(attribute(&out, "simd"), "16");
        assert_eq!(attribute(&out, "owner"), "1");
    }

    #[test]
    fn set_attribute_appends_missing() {
        let out = set_attribute("owner: 1", "cond", "3");
        assert_eq!(attribute(&out, "cond"), "3");
        assert_eq!(attribute(&out, "owner"), "1");
    }

    #[test]
    fn unknown_keys_survive_set_attribute() {
        let out = set_attribute("vendor-hint: xyz, owner: 1", "owner", "2");
        assert_eq!(attribute(&out, "vendor-hint"), "xyz");
        assert_eq!(attribute(&out, "owner"), "2");
    }

    #[test]
    fn set_attribute_on_empty_string() {
        assert_eq!(set_attribute("", "owner", "0"), "owner: 0");
    }
}
