//! Behavioral and property tests for reqlog-masking.

use proptest::prelude::*;
use reqlog_core::config::SensitiveDefaults;
use reqlog_core::record::HeaderValues;
use reqlog_masking::registry::{SENSITIVE_BODY_SIGNAL, SENSITIVE_COOKIES_SIGNAL, SENSITIVE_HEADERS_SIGNAL};
use reqlog_masking::{EMPTY_BODY, MASK_TOKEN, MaskingEngine, RouteFilter, SensitiveFieldRegistry, truncate};
use serde_json::{Value, json};
use std::collections::BTreeMap;

// =============================================================================
// Helper Functions
// =============================================================================

fn signals(pairs: &[(&str, &str)]) -> HeaderValues {
    let mut map: HeaderValues = BTreeMap::new();
    for (k, v) in pairs {
        map.entry(k.to_string()).or_default().push(v.to_string());
    }
    map
}

fn registry() -> SensitiveFieldRegistry {
    SensitiveFieldRegistry::new(&SensitiveDefaults::default())
}

// =============================================================================
// End-to-end masking
// =============================================================================

#[test]
fn nested_body_paths_are_masked_and_siblings_kept() {
    let spec = registry().build(&signals(&[(
        SENSITIVE_BODY_SIGNAL,
        r#"["password", "person.sensitive_data", "something.very.nested", "secret_array", "this_key.does_not.exist"]"#,
    )]));
    let body = json!({
        "password": "12345678",
        "person": {"sensitive_data": "secret", "insensitive_data": "not secret"},
        "something": {"very": {"nested": "should not see"}},
        "secret_array": {"of": "stuff"},
        "public": [1, 2, 3]
    })
    .to_string();

    let masked = MaskingEngine::new(&spec).mask_body(&body).unwrap();
    let v: Value = serde_json::from_str(&masked).unwrap();
    assert_eq!(v["password"], MASK_TOKEN);
    assert_eq!(v["person"]["sensitive_data"], MASK_TOKEN);
    assert_eq!(v["person"]["insensitive_data"], "not secret");
    assert_eq!(v["something"]["very"]["nested"], MASK_TOKEN);
    assert_eq!(v["secret_array"], MASK_TOKEN);
    assert_eq!(v["public"], json!([1, 2, 3]));
    assert!(v.get("this_key").is_none());
}

#[test]
fn default_token_query_key_is_masked_without_declaration() {
    let spec = registry().build(&BTreeMap::new());
    let out = MaskingEngine::new(&spec).mask_query_string("token=very-secret&cake=not-secret");
    assert_eq!(out, r#"{"token":"[ MASKED ]","cake":"not-secret"}"#);
}

#[test]
fn authorization_is_masked_by_default() {
    let spec = registry().build(&BTreeMap::new());
    let mut headers: HeaderValues = BTreeMap::new();
    headers.insert("authorization".into(), vec!["Bearer abc".into()]);
    headers.insert("accept".into(), vec!["*/*".into()]);
    let masked = MaskingEngine::new(&spec).mask_headers(&headers);
    assert_eq!(masked["authorization"], vec![MASK_TOKEN.to_string()]);
    assert_eq!(masked["accept"], vec!["*/*".to_string()]);
}

#[test]
fn declared_header_and_cookie_are_masked() {
    let spec = registry().build(&signals(&[
        (SENSITIVE_HEADERS_SIGNAL, r#"["x-encrypt-this-header"]"#),
        (SENSITIVE_COOKIES_SIGNAL, r#"["SECRET_COOKIE"]"#),
    ]));
    let engine = MaskingEngine::new(&spec);

    let mut headers: HeaderValues = BTreeMap::new();
    headers.insert(
        "x-encrypt-this-header".into(),
        vec!["This is a secret header".into(), "And we define it twice".into()],
    );
    let masked = engine.mask_headers(&headers);
    assert_eq!(masked["x-encrypt-this-header"].len(), 2);
    assert!(masked["x-encrypt-this-header"].iter().all(|v| v == MASK_TOKEN));

    let mut jar = BTreeMap::new();
    jar.insert("SECRET_COOKIE".to_string(), "abcd".to_string());
    jar.insert("NON_SECRET_COOKIE".to_string(), "efgh".to_string());
    let jar = engine.mask_cookies(&jar);
    assert_eq!(jar["SECRET_COOKIE"], MASK_TOKEN);
    assert_eq!(jar["NON_SECRET_COOKIE"], "efgh");
}

#[test]
fn malformed_signal_masks_only_defaults() {
    let spec = registry().build(&signals(&[(SENSITIVE_BODY_SIGNAL, "{not json")]));
    let body = r#"{"password":"12345678"}"#;
    assert_eq!(MaskingEngine::new(&spec).mask_body(body).as_deref(), Some(body));
}

#[test]
fn blacklist_filter_from_config_patterns() {
    let filter = RouteFilter::new(&["test/*".to_string(), "/health".to_string()]);
    assert!(filter.is_blacklisted("/test/abc"));
    assert!(filter.is_blacklisted("/health"));
    assert!(!filter.is_blacklisted("/test/abc/def"));
}

#[test]
fn empty_body_placeholder() {
    assert_eq!(EMPTY_BODY, "{}");
}

// =============================================================================
// Properties
// =============================================================================

fn arb_key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}"
}

proptest! {
    /// Output is the first `min(limit, len)` characters of the input.
    #[test]
    fn truncate_respects_limit(text in "\\PC{0,300}", limit in 1i64..200) {
        let out = truncate(&text, limit);
        let expected = text.chars().count().min(limit as usize);
        prop_assert_eq!(out.chars().count(), expected);
        prop_assert!(text.starts_with(out.as_ref()));
    }

    /// Non-positive limits leave the text alone.
    #[test]
    fn truncate_disabled_is_identity(text in "\\PC{0,100}", limit in -50i64..=0) {
        let out = truncate(&text, limit);
        prop_assert_eq!(out.as_ref(), text.as_str());
    }

    /// Masking twice with the same spec equals masking once.
    #[test]
    fn body_masking_is_idempotent(
        fields in prop::collection::btree_map(arb_key(), "[a-z]{0,6}", 1..8),
        pick in 0usize..8,
    ) {
        let keys: Vec<&String> = fields.keys().collect();
        let declared = keys[pick % keys.len()].clone();
        let declaration = serde_json::to_string(&vec![declared.clone()]).unwrap();
        let spec = registry().build(&signals(&[(SENSITIVE_BODY_SIGNAL, declaration.as_str())]));
        let engine = MaskingEngine::new(&spec);
        let body = serde_json::to_string(&fields).unwrap();

        let once = engine.mask_body(&body).unwrap();
        let twice = engine.mask_body(&once).unwrap();
        prop_assert_eq!(&once, &twice);

        let v: Value = serde_json::from_str(&once).unwrap();
        prop_assert_eq!(&v[declared.as_str()], &Value::String(MASK_TOKEN.to_string()));
    }

    /// No declared value survives in the query rendering.
    #[test]
    fn query_masking_hides_sensitive_values(secret in "[a-z0-9]{12,20}", other in "[a-z]{1,6}") {
        let spec = registry().build(&BTreeMap::new());
        let out = MaskingEngine::new(&spec)
            .mask_query_string(&format!("token={secret}&other={other}"));
        prop_assert!(!out.contains(&secret));
        let v: Value = serde_json::from_str(&out).unwrap();
        prop_assert_eq!(&v["other"], &Value::String(other));
    }
}
