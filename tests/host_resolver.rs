use platform_tasks::errors::ToolErrorKind;
use platform_tasks::services::host::{AuthType, ConnectionDescriptor};
use serde_json::{Map, Value};

fn vars(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object")
}

#[test]
fn first_present_alias_wins() {
    let descriptor = ConnectionDescriptor::resolve(&vars(serde_json::json!({
        "ansible_host": "platform.example.com",
        "itential_http_user": "first",
        "platform_username": "second",
        "platform_user": "third",
        "platform_password": "secret",
    })))
    .expect("descriptor");

    assert_eq!(descriptor.host, "platform.example.com");
    assert_eq!(descriptor.username.as_deref(), Some("first"));
    assert_eq!(descriptor.password.as_deref(), Some("secret"));
}

#[test]
fn null_alias_falls_through_to_next() {
    let descriptor = ConnectionDescriptor::resolve(&vars(serde_json::json!({
        "ansible_host": "h",
        "platform_port": null,
        "platform_http_port": "3443",
    })))
    .expect("descriptor");
    assert_eq!(descriptor.port, Some(3443));
}

#[test]
fn defaults_apply_when_unset() {
    let descriptor =
        ConnectionDescriptor::resolve(&vars(serde_json::json!({"ansible_host": "h"})))
            .expect("descriptor");

    assert!(!descriptor.use_tls);
    assert!(descriptor.verify);
    assert!(!descriptor.disable_warnings);
    assert_eq!(descriptor.port, None);
    assert_eq!(descriptor.auth_type, None);
    assert!(descriptor.headers.is_empty());
    assert_eq!(descriptor.origin(), "http://h");
}

#[test]
fn missing_host_is_a_configuration_error() {
    let err = ConnectionDescriptor::resolve(&vars(serde_json::json!({
        "platform_username": "admin",
    })))
    .expect_err("host is required");

    assert_eq!(err.kind, ToolErrorKind::Configuration);
    assert!(err.message.contains("missing required property: host"));
}

#[test]
fn non_numeric_port_is_rejected() {
    let err = ConnectionDescriptor::resolve(&vars(serde_json::json!({
        "ansible_host": "h",
        "platform_port": "not-a-port",
    })))
    .expect_err("port must be an int");

    assert_eq!(err.kind, ToolErrorKind::Configuration);
    assert!(err.message.contains("platform_port"));
}

#[test]
fn out_of_range_port_is_rejected() {
    let err = ConnectionDescriptor::resolve(&vars(serde_json::json!({
        "ansible_host": "h",
        "platform_port": 70000,
    })))
    .expect_err("port out of range");
    assert_eq!(err.kind, ToolErrorKind::Configuration);
}

#[test]
fn unrecognized_host_variables_are_ignored() {
    let descriptor = ConnectionDescriptor::resolve(&vars(serde_json::json!({
        "ansible_host": "h",
        "some_unrelated_var": {"nested": true},
        "inventory_hostname": "platform",
    })))
    .expect("descriptor");
    assert_eq!(descriptor.host, "h");
}

#[test]
fn tls_headers_and_auth_type_are_coerced() {
    let descriptor = ConnectionDescriptor::resolve(&vars(serde_json::json!({
        "ansible_host": "h",
        "platform_https": "yes",
        "platform_http_verify": "no",
        "platform_http_headers": "{\"X-Tenant\": \"acme\"}",
        "platform_http_auth_type": "basic",
        "platform_http_base_path": "/api",
    })))
    .expect("descriptor");

    assert!(descriptor.use_tls);
    assert!(!descriptor.verify);
    assert_eq!(descriptor.headers.get("x-tenant").map(String::as_str), Some("acme"));
    assert_eq!(descriptor.auth_type, Some(AuthType::Basic));
    assert_eq!(descriptor.base_path.as_deref(), Some("/api"));
    assert_eq!(descriptor.origin(), "https://h");
}

#[test]
fn unknown_auth_type_is_rejected() {
    let err = ConnectionDescriptor::resolve(&vars(serde_json::json!({
        "ansible_host": "h",
        "platform_http_auth_type": "kerberos",
    })))
    .expect_err("auth type choice");
    assert_eq!(err.kind, ToolErrorKind::Configuration);
}
