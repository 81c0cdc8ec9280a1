use std::sync::Arc;

use rolecast::{delegating, CallArgs, CastingError, Client, Role, Visibility};
use serde_json::json;

/// Opt-in log output: `RUST_LOG=rolecast=debug cargo test`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn greeter() -> Arc<Role> {
    Role::builder("Greeter")
        .operation("greet", |_call| Ok(json!("hello")))
        .build()
}

fn verbose() -> Arc<Role> {
    Role::builder("Verbose")
        .operation("verbose", |call| {
            let joined = call
                .args()
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(",");
            Ok(json!(joined))
        })
        .build()
}

#[test]
fn test_cast_enables_every_role_operation() {
    init_tracing();
    let role = Role::builder("Multi")
        .operation("first", |_call| Ok(json!(1)))
        .operation("second", |_call| Ok(json!(2)))
        .build();

    let client = Client::new("client");
    assert!(!client.responds_to("first"));
    assert!(!client.responds_to("second"));

    client.cast(role).unwrap();
    assert!(client.responds_to("first"));
    assert!(client.responds_to("second"));
    assert_eq!(client.perform("first", CallArgs::new()).unwrap(), json!(1));
    assert_eq!(client.perform("second", CallArgs::new()).unwrap(), json!(2));
}

#[test]
fn test_cast_then_uncast_restores_the_previous_capabilities() {
    let client = Client::new("client");
    let before = client.responds_to("greet");

    client.cast(greeter()).unwrap();
    client.uncast_one().unwrap();

    assert_eq!(client.responds_to("greet"), before);
}

#[test]
fn test_nested_casts_shed_most_recent_first() {
    let client = Client::new("client");
    client.cast(greeter()).unwrap();
    client.cast(verbose()).unwrap();

    client.uncast_one().unwrap();
    assert!(client.responds_to("greet"));
    assert!(!client.responds_to("verbose"));

    client.uncast_one().unwrap();
    assert!(!client.responds_to("greet"));
}

#[test]
fn test_self_delegation_is_always_rejected() {
    let client = Client::new("client");

    assert!(matches!(
        client.cast(&client),
        Err(CastingError::InvalidAttendant { .. })
    ));
    assert!(matches!(
        client.delegate("greet", &client, CallArgs::new()),
        Err(CastingError::InvalidAttendant { .. })
    ));
}

#[test]
fn test_delegating_block_restores_unconditionally() {
    let jim = Client::new("jim");

    assert!(matches!(
        jim.perform("greet", CallArgs::new()),
        Err(CastingError::UnknownOperation { .. })
    ));

    let greeting = delegating([(Arc::clone(&jim), greeter().into())], || {
        jim.perform("greet", CallArgs::new())
    })
    .unwrap()
    .unwrap();
    assert_eq!(greeting, json!("hello"));

    assert!(matches!(
        jim.perform("greet", CallArgs::new()),
        Err(CastingError::UnknownOperation { .. })
    ));
}

#[test]
fn test_call_arguments_override_with_arguments() {
    let jim = Client::new("jim");
    let delegation = jim
        .delegation("verbose")
        .to(verbose())
        .unwrap()
        .with(CallArgs::new().arg("a").arg("b"));

    assert_eq!(
        delegation.call_with(CallArgs::new().arg("x").arg("y")).unwrap(),
        json!("x,y")
    );
    assert_eq!(delegation.call().unwrap(), json!("a,b"));
}

#[test]
fn test_object_attendants_share_role_behavior_without_identity() {
    let greeter = greeter();
    let amy = Client::builder("amy").include_role(&greeter).build();
    let jim = Client::new("jim");

    // jim borrows greet from amy; the binder resolves it back to the
    // Greeter role and runs it against jim.
    jim.cast(&amy).unwrap();
    assert_eq!(jim.perform("greet", CallArgs::new()).unwrap(), json!("hello"));
}

#[test]
fn test_type_defined_operations_never_move_between_receivers() {
    let unrelated = Client::builder("unrelated")
        .native("class_defined", |_call| Ok(json!("oops!")))
        .build();
    let jim = Client::new("jim");

    let err = jim
        .delegate("class_defined", &unrelated, CallArgs::new())
        .unwrap_err();
    assert!(matches!(err, CastingError::TypeMismatch { .. }));
}

#[test]
fn test_capability_introspection_tracks_the_live_stack() {
    let client = Client::new("client");
    let role = Role::builder("Greeter")
        .operation("greet", |_call| Ok(json!("hello")))
        .operation_with("psst", Visibility::Private, |_call| Ok(json!("secret")))
        .build();

    client.cast(role).unwrap();
    assert!(client.responds_to("greet"));
    // Private operations are invisible to anonymous dispatch.
    assert!(!client.responds_to("psst"));
    assert!(client.delegated_operations(true).contains("psst"));

    client.uncast_one().unwrap();
    assert!(!client.responds_to("greet"));
}
