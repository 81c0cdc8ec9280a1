use std::sync::Arc;

use rolecast::{CallArgs, CastingError, Client, Context, Role, Value};
use serde_json::json;

fn admin_role() -> Arc<Role> {
    Role::builder("Admin")
        .operation("say", |call| Ok(call.arg(0).cloned().unwrap_or(Value::Null)))
        .build()
}

#[test]
fn test_context_role_resolution() {
    let admin = Client::new("A");
    let user = Client::new("U");
    let context = Context::builder("Approval")
        .define("Admin", admin_role())
        .participant("admin", &admin)
        .participant("user", &user)
        .build();

    context.with_active(|ctx| {
        assert_eq!(
            ctx.tell("admin", "say", CallArgs::new().arg("I approve")).unwrap(),
            json!("I approve")
        );

        let err = ctx.tell("user", "say", CallArgs::new().arg("hi")).unwrap_err();
        match err {
            CastingError::UnknownRoleOperation { operation, .. } => {
                assert_eq!(operation, "say")
            }
            other => panic!("expected UnknownRoleOperation, got {other}"),
        }
    });
}

#[test]
fn test_nested_contexts_shadow_and_restore() {
    let admin = Client::new("A");

    let outer = Context::builder("Outer")
        .define(
            "Admin",
            Role::builder("Admin")
                .operation("whoami", |_call| Ok(json!("outer")))
                .build(),
        )
        .participant("admin", &admin)
        .build();

    let inner = Context::builder("Inner")
        .define(
            "Admin",
            Role::builder("Admin")
                .operation("whoami", |_call| Ok(json!("inner")))
                .build(),
        )
        .participant("admin", &admin)
        .participant("parent", outer.as_client())
        .build();

    outer.with_active(|outer| {
        assert_eq!(
            outer.tell("admin", "whoami", CallArgs::new()).unwrap(),
            json!("outer")
        );

        inner.with_active(|inner| {
            assert_eq!(
                inner.tell("admin", "whoami", CallArgs::new()).unwrap(),
                json!("inner")
            );
            // The outer context is a registered participant of the inner
            // one, so telling through it stays valid and resolves in the
            // currently visible context.
            assert_eq!(
                outer.tell("admin", "whoami", CallArgs::new()).unwrap(),
                json!("inner")
            );
        });

        // The inner use case concluded; the outer context is visible again.
        assert_eq!(
            outer.tell("admin", "whoami", CallArgs::new()).unwrap(),
            json!("outer")
        );
    });
}

#[test]
fn test_shadowed_context_without_membership_cannot_tell() {
    let admin = Client::new("A");
    let outer = Context::builder("Outer")
        .define("Admin", admin_role())
        .participant("admin", &admin)
        .build();
    let inner = Context::builder("Inner").build();

    outer.with_active(|outer| {
        inner.with_active(|_inner| {
            let err = outer
                .tell("admin", "say", CallArgs::new().arg("hi"))
                .unwrap_err();
            assert!(matches!(err, CastingError::ForeignCaller { .. }));
        });
    });
}

fn source_role() -> Arc<Role> {
    Role::builder("Source")
        .operation("transfer", |call| {
            let amount = call.arg(0).and_then(Value::as_i64).unwrap_or(0);
            let balance = call
                .subject()
                .get("balance")
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            if balance < amount {
                return Ok(json!("insufficient funds"));
            }
            call.subject()
                .update("balance", |_| json!(balance - amount))?;
            call.tell("destination", "deposit", CallArgs::new().arg(amount))?;
            Ok(json!("transferred"))
        })
        .build()
}

fn destination_role() -> Arc<Role> {
    Role::builder("Destination")
        .operation("deposit", |call| {
            let amount = call.arg(0).and_then(Value::as_i64).unwrap_or(0);
            call.subject().update("balance", |current| {
                json!(current.and_then(Value::as_i64).unwrap_or(0) + amount)
            })
        })
        .build()
}

/// The classic money-transfer use case: data objects hold balances, the
/// behavior lives entirely in context-scoped roles.
#[test]
fn test_transfer_use_case() {
    let checking = Client::builder("checking").state("balance", 500).build();
    let savings = Client::builder("savings").state("balance", 2).build();

    let transfer = Context::builder("Transfer")
        .define("Source", source_role())
        .define("Destination", destination_role())
        .participant("source", &checking)
        .participant("destination", &savings)
        .build();

    let outcome =
        transfer.with_active(|ctx| ctx.tell("source", "transfer", CallArgs::new().arg(30)));
    assert_eq!(outcome.unwrap(), json!("transferred"));
    assert_eq!(checking.get("balance"), Some(json!(470)));
    assert_eq!(savings.get("balance"), Some(json!(32)));

    // The reverse transfer exceeds the savings balance and changes nothing.
    let reverse = Context::builder("Transfer")
        .define("Source", source_role())
        .define("Destination", destination_role())
        .participant("source", &savings)
        .participant("destination", &checking)
        .build();

    let outcome =
        reverse.with_active(|ctx| ctx.tell("source", "transfer", CallArgs::new().arg(50)));
    assert_eq!(outcome.unwrap(), json!("insufficient funds"));
    assert_eq!(checking.get("balance"), Some(json!(470)));
    assert_eq!(savings.get("balance"), Some(json!(32)));
}

#[test]
fn test_roles_survive_only_for_their_use_case() {
    let checking = Client::builder("checking").state("balance", 100).build();
    let savings = Client::builder("savings").state("balance", 0).build();

    {
        let transfer = Context::builder("Transfer")
            .define("Source", source_role())
            .define("Destination", destination_role())
            .participant("source", &checking)
            .participant("destination", &savings)
            .build();
        transfer
            .with_active(|ctx| ctx.tell("source", "transfer", CallArgs::new().arg(10)))
            .unwrap();
    }

    // Outside any context the accounts are plain data again.
    assert!(rolecast::current_context().is_none());
    assert!(!checking.responds_to("transfer"));
    assert!(matches!(
        checking.perform("transfer", CallArgs::new().arg(1)),
        Err(CastingError::UnknownOperation { .. })
    ));
}
