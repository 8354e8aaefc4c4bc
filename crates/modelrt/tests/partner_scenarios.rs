//! End-to-end scenarios against a hand-declared `m.partner` model.
//!
//! There is no code generator in this workspace, so these tests stand in
//! for what one would emit: one `register_model` call, one base/override
//! pair per business method, and one compute method per computed field,
//! wired up exactly the way a generated registrar would.

use std::rc::Rc;

use modelrt::{ComputeDescriptor, Environment, FieldSchema, ModelSchema, Record, ValueKind, Values};
use modelrt_core::{Error, RecordId, Result};

fn partner_schema() -> ModelSchema {
    let mut schema = ModelSchema::new("m.partner");
    schema.register_field(FieldSchema::new("name", ValueKind::Text, "base").required(true));
    schema.register_field(FieldSchema::new("is_company", ValueKind::Bool, "base"));
    schema.register_field(FieldSchema::new("is_customer", ValueKind::Bool, "base"));
    schema.register_field(FieldSchema::new("display_name", ValueKind::Text, "base").read_only(true));
    schema
        .register_computed_field(
            "display_name",
            ComputeDescriptor {
                is_stored: false,
                compute_method_name: "_compute_display_name".into(),
                dependencies: vec!["name".into(), "is_company".into()],
                inverse_method_name: None,
                related_path: None,
                tracking: false,
            },
        )
        .unwrap();
    schema
}

fn compute_display_name(record: Record) -> Result<()> {
    let name = record.get("name").as_text().unwrap_or_default().to_owned();
    let is_company = record.get("is_company").as_bool().unwrap_or(false);
    let mut value = name;
    if is_company {
        value.push_str(" | Company");
    }
    record.set("display_name", value)
}

/// Builds an environment with `m.partner` registered, a generic factory, and
/// the base compute method for `display_name`. `create`/`write` use the
/// generic `"model"` base pipelines installed by `Environment::new`.
fn base_env() -> Environment {
    let env = Environment::new();
    env.register_model(partner_schema());
    env.register_factory("m.partner", |env, id| {
        Rc::new(modelrt::RecordInner::new(env, modelrt::ModelToken::new("m.partner"), id))
    });
    env.register_base::<Record, Result<()>>("m.partner", "_compute_display_name", compute_display_name);
    env
}

fn model() -> modelrt::ModelToken {
    modelrt::ModelToken::new("m.partner")
}

fn create_partner(env: &Environment, name: &str, is_company: bool) -> Record {
    let mut values = env.values_for(&model()).unwrap();
    values.set("name", name);
    values.set("is_company", is_company);
    env.create("m.partner", values).unwrap()
}

#[test]
fn s1_single_create() {
    let env = base_env();
    let partner = create_partner(&env, "Alice", false);
    assert!(partner.id().get() > 0);
    assert_eq!(partner.get("name").as_text(), Some("Alice"));
    assert_eq!(partner.get("is_company").as_bool(), Some(false));
    assert_eq!(partner.get("display_name").as_text(), Some("Alice"));
}

#[test]
fn s2_company_suffix() {
    let env = base_env();
    let partner = create_partner(&env, "Acme", true);
    assert_eq!(partner.get("display_name").as_text(), Some("Acme | Company"));
}

#[test]
fn s3_diamond_extension() {
    let env = base_env();
    // Module B: adds is_supplier and extends the display_name compute.
    env.register_model({
        let mut schema = ModelSchema::new("m.partner");
        schema.register_field(FieldSchema::new("is_supplier", ValueKind::Bool, "module_b"));
        schema
    });
    env.register_override::<Record, Result<()>>(
        "m.partner",
        "_compute_display_name",
        10,
        |record: Record, next| {
            next(record.clone())?;
            if record.get("is_supplier").as_bool().unwrap_or(false) {
                let suffixed = format!("{} | Supplier", record.get("display_name").as_text().unwrap_or_default());
                record.set("display_name", suffixed)?;
            }
            Ok(())
        },
    );

    let mut values = env.values_for(&model()).unwrap();
    values.set("name", "Big");
    values.set("is_company", true);
    values.set("is_supplier", true);
    let partner = env.create("m.partner", values).unwrap();

    assert_eq!(partner.get("display_name").as_text(), Some("Big | Company | Supplier"));
}

#[test]
fn s4_batch_write() {
    let env = base_env();
    let a = create_partner(&env, "A", false);
    let b = create_partner(&env, "B", false);
    let c = create_partner(&env, "C", false);
    env.flush().unwrap(); // clear dirty state from create so the write below is isolated

    let set = env.get_records(&model(), &[a.id(), b.id(), c.id()]);
    let mut values = env.values_for(&model()).unwrap();
    values.set("is_customer", true);
    assert!(set.write(&values).unwrap());

    for record in set.iter() {
        assert_eq!(record.get("is_customer").as_bool(), Some(true));
    }
}

#[test]
fn s5_override_chain_order() {
    let engine = modelrt_pipeline::PipelineEngine::new();
    engine.register_base::<i64, i64>("m.x", "x", |_args| 1);
    engine.register_override::<i64, i64>("m.x", "x", 10, |args, next| next(args) + 10);
    engine.register_override::<i64, i64>("m.x", "x", 20, |args, next| next(args) * 2);
    let pipeline = engine.get_pipeline::<i64, i64>("m.x", "x").unwrap();
    assert_eq!(pipeline(0), 22);
}

#[test]
fn s6_protection_prevents_recursion() {
    let env = base_env();
    let partner = create_partner(&env, "Carol", false);
    env.flush().unwrap();

    // Re-derive display_name after a direct name change, the way `modified`
    // would trigger it from a write. The compute writes display_name via the
    // ordinary wrapper setter; the recompute driver holds a protecting scope
    // for that field+id so the write bypasses the pipeline instead of
    // recursing back into `write`.
    env.set_computed_value(&model(), partner.id(), "name", "Caroline".into()).unwrap();
    env.modified(&model(), partner.id(), "name").unwrap();
    assert!(env.needs_recompute(&model(), partner.id(), "display_name"));

    let result = flush_without_reentrant_write(&env);
    assert!(result.is_ok());
    assert_eq!(partner.get("display_name").as_text(), Some("Caroline"));
    assert!(!env.needs_recompute(&model(), partner.id(), "display_name"));
}

fn flush_without_reentrant_write(env: &Environment) -> Result<()> {
    match env.flush() {
        Err(Error::ReentrantWrite { .. }) => panic!("compute recursed into the write pipeline"),
        other => other,
    }
}
