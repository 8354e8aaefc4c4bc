//! The environment facade: binds store, identity map, compute tracker, and
//! protection scope to an acting user, and exposes the operations
//! collaborators (and the demo scenarios) call.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use modelrt_core::{Error, FieldTokenId, FieldValue, ModelToken, ModelTokenId, RecordId, Result};
use modelrt_pipeline::PipelineEngine;
use modelrt_schema::{ComputeDescriptor, ModelSchema, SchemaRegistry};
use modelrt_session::{ComputeTracker, IdentityMap, ProtectionMap, recompute_pending};
use modelrt_store::Store;

use crate::handler;
use crate::record::{Record, RecordInner, RecordSet};
use crate::values::Values;

type PersistHook = dyn FnMut(&str, &[RecordId], &[HashMap<String, FieldValue>]);

struct Shared {
    schema: RefCell<SchemaRegistry<Environment, Record>>,
    pipeline: PipelineEngine,
    persist: RefCell<Option<Box<PersistHook>>>,
}

struct Cache {
    store: Store,
    identity: IdentityMap<Record>,
    compute: ComputeTracker,
    protection: ProtectionMap,
    next_id: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            store: Store::new(),
            identity: IdentityMap::new(),
            compute: ComputeTracker::new(),
            protection: ProtectionMap::new(),
            next_id: 0,
        }
    }
}

/// A scoped, single-threaded runtime binding. Cheap to clone: clones share
/// the schema/pipeline (built once per process) and, unless derived via
/// `with_new_cache`, the store and trackers too.
#[derive(Clone)]
pub struct Environment {
    shared: Rc<Shared>,
    cache: Rc<RefCell<Cache>>,
    user: Rc<str>,
}

impl Environment {
    #[must_use]
    pub fn new() -> Self {
        let env = Self {
            shared: Rc::new(Shared {
                schema: RefCell::new(SchemaRegistry::new()),
                pipeline: PipelineEngine::new(),
                persist: RefCell::new(None),
            }),
            cache: Rc::new(RefCell::new(Cache::default())),
            user: Rc::from("default"),
        };
        register_generic_bases(&env);
        env
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Derives a sibling sharing the store and trackers but acting as a
    /// different user.
    #[must_use]
    pub fn with_user(&self, user: &str) -> Self {
        Self {
            shared: self.shared.clone(),
            cache: self.cache.clone(),
            user: Rc::from(user),
        }
    }

    /// Derives a sibling with a fresh store and fresh trackers; schema and
    /// pipeline registrations (built once per process) are still shared.
    #[must_use]
    pub fn with_new_cache(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            cache: Rc::new(RefCell::new(Cache::default())),
            user: self.user.clone(),
        }
    }

    pub fn register_model(&self, schema: ModelSchema) {
        self.shared.schema.borrow_mut().register_model(schema);
    }

    pub fn register_computed_field(&self, model: &str, field: &str, compute: ComputeDescriptor) -> Result<()> {
        self.shared.schema.borrow_mut().register_computed_field(model, field, compute)
    }

    pub fn register_factory(&self, model: &str, factory: impl Fn(Environment, RecordId) -> Record + Send + Sync + 'static) {
        self.shared.schema.borrow_mut().register_factory(model, Arc::new(factory));
    }

    pub fn register_base<Args, Ret>(&self, model: &str, method: &str, base: impl Fn(Args) -> Ret + Send + Sync + 'static)
    where
        Args: 'static,
        Ret: 'static,
    {
        self.shared.pipeline.register_base(model, method, base);
    }

    pub fn register_override<Args, Ret>(
        &self,
        model: &str,
        method: &str,
        priority: i64,
        over: impl Fn(Args, modelrt_pipeline::PipelineFn<Args, Ret>) -> Ret + Send + Sync + 'static,
    ) where
        Args: 'static,
        Ret: 'static,
    {
        self.shared.pipeline.register_override(model, method, priority, over);
    }

    pub fn set_persist_hook(&self, hook: impl FnMut(&str, &[RecordId], &[HashMap<String, FieldValue>]) + 'static) {
        *self.shared.persist.borrow_mut() = Some(Box::new(hook));
    }

    fn model_schema(&self, model: &ModelToken) -> Result<ModelSchema> {
        let name = model.name().unwrap_or_default();
        self.shared
            .schema
            .borrow()
            .get_model(name)
            .cloned()
            .ok_or_else(|| Error::UnknownModel { model: name.to_owned() })
    }

    pub fn values_for(&self, model: &ModelToken) -> Result<Values> {
        Ok(Values::new(&self.model_schema(model)?))
    }

    /// Reads a field, running its compute first if one is pending. A
    /// non-stored computed field otherwise would never settle to a correct
    /// value until the next `flush`; resolving it lazily on read matches
    /// how a wrapper's getter is expected to behave. Compute failures are
    /// swallowed here (this method never throws, by contract) and surface
    /// instead the next time the field is read through a path that does
    /// propagate errors, e.g. `flush`'s own `recompute_pending`.
    #[must_use]
    pub fn read_field(&self, model: &ModelToken, id: RecordId, field: &str) -> FieldValue {
        let Ok(schema) = self.model_schema(model) else {
            return FieldValue::Null;
        };
        let Some(field_schema) = schema.field(field) else {
            return FieldValue::Null;
        };
        let model_id = ModelTokenId::from(model);
        let field_id = FieldTokenId::from(&field_schema.token);
        if self.cache.borrow().compute.needs_recompute(model_id, id, field_id) {
            let _ = self.run_one_compute(model_id, id, field_id);
        }
        self.cache.borrow().store.get(model_id, field_id, id)
    }

    #[must_use]
    pub fn is_protected(&self, model: &ModelToken, id: RecordId, field: &str) -> bool {
        let Ok(schema) = self.model_schema(model) else {
            return false;
        };
        let Some(field_schema) = schema.field(field) else {
            return false;
        };
        self.cache
            .borrow()
            .protection
            .is_protected(FieldTokenId::from(&field_schema.token), id)
    }

    #[must_use]
    pub fn protecting(&self, model: &ModelToken, fields: &[&str], ids: &[RecordId]) -> Option<modelrt_session::ProtectionScope> {
        let schema = self.model_schema(model).ok()?;
        let tokens: Vec<FieldTokenId> = fields
            .iter()
            .filter_map(|f| schema.field(f).map(|fs| FieldTokenId::from(&fs.token)))
            .collect();
        Some(self.cache.borrow().protection.protecting(tokens, ids.to_vec()))
    }

    /// Whether `(model, id, field)` is currently queued for recompute.
    #[must_use]
    pub fn needs_recompute(&self, model: &ModelToken, id: RecordId, field: &str) -> bool {
        let Ok(schema) = self.model_schema(model) else {
            return false;
        };
        let Some(field_schema) = schema.field(field) else {
            return false;
        };
        self.cache.borrow().compute.needs_recompute(
            ModelTokenId::from(model),
            id,
            FieldTokenId::from(&field_schema.token),
        )
    }

    pub fn set_computed_value(&self, model: &ModelToken, id: RecordId, field: &str, value: FieldValue) -> Result<()> {
        let schema = self.model_schema(model)?;
        let field_schema = schema.field(field).ok_or_else(|| Error::UnknownField {
            model: schema.name.clone(),
            field: field.to_owned(),
        })?;
        let token = FieldTokenId::from(&field_schema.token);
        let mut cache = self.cache.borrow_mut();
        cache.store.set(ModelTokenId::from(model), token, id, value);
        cache.compute.clear_recompute(ModelTokenId::from(model), id, token);
        Ok(())
    }

    pub fn modified(&self, model: &ModelToken, id: RecordId, field: &str) -> Result<()> {
        let schema = self.model_schema(model)?;
        let field_schema = schema.field(field).ok_or_else(|| Error::UnknownField {
            model: schema.name.clone(),
            field: field.to_owned(),
        })?;
        {
            let mut cache = self.cache.borrow_mut();
            cache
                .store
                .mark_dirty(ModelTokenId::from(model), id, FieldTokenId::from(&field_schema.token));
        }
        for (dep_model, dep_field) in self.shared.schema.borrow().get_dependents(&schema.name, field) {
            let dep_schema = self.model_schema(&ModelToken::new(&dep_model))?;
            let dep_token = dep_schema
                .field(&dep_field)
                .ok_or_else(|| Error::UnknownField {
                    model: dep_model.clone(),
                    field: dep_field.clone(),
                })?
                .token
                .clone();
            self.cache.borrow_mut().compute.mark_to_recompute(
                ModelTokenId::from(&ModelToken::new(&dep_model)),
                id,
                FieldTokenId::from(&dep_token),
            );
        }
        Ok(())
    }

    /// Looks up (or builds) the wrapper for `(model, id)`. Unlike `create`,
    /// a missing factory here is not an error: `get_record` is also how
    /// already-existing rows (seeded directly into the store, or written by
    /// an id a caller already holds) get a handle, so it falls back to a
    /// bare wrapper instead of requiring every model to register a factory.
    #[must_use]
    pub fn get_record(&self, model: &ModelToken, id: RecordId) -> Record {
        let name = model.name().unwrap_or_default().to_owned();
        let model_id = ModelTokenId::from(model);
        let env = self.clone();
        let model_clone = model.clone();
        let mut cache = self.cache.borrow_mut();
        if let Some(existing) = cache.identity.get(model_id, id) {
            return existing;
        }
        drop(cache);
        let factory = self.shared.schema.borrow().get_factory(&name).ok().cloned();
        let record = match factory {
            Some(factory) => factory(env, id),
            None => Rc::new(RecordInner::new(env, model_clone, id)),
        };
        self.cache.borrow_mut().identity.register(model_id, id, record.clone());
        record
    }

    #[must_use]
    pub fn get_records(&self, model: &ModelToken, ids: &[RecordId]) -> RecordSet {
        RecordSet {
            env: self.clone(),
            model: model.clone(),
            ids: ids.to_vec(),
        }
    }

    /// Allocates an id, registers the wrapper, and routes through the
    /// `"create"` pipeline.
    pub fn create(&self, model_name: &str, values: Values) -> Result<Record> {
        let model = ModelToken::new(model_name);
        self.model_schema(&model)?;
        self.shared
            .schema
            .borrow()
            .get_factory(model_name)
            .map_err(|_| Error::NoFactory {
                model: model_name.to_owned(),
            })?;
        let id = {
            let mut cache = self.cache.borrow_mut();
            cache.next_id += 1;
            RecordId(cache.next_id)
        };
        let args = CreateArgs {
            env: self.clone(),
            model: model.clone(),
            id,
            values,
        };
        let pipeline = self
            .shared
            .pipeline
            .get_pipeline::<CreateArgs, Result<()>>(model_name, "create")?;
        pipeline(args)?;
        tracing::debug!(model = model_name, id = id.get(), "created record");
        Ok(self.get_record(&model, id))
    }

    /// Routes through the `"write"` pipeline; returns whether it ran.
    pub fn write(&self, model: &ModelToken, ids: &[RecordId], values: &Values) -> Result<bool> {
        let name = model.name().unwrap_or_default().to_owned();
        let args = WriteArgs {
            env: self.clone(),
            model: model.clone(),
            ids: ids.to_vec(),
            values: values.clone(),
        };
        let pipeline = self
            .shared
            .pipeline
            .get_pipeline::<WriteArgs, Result<bool>>(&name, "write")?;
        tracing::debug!(model = name, count = ids.len(), "writing records");
        pipeline(args)
    }

    /// Step 1: drain the recompute queue to a fixpoint. Step 2: for each
    /// dirty model, persist its dirty records through the hook (if any) and
    /// clear their dirty state.
    pub fn flush(&self) -> Result<()> {
        self.recompute_pending()?;
        let dirty_models: Vec<ModelTokenId> = self.cache.borrow().store.get_dirty_models();
        for model_id in dirty_models {
            let Some(model_name) = self.shared.schema.borrow().token_for_id(model_id) else {
                continue;
            };
            let ids = self.cache.borrow().store.get_dirty_records(model_id);
            tracing::debug!(model = model_name, count = ids.len(), "flushing dirty records");
            if let Some(hook) = self.shared.persist.borrow_mut().as_mut() {
                let rows: Vec<HashMap<String, FieldValue>> = ids
                    .iter()
                    .map(|&id| self.dirty_row(model_id, id))
                    .collect();
                hook(&model_name, &ids, &rows);
            }
            for id in ids {
                self.cache.borrow_mut().store.clear_dirty(model_id, id);
            }
        }
        Ok(())
    }

    fn dirty_row(&self, model: ModelTokenId, id: RecordId) -> HashMap<String, FieldValue> {
        let Some(model_name) = self.shared.schema.borrow().token_for_id(model) else {
            return HashMap::new();
        };
        let Ok(schema) = self.model_schema(&ModelToken::new(&model_name)) else {
            return HashMap::new();
        };
        let fields = self.cache.borrow().store.get_dirty_fields(model, id);
        let cache = self.cache.borrow();
        fields
            .into_iter()
            .filter_map(|f| {
                schema
                    .fields_in_order()
                    .find(|fs| FieldTokenId::from(&fs.token) == f)
                    .map(|fs| (fs.name.clone(), cache.store.get(model, f, id)))
            })
            .collect()
    }

    fn recompute_pending(&self) -> Result<()> {
        let env = self.clone();
        let mut tracker = std::mem::take(&mut self.cache.borrow_mut().compute);
        let result = recompute_pending(
            &mut tracker,
            |_model_id| "<model>".to_owned(),
            |_tracker, model_id, id, field_id| env.run_one_compute(model_id, id, field_id),
        );
        self.cache.borrow_mut().compute = tracker;
        result
    }

    fn run_one_compute(&self, model_id: ModelTokenId, id: RecordId, field_id: FieldTokenId) -> Result<()> {
        let Some(model_name) = self.shared.schema.borrow().token_for_id(model_id) else {
            return Ok(());
        };
        let model = ModelToken::new(&model_name);
        let schema = self.model_schema(&model)?;
        let Some(field_name) = schema
            .fields_in_order()
            .find(|f| FieldTokenId::from(&f.token) == field_id)
            .map(|f| f.name.clone())
        else {
            return Ok(());
        };
        let Some(compute) = schema.field(&field_name).and_then(|f| f.compute.clone()) else {
            self.cache.borrow_mut().compute.clear_recompute(model_id, id, field_id);
            return Ok(());
        };
        let _scope = self.protecting(&model, &[field_name.as_str()], &[id]);
        let pipeline = self
            .shared
            .pipeline
            .get_pipeline::<Record, Result<()>>(&model_name, &compute.compute_method_name)?;
        let record = self.get_record(&model, id);
        pipeline(record)?;
        self.cache.borrow_mut().compute.clear_recompute(model_id, id, field_id);
        Ok(())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct CreateArgs {
    pub env: Environment,
    pub model: ModelToken,
    pub id: RecordId,
    pub values: Values,
}

#[derive(Clone)]
pub struct WriteArgs {
    pub env: Environment,
    pub model: ModelToken,
    pub ids: Vec<RecordId>,
    pub values: Values,
}

fn register_generic_bases(env: &Environment) {
    env.register_base::<CreateArgs, Result<()>>("model", "create", |args: CreateArgs| {
        let schema = args.env.model_schema(&args.model)?;
        let model_id = ModelTokenId::from(&args.model);
        {
            let mut cache = args.env.cache.borrow_mut();
            handler::apply(&args.values, &mut cache.store, &schema, model_id, args.id)?;
            handler::mark_dirty(&args.values, &mut cache.store, &schema, model_id, args.id);
        }
        for field in handler::set_field_names(&args.values) {
            args.env.modified(&args.model, args.id, &field)?;
        }
        Ok(())
    });

    env.register_base::<WriteArgs, Result<bool>>("model", "write", |args: WriteArgs| {
        let schema = args.env.model_schema(&args.model)?;
        let model_id = ModelTokenId::from(&args.model);
        {
            let mut cache = args.env.cache.borrow_mut();
            handler::apply_bulk(&args.values, &mut cache.store, &schema, model_id, &args.ids)?;
            for &id in &args.ids {
                handler::mark_dirty(&args.values, &mut cache.store, &schema, model_id, id);
            }
        }
        for &id in &args.ids {
            for field in handler::set_field_names(&args.values) {
                args.env.modified(&args.model, id, &field)?;
            }
        }
        Ok(true)
    });
}
