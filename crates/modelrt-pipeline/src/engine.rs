//! Base + override pipeline composition, keyed by (model, method).
//!
//! Values are type-erased behind `Arc<dyn Any + Send + Sync>` the same way
//! the identity map erases record wrappers: a small closure captured at the
//! generic call site (`register_base::<Args, Ret>`, ...) knows how to
//! downcast and fold a given key's registrations, so the map itself never
//! needs to be generic.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use modelrt_core::{Error, Result};

/// A compiled or base pipeline function.
pub type PipelineFn<Args, Ret> = Arc<dyn Fn(Args) -> Ret + Send + Sync>;

/// An override's body, given the delegate ("super") to the next link down.
pub type OverrideFn<Args, Ret> = Arc<dyn Fn(Args, PipelineFn<Args, Ret>) -> Ret + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    model: String,
    method: String,
}

struct OverrideSlot {
    priority: i64,
    order: usize,
    func: Arc<dyn Any + Send + Sync>,
}

type Compiler = dyn Fn(&Option<Arc<dyn Any + Send + Sync>>, &[OverrideSlot]) -> Result<Arc<dyn Any + Send + Sync>>
    + Send
    + Sync;

struct PipelineEntry {
    base: Option<Arc<dyn Any + Send + Sync>>,
    overrides: Vec<OverrideSlot>,
    compiled: Option<Arc<dyn Any + Send + Sync>>,
    compile: Arc<Compiler>,
    next_order: usize,
}

impl PipelineEntry {
    fn new(compile: Arc<Compiler>) -> Self {
        Self {
            base: None,
            overrides: Vec::new(),
            compiled: None,
            compile,
            next_order: 0,
        }
    }
}

fn make_compiler<Args, Ret>() -> Arc<Compiler>
where
    Args: 'static,
    Ret: 'static,
{
    Arc::new(
        move |base: &Option<Arc<dyn Any + Send + Sync>>, overrides: &[OverrideSlot]| {
            let base: PipelineFn<Args, Ret> = base
                .as_ref()
                .and_then(|b| b.downcast_ref::<PipelineFn<Args, Ret>>().cloned())
                .ok_or_else(|| Error::Custom("pipeline base missing".into()))?;

            let mut sorted: Vec<&OverrideSlot> = overrides.iter().collect();
            sorted.sort_by_key(|o| (o.priority, o.order));

            let mut chain: PipelineFn<Args, Ret> = base;
            for slot in sorted {
                let over = slot
                    .func
                    .downcast_ref::<OverrideFn<Args, Ret>>()
                    .expect("override function type mismatch for pipeline key")
                    .clone();
                let next = chain.clone();
                chain = Arc::new(move |args: Args| over(args, next.clone()));
            }

            Ok(Arc::new(chain) as Arc<dyn Any + Send + Sync>)
        },
    )
}

/// Registers and compiles (model, method) pipelines from a base plus zero or
/// more priority-ordered overrides.
#[derive(Default)]
pub struct PipelineEngine {
    entries: RwLock<HashMap<PipelineKey, PipelineEntry>>,
}

impl PipelineEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_mut<Args, Ret>(
        &self,
        model: &str,
        method: &str,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<PipelineKey, PipelineEntry>>
    where
        Args: 'static,
        Ret: 'static,
    {
        let mut guard = self.entries.write().expect("pipeline lock poisoned");
        let key = PipelineKey {
            model: model.to_owned(),
            method: method.to_owned(),
        };
        guard
            .entry(key)
            .or_insert_with(|| PipelineEntry::new(make_compiler::<Args, Ret>()));
        guard
    }

    /// Registers (replacing any previous) base for `(model, method)`.
    pub fn register_base<Args, Ret>(
        &self,
        model: &str,
        method: &str,
        base: impl Fn(Args) -> Ret + Send + Sync + 'static,
    ) where
        Args: 'static,
        Ret: 'static,
    {
        let mut guard = self.entry_mut::<Args, Ret>(model, method);
        let key = PipelineKey {
            model: model.to_owned(),
            method: method.to_owned(),
        };
        let entry = guard.get_mut(&key).expect("entry just inserted");
        let boxed: PipelineFn<Args, Ret> = Arc::new(base);
        entry.base = Some(Arc::new(boxed));
        entry.compiled = None;
        tracing::debug!(model, method, "registered pipeline base");
    }

    /// Registers a base only if none is present yet for `(model, method)`.
    pub fn register_default_base<Args, Ret>(
        &self,
        model: &str,
        method: &str,
        base: impl Fn(Args) -> Ret + Send + Sync + 'static,
    ) where
        Args: 'static,
        Ret: 'static,
    {
        let mut guard = self.entry_mut::<Args, Ret>(model, method);
        let key = PipelineKey {
            model: model.to_owned(),
            method: method.to_owned(),
        };
        let entry = guard.get_mut(&key).expect("entry just inserted");
        if entry.base.is_none() {
            let boxed: PipelineFn<Args, Ret> = Arc::new(base);
            entry.base = Some(Arc::new(boxed));
            entry.compiled = None;
        }
    }

    /// Registers an override with the given priority; higher priority ends
    /// up outermost once compiled. Ties break by registration order.
    pub fn register_override<Args, Ret>(
        &self,
        model: &str,
        method: &str,
        priority: i64,
        over: impl Fn(Args, PipelineFn<Args, Ret>) -> Ret + Send + Sync + 'static,
    ) where
        Args: 'static,
        Ret: 'static,
    {
        let mut guard = self.entry_mut::<Args, Ret>(model, method);
        let key = PipelineKey {
            model: model.to_owned(),
            method: method.to_owned(),
        };
        let entry = guard.get_mut(&key).expect("entry just inserted");
        let order = entry.next_order;
        entry.next_order += 1;
        let func: OverrideFn<Args, Ret> = Arc::new(over);
        entry.overrides.push(OverrideSlot {
            priority,
            order,
            func: Arc::new(func),
        });
        entry.compiled = None;
        tracing::debug!(model, method, priority, order, "registered pipeline override");
    }

    #[must_use]
    pub fn has_pipeline(&self, model: &str, method: &str) -> bool {
        let guard = self.entries.read().expect("pipeline lock poisoned");
        let key = PipelineKey {
            model: model.to_owned(),
            method: method.to_owned(),
        };
        guard.contains_key(&key) || {
            let fallback = PipelineKey {
                model: "model".to_owned(),
                method: method.to_owned(),
            };
            guard.contains_key(&fallback)
        }
    }

    /// Compiles every registered pipeline once; returns the first
    /// `MissingBase` encountered, if any.
    pub fn compile_all(&self) -> Result<()> {
        let mut guard = self.entries.write().expect("pipeline lock poisoned");
        let keys: Vec<PipelineKey> = guard.keys().cloned().collect();
        for key in keys {
            let entry = guard.get_mut(&key).expect("key from keys()");
            if entry.base.is_none() {
                if entry.overrides.is_empty() {
                    continue;
                }
                tracing::warn!(model = key.model, method = key.method, "pipeline has overrides but no base");
                return Err(Error::MissingBase {
                    model: key.model,
                    method: key.method,
                });
            }
            let compiled = (entry.compile)(&entry.base, &entry.overrides)?;
            entry.compiled = Some(compiled);
        }
        Ok(())
    }

    /// Looks up `(model, method)`, falling back to `("model", method)`.
    /// Compiles on demand if `compile_all` was not called first.
    pub fn get_pipeline<Args, Ret>(&self, model: &str, method: &str) -> Result<PipelineFn<Args, Ret>>
    where
        Args: 'static,
        Ret: 'static,
    {
        for candidate in [model.to_owned(), "model".to_owned()] {
            let key = PipelineKey {
                model: candidate.clone(),
                method: method.to_owned(),
            };
            let mut guard = self.entries.write().expect("pipeline lock poisoned");
            if let Some(entry) = guard.get_mut(&key) {
                if entry.base.is_none() && !entry.overrides.is_empty() {
                    return Err(Error::MissingBase {
                        model: key.model,
                        method: key.method,
                    });
                }
                if entry.base.is_none() {
                    continue;
                }
                if entry.compiled.is_none() {
                    entry.compiled = Some((entry.compile)(&entry.base, &entry.overrides)?);
                }
                let compiled = entry.compiled.clone().expect("just compiled");
                drop(guard);
                return compiled
                    .downcast::<PipelineFn<Args, Ret>>()
                    .map(|f| (*f).clone())
                    .map_err(|_| Error::Custom("pipeline signature mismatch".into()));
            }
        }
        Err(Error::NoPipeline {
            model: model.to_owned(),
            method: method.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_chain_order_matches_s5() {
        let engine = PipelineEngine::new();
        engine.register_base::<i64, i64>("m.x", "x", |_args| 1);
        engine.register_override::<i64, i64>("m.x", "x", 10, |args, next| next(args) + 10);
        engine.register_override::<i64, i64>("m.x", "x", 20, |args, next| next(args) * 2);
        let pipeline = engine.get_pipeline::<i64, i64>("m.x", "x").unwrap();
        assert_eq!(pipeline(0), 22);
    }

    #[test]
    fn fallback_to_abstract_model() {
        let engine = PipelineEngine::new();
        engine.register_base::<i64, i64>("model", "x", |args| args + 1);
        let pipeline = engine.get_pipeline::<i64, i64>("m.other", "x").unwrap();
        assert_eq!(pipeline(1), 2);
    }

    #[test]
    fn no_pipeline_at_all_is_an_error() {
        let engine = PipelineEngine::new();
        let result = engine.get_pipeline::<i64, i64>("m.none", "x");
        assert!(matches!(result, Err(Error::NoPipeline { .. })));
    }

    #[test]
    fn overrides_without_base_is_missing_base() {
        let engine = PipelineEngine::new();
        engine.register_override::<i64, i64>("m.x", "y", 1, |args, next| next(args));
        let result = engine.get_pipeline::<i64, i64>("m.x", "y");
        assert!(matches!(result, Err(Error::MissingBase { .. })));
    }

    #[test]
    fn register_default_base_does_not_overwrite_existing() {
        let engine = PipelineEngine::new();
        engine.register_base::<i64, i64>("m.x", "z", |_args| 1);
        engine.register_default_base::<i64, i64>("m.x", "z", |_args| 99);
        let pipeline = engine.get_pipeline::<i64, i64>("m.x", "z").unwrap();
        assert_eq!(pipeline(0), 1);
    }

    #[test]
    fn compile_all_surfaces_missing_base() {
        let engine = PipelineEngine::new();
        engine.register_override::<i64, i64>("m.x", "y", 1, |args, next| next(args));
        assert!(matches!(engine.compile_all(), Err(Error::MissingBase { .. })));
    }
}
