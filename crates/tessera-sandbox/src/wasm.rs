//! A WebAssembly module presented as a single class.
//!
//! Exported functions with numeric signatures become public static methods
//! and exported globals become public static fields of
//! [`WasmConfig::class_name`]. Every session instantiates the module fresh
//! with no imports, a memory limit, and a per-call fuel budget.

use tessera_ir::introspect::{
    FieldInfo, IntrospectError, InvokeError, MethodInfo, RuntimeSession, TypeInfo,
    TypeIntrospector, TypeKind, Visibility,
};
use tessera_ir::runtime::{Thrown, Value};
use tessera_ir::typename::erasure;
use tessera_ir::Operation;
use wasmtime::{Engine, ExternType, Linker, Module, Mutability, Store, Trap, Val, ValType};

use crate::config::WasmConfig;

#[derive(Debug, thiserror::Error)]
pub enum WasmError {
    #[error("WASM engine error: {0}")]
    Engine(#[from] wasmtime::Error),

    #[error("Module exports nothing callable")]
    NoExports,
}

/// Store data that implements resource limiting.
struct StoreData {
    memory_limit_bytes: u64,
}

impl wasmtime::ResourceLimiter for StoreData {
    fn memory_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> anyhow::Result<bool> {
        Ok((desired as u64) <= self.memory_limit_bytes)
    }

    fn table_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> anyhow::Result<bool> {
        Ok(desired <= 10_000)
    }
}

pub struct WasmIntrospector {
    engine: Engine,
    module: Module,
    config: WasmConfig,
    info: TypeInfo,
}

impl WasmIntrospector {
    /// Compile a module (binary or text format) and describe its exports.
    pub fn new(wasm: &[u8], config: WasmConfig) -> Result<Self, WasmError> {
        let mut engine_config = wasmtime::Config::new();
        if config.fuel_per_call.is_some() {
            engine_config.consume_fuel(true);
        }
        engine_config.wasm_threads(false);
        let engine = Engine::new(&engine_config)?;
        let module = Module::new(&engine, wasm)?;

        let info = describe_module(&module, &config.class_name);
        if info.methods.is_empty() && info.fields.is_empty() {
            return Err(WasmError::NoExports);
        }
        tracing::debug!(
            class = %info.name,
            methods = info.methods.len(),
            fields = info.fields.len(),
            "loaded wasm module"
        );
        Ok(Self {
            engine,
            module,
            config,
            info,
        })
    }

    pub fn class_name(&self) -> &str {
        &self.info.name
    }

    pub fn config(&self) -> &WasmConfig {
        &self.config
    }
}

impl TypeIntrospector for WasmIntrospector {
    fn type_info(&self, type_name: &str) -> Option<TypeInfo> {
        (erasure(type_name) == self.info.name).then(|| self.info.clone())
    }

    fn new_session(&self) -> Result<Box<dyn RuntimeSession + '_>, IntrospectError> {
        let session_error = |e: wasmtime::Error| IntrospectError::Session(e.to_string());
        let mut store = Store::new(
            &self.engine,
            StoreData {
                memory_limit_bytes: self.config.memory_limit_bytes,
            },
        );
        store.limiter(|data| data);
        if let Some(fuel) = self.config.fuel_per_call {
            store.set_fuel(fuel).map_err(session_error)?;
        }

        // No imports: the module runs fully isolated.
        let linker = Linker::new(&self.engine);
        let instance = linker
            .instantiate(&mut store, &self.module)
            .map_err(session_error)?;
        Ok(Box::new(WasmSession {
            store,
            instance,
            class_name: &self.info.name,
            fuel_per_call: self.config.fuel_per_call,
        }))
    }
}

fn describe_module(module: &Module, class_name: &str) -> TypeInfo {
    let mut info = TypeInfo {
        name: erasure(class_name),
        kind: TypeKind::Class,
        is_public: true,
        type_params: Vec::new(),
        superclass: None,
        interfaces: Vec::new(),
        fields: Vec::new(),
        constructors: Vec::new(),
        methods: Vec::new(),
        enum_constants: Vec::new(),
    };
    for export in module.exports() {
        match export.ty() {
            ExternType::Func(ty) => {
                let params: Option<Vec<String>> = ty.params().map(|p| java_type(&p)).collect();
                let results: Option<Vec<String>> = ty.results().map(|r| java_type(&r)).collect();
                let (Some(params), Some(results)) = (params, results) else {
                    continue;
                };
                let returns = match results.as_slice() {
                    [] => "void".to_string(),
                    [single] => single.clone(),
                    _ => continue,
                };
                info.methods.push(MethodInfo {
                    name: export.name().to_string(),
                    params,
                    returns,
                    visibility: Visibility::Public,
                    is_static: true,
                });
            }
            ExternType::Global(ty) => {
                if let Some(type_name) = java_type(ty.content()) {
                    info.fields.push(FieldInfo {
                        name: export.name().to_string(),
                        type_name,
                        visibility: Visibility::Public,
                        is_static: true,
                    });
                }
            }
            _ => {}
        }
    }
    info
}

fn java_type(ty: &ValType) -> Option<String> {
    let name = match ty {
        ValType::I32 => "int",
        ValType::I64 => "long",
        ValType::F32 => "float",
        ValType::F64 => "double",
        _ => return None,
    };
    Some(name.to_string())
}

struct WasmSession<'a> {
    store: Store<StoreData>,
    instance: wasmtime::Instance,
    class_name: &'a str,
    fuel_per_call: Option<u64>,
}

impl WasmSession<'_> {
    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, InvokeError> {
        if let Some(fuel) = self.fuel_per_call {
            self.store.set_fuel(fuel).map_err(engine_error)?;
        }
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| self.unknown(name))?;
        let ty = func.ty(&self.store);
        let params: Vec<Val> = ty
            .params()
            .zip(args)
            .map(|(p, a)| to_val(&p, a))
            .collect::<Option<_>>()
            .ok_or_else(|| self.unknown(name))?;
        let mut results = vec![Val::I32(0); ty.results().len()];

        func.call(&mut self.store, &params, &mut results)
            .map_err(trap_to_thrown)?;
        Ok(results.first().map_or(Value::Null, from_val))
    }

    fn global(&mut self, name: &str) -> Result<wasmtime::Global, InvokeError> {
        self.instance
            .get_global(&mut self.store, name)
            .ok_or_else(|| self.unknown(name))
    }

    fn unknown(&self, member: &str) -> InvokeError {
        IntrospectError::UnknownMember {
            declaring: self.class_name.to_string(),
            member: member.to_string(),
        }
        .into()
    }
}

impl RuntimeSession for WasmSession<'_> {
    fn invoke(&mut self, operation: &Operation, args: &[Value]) -> Result<Value, InvokeError> {
        match operation {
            Operation::Literal { type_name, value } => Ok(Value::from_literal(value, type_name)),
            Operation::ArrayCreate { element, .. } => Ok(Value::Array {
                element: element.clone(),
                items: args.to_vec(),
            }),
            Operation::Method {
                name,
                is_static: true,
                ..
            } => self.call(name, args),
            Operation::FieldGet {
                field,
                is_static: true,
                ..
            } => {
                let global = self.global(field)?;
                Ok(from_val(&global.get(&mut self.store)))
            }
            Operation::FieldSet {
                field,
                is_static: true,
                ..
            } => {
                let global = self.global(field)?;
                let ty = global.ty(&self.store);
                if ty.mutability() == Mutability::Const {
                    return Err(Thrown::new(
                        "java.lang.IllegalAccessException",
                        Some(format!("global '{field}' is immutable")),
                    )
                    .into());
                }
                let value = args
                    .first()
                    .and_then(|a| to_val(ty.content(), a))
                    .ok_or_else(|| self.unknown(field))?;
                global.set(&mut self.store, value).map_err(engine_error)?;
                Ok(Value::Null)
            }
            other => Err(self.unknown(&other.signature())),
        }
    }

    fn read_field(&mut self, target: &Value, field: &FieldInfo) -> Result<Value, InvokeError> {
        Err(IntrospectError::NoSuchField {
            value: target.to_string(),
            field: field.name.clone(),
        }
        .into())
    }

    fn describe(&self, _value: &Value) -> Option<TypeInfo> {
        None
    }
}

fn to_val(ty: &ValType, value: &Value) -> Option<Val> {
    let val = match (ty, value) {
        (ValType::I32, Value::Int { value }) => Val::I32(*value as i32),
        (ValType::I32, Value::Char { value }) => Val::I32(*value as i32),
        (ValType::I32, Value::Bool { value }) => Val::I32(i32::from(*value)),
        (ValType::I64, Value::Int { value }) => Val::I64(*value),
        (ValType::F32, Value::Float { value }) => Val::F32((*value as f32).to_bits()),
        (ValType::F32, Value::Int { value }) => Val::F32((*value as f32).to_bits()),
        (ValType::F64, Value::Float { value }) => Val::F64(value.to_bits()),
        (ValType::F64, Value::Int { value }) => Val::F64((*value as f64).to_bits()),
        _ => return None,
    };
    Some(val)
}

fn from_val(val: &Val) -> Value {
    match val {
        Val::I32(v) => Value::Int {
            value: i64::from(*v),
        },
        Val::I64(v) => Value::Int { value: *v },
        Val::F32(bits) => Value::Float {
            value: f64::from(f32::from_bits(*bits)),
        },
        Val::F64(bits) => Value::Float {
            value: f64::from_bits(*bits),
        },
        _ => Value::Null,
    }
}

fn trap_to_thrown(err: wasmtime::Error) -> InvokeError {
    match err.downcast_ref::<Trap>() {
        Some(Trap::OutOfFuel) => Thrown::new("wasm.OutOfFuel", Some("fuel exhausted".into())).into(),
        Some(trap) => Thrown::new("wasm.Trap", Some(trap.to_string())).into(),
        None => engine_error(err),
    }
}

fn engine_error(err: wasmtime::Error) -> InvokeError {
    IntrospectError::Session(err.to_string()).into()
}
