use std::collections::BTreeMap;

use tessera_ir::introspect::{IntrospectError, RuntimeSession, TypeInfo, TypeIntrospector};

/// Static-only introspector over the JSON type descriptions in `fixtures/model.json`.
pub struct Model(BTreeMap<String, TypeInfo>);

impl TypeIntrospector for Model {
    fn type_info(&self, type_name: &str) -> Option<TypeInfo> {
        self.0.get(type_name).cloned()
    }

    fn new_session(&self) -> Result<Box<dyn RuntimeSession + '_>, IntrospectError> {
        Err(IntrospectError::Session("static model".into()))
    }
}

pub fn model() -> Model {
    let json = include_str!("../fixtures/model.json");
    let types: Vec<TypeInfo> = serde_json::from_str(json).unwrap();
    Model(types.into_iter().map(|t| (t.name.clone(), t)).collect())
}
