//! The mutable binding environment for the embedded language.
//!
//! Lives for the whole session; individual commands read and write it but
//! never replace it. The reload directive re-runs the init script into the
//! same namespace rather than swapping it out.

use crate::script::Stmt;
use crate::value::Value;
use std::collections::HashMap;

/// A user-defined function: parameter names and a statement body.
#[derive(Debug, Clone)]
pub struct FnDef {
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Default)]
pub struct Namespace {
    vars: HashMap<String, Value>,
    funcs: HashMap<String, FnDef>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.remove(name)
    }

    pub fn func(&self, name: &str) -> Option<&FnDef> {
        self.funcs.get(name)
    }

    pub fn define(&mut self, name: &str, def: FnDef) {
        self.funcs.insert(name.to_string(), def);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_roundtrip() {
        let mut ns = Namespace::new();
        ns.set("x", Value::Num(7.0));
        assert_eq!(ns.get("x"), Some(&Value::Num(7.0)));
        assert_eq!(ns.get("y"), None);
    }

    #[test]
    fn definitions_overwrite() {
        let mut ns = Namespace::new();
        ns.define(
            "f",
            FnDef {
                params: vec!["a".into()],
                body: vec![],
            },
        );
        ns.define(
            "f",
            FnDef {
                params: vec!["a".into(), "b".into()],
                body: vec![],
            },
        );
        assert_eq!(ns.func("f").unwrap().params.len(), 2);
    }
}
