//! Module representation

use super::Function;
use indexmap::IndexMap;
use std::fmt;

/// A mid-IR module: named functions in creation order. Creation order is
/// discovery order, which is also the emission order used by the lowerer to
/// assign function indices.
#[derive(Debug, Clone, Default)]
pub struct Module {
    functions: IndexMap<String, Function>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function to the module, replacing any previous entry with the
    /// same name.
    pub fn add_function(&mut self, func: Function) {
        self.functions.insert(func.name().to_string(), func);
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn get_function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.get_mut(name)
    }

    pub fn contains_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn iter_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    pub fn iter_functions_mut(&mut self) -> impl Iterator<Item = &mut Function> {
        self.functions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for func in self.functions.values() {
            if func.is_declaration() {
                writeln!(f, "declare @{} -> {}", func.name(), func.ret_ty())?;
            } else {
                write!(f, "{}", func)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Type;

    #[test]
    fn test_module_preserves_insertion_order() {
        let mut module = Module::new();
        module.add_function(Function::new("main", Type::I32));
        module.add_function(Function::new("helper", Type::I32));
        module.add_function(Function::new("aux", Type::I32));

        let names: Vec<&str> = module.iter_functions().map(|f| f.name()).collect();
        assert_eq!(names, vec!["main", "helper", "aux"]);
    }

    #[test]
    fn test_replacing_keeps_position() {
        let mut module = Module::new();
        module.add_function(Function::new("main", Type::I32));
        module.add_function(Function::new("foo", Type::I32));

        // A declaration later given a body keeps its slot.
        let mut body = Function::new("main", Type::I32);
        body.add_block("entry");
        module.add_function(body);

        let names: Vec<&str> = module.iter_functions().map(|f| f.name()).collect();
        assert_eq!(names, vec!["main", "foo"]);
        assert!(!module.get_function("main").unwrap().is_declaration());
    }
}
