use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use rhai::AST;

#[derive(Debug)]
pub struct ScriptModule {
    name: String,
    section: String,
    ast: AST,
    generation: u64,
    discarded: Cell<bool>,
}

impl ScriptModule {
    pub(crate) fn new(name: &str, section: &str, mut ast: AST, generation: u64) -> Self {
        ast.set_source(section);
        Self {
            name: name.to_string(),
            section: section.to_string(),
            ast,
            generation,
            discarded: Cell::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ast(&self) -> &AST {
        &self.ast
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded.get()
    }

    pub(crate) fn mark_discarded(&self) {
        self.discarded.set(true);
    }

    pub fn function_names(&self) -> Vec<String> {
        self.ast
            .iter_functions()
            .map(|metadata| metadata.name.to_string())
            .collect()
    }
}

/// Handle to one script function; holding it keeps the owning module alive.
#[derive(Debug, Clone)]
pub struct ScriptFunction {
    module: Rc<ScriptModule>,
    name: String,
    param_count: usize,
}

impl ScriptFunction {
    pub fn find(module: &Rc<ScriptModule>, name: &str) -> Option<Self> {
        module
            .ast
            .iter_functions()
            .find(|metadata| metadata.name == name)
            .map(|metadata| Self {
                module: Rc::clone(module),
                name: metadata.name.to_string(),
                param_count: metadata.params.len(),
            })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &Rc<ScriptModule> {
        &self.module
    }

    pub fn param_count(&self) -> usize {
        self.param_count
    }

    pub fn declaration(&self) -> String {
        format!("{}::{}/{}", self.module.name, self.name, self.param_count)
    }
}

#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Rc<ScriptModule>>,
    next_generation: u64,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(
        &mut self,
        name: &str,
        section: &str,
        ast: AST,
    ) -> (Rc<ScriptModule>, Option<Rc<ScriptModule>>) {
        self.next_generation += 1;
        let module = Rc::new(ScriptModule::new(name, section, ast, self.next_generation));
        let replaced = self.modules.insert(name.to_string(), Rc::clone(&module));
        if let Some(replaced) = &replaced {
            replaced.mark_discarded();
        }
        (module, replaced)
    }

    pub(crate) fn discard(&mut self, name: &str) -> Option<Rc<ScriptModule>> {
        let removed = self.modules.remove(name)?;
        removed.mark_discarded();
        Some(removed)
    }

    pub(crate) fn drain(&mut self) -> Vec<Rc<ScriptModule>> {
        let drained = std::mem::take(&mut self.modules);
        drained
            .into_values()
            .inspect(|module| module.mark_discarded())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Rc<ScriptModule>> {
        self.modules.get(name).cloned()
    }

    pub fn function(&self, module: &str, function: &str) -> Option<ScriptFunction> {
        self.modules
            .get(module)
            .and_then(|module| ScriptFunction::find(module, function))
    }

    pub fn names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
