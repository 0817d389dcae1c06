//! Host module registry
//!
//! Module calls (`sc` with LEV=2) carry a function id in r11. Every id
//! resolves to a named host function registered under its module.

use std::collections::HashMap;

/// Host function signature: guest r3-r10 in, r3 out
pub type HostFunction = fn(args: &[u64; 8]) -> i64;

/// A named host function
#[derive(Clone, Copy)]
pub struct HostExport {
    pub name: &'static str,
    pub func: HostFunction,
}

impl std::fmt::Debug for HostExport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostExport").field("name", &self.name).finish()
    }
}

/// Functions exported by one emulated library
#[derive(Debug)]
pub struct HostModule {
    pub name: String,
    functions: HashMap<u32, HostExport>,
}

impl HostModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            functions: HashMap::new(),
        }
    }

    /// Register a function under its id, replacing any previous export
    pub fn register(&mut self, fnid: u32, name: &'static str, func: HostFunction) {
        self.functions.insert(fnid, HostExport { name, func });
    }

    pub fn get_function(&self, fnid: u32) -> Option<&HostExport> {
        self.functions.get(&fnid)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Module registry with a flat function-id index
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, HostModule>,
    by_fnid: HashMap<u32, String>,
}

impl ModuleRegistry {
    /// Registry preloaded with the stub libraries every title links against
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_default_modules();
        registry
    }

    pub fn empty() -> Self {
        Self::default()
    }

    fn register_default_modules(&mut self) {
        let mut sysutil = HostModule::new("cellSysutil");
        sysutil.register(0x189A_74DA, "cellSysutilCheckCallback", |_| 0);
        sysutil.register(0x9D98_AFA0, "cellSysutilRegisterCallback", |_| 0);
        self.register_module(sysutil);

        let mut pad = HostModule::new("cellPad");
        pad.register(0x1CF9_8800, "cellPadInit", |_| 0);
        pad.register(0x4D9B_75D5, "cellPadEnd", |_| 0);
        self.register_module(pad);
    }

    /// Register a module. Ids already exported by another module move to this one.
    pub fn register_module(&mut self, module: HostModule) {
        for &fnid in module.functions.keys() {
            self.by_fnid.insert(fnid, module.name.clone());
        }
        self.modules.insert(module.name.clone(), module);
    }

    pub fn get_module(&self, name: &str) -> Option<&HostModule> {
        self.modules.get(name)
    }

    /// Resolve a function id to its module name and export
    pub fn find(&self, fnid: u32) -> Option<(&str, &HostExport)> {
        let module = self.modules.get(self.by_fnid.get(&fnid)?)?;
        let export = module.get_function(fnid)?;
        Some((module.name.as_str(), export))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_modules() {
        let registry = ModuleRegistry::new();
        assert_eq!(registry.get_module("cellPad").map(HostModule::len), Some(2));

        let (module, export) = registry.find(0x1CF9_8800).unwrap();
        assert_eq!(module, "cellPad");
        assert_eq!(export.name, "cellPadInit");
        assert_eq!((export.func)(&[0; 8]), 0);

        assert!(registry.find(0xDEAD_BEEF).is_none());
    }

    #[test]
    fn test_custom_module() {
        let mut registry = ModuleRegistry::empty();
        let mut math = HostModule::new("hostMath");
        math.register(0x0000_0001, "add2", |args| (args[0] + args[1]) as i64);
        registry.register_module(math);

        let (_, export) = registry.find(1).unwrap();
        let mut args = [0u64; 8];
        args[0] = 40;
        args[1] = 2;
        assert_eq!((export.func)(&args), 42);
    }

    #[test]
    fn test_reexport_moves_id() {
        let mut registry = ModuleRegistry::empty();
        let mut first = HostModule::new("first");
        first.register(7, "f", |_| 1);
        registry.register_module(first);

        let mut second = HostModule::new("second");
        second.register(7, "g", |_| 2);
        registry.register_module(second);

        let (module, export) = registry.find(7).unwrap();
        assert_eq!(module, "second");
        assert_eq!((export.func)(&[0; 8]), 2);
    }
}
