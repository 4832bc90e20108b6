use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct CompileUnit {
    pub file: String,
    pub directory: String,
    pub producer: String,
    pub optimized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionMeta {
    pub name: String,
    pub file: String,
    pub line: usize,
    pub is_local: bool,
    pub is_definition: bool,
}

/// Source-level metadata collected alongside the IR when debug info is enabled.
#[derive(Debug, Clone, Default)]
pub struct DebugInfo {
    unit: Option<CompileUnit>,
    functions: Vec<FunctionMeta>,
    location: Option<(usize, usize)>,
}

impl DebugInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init_compile_unit(&mut self, file: &str, directory: &str, producer: &str, optimized: bool) {
        self.unit = Some(CompileUnit {
            file: file.to_string(),
            directory: directory.to_string(),
            producer: producer.to_string(),
            optimized,
        });
    }

    pub fn set_location(&mut self, line: usize, col: usize) {
        self.location = Some((line, col));
    }

    pub fn register_function(&mut self, name: &str, line: usize, is_local: bool, is_definition: bool) {
        let file = self.unit.as_ref().map(|u| u.file.clone()).unwrap_or_default();
        self.functions.push(FunctionMeta {
            name: name.to_string(),
            file,
            line,
            is_local,
            is_definition,
        });
    }

    pub fn compile_unit(&self) -> Option<&CompileUnit> {
        self.unit.as_ref()
    }

    pub fn functions(&self) -> &[FunctionMeta] {
        &self.functions
    }

    pub fn location(&self) -> Option<(usize, usize)> {
        self.location
    }
}

impl fmt::Display for DebugInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(unit) = &self.unit {
            writeln!(
                f,
                "; compile unit: file={:?} dir={:?} producer={:?} optimized={}",
                unit.file, unit.directory, unit.producer, unit.optimized
            )?;
        }
        for func in &self.functions {
            writeln!(
                f,
                "; function {}: file={:?} line={} local={} definition={}",
                func.name, func.file, func.line, func.is_local, func.is_definition
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn functions_inherit_the_unit_file() {
        let mut debug = DebugInfo::new();
        debug.init_compile_unit("main.sb", "/src", "sable", false);
        debug.register_function("main", 3, false, true);

        let meta = &debug.functions()[0];
        assert_eq!(meta.file, "main.sb");
        assert_eq!(meta.line, 3);
        assert!(meta.is_definition);
    }

    #[test]
    fn renders_as_comments() {
        let mut debug = DebugInfo::new();
        debug.init_compile_unit("a.sb", ".", "sable", true);
        debug.register_function("f", 1, true, true);
        let text = debug.to_string();
        assert!(text.lines().all(|line| line.starts_with(';')));
        assert!(text.contains("optimized=true"));
    }

    #[test]
    fn tracks_the_latest_location() {
        let mut debug = DebugInfo::new();
        assert_eq!(debug.location(), None);
        debug.set_location(4, 2);
        debug.set_location(7, 1);
        assert_eq!(debug.location(), Some((7, 1)));
    }
}
