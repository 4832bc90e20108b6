use std::{collections::HashMap, fmt};

use cranelift::codegen::ir::{ExternalName, Function, InstructionData};

use super::GeneratedModule;

/// module-level ids of the functions `func` calls or takes the address of, in first-use order
pub fn referenced_functions(func: &Function) -> Vec<u32> {
    let mut ids = Vec::new();
    for block in func.layout.blocks() {
        for inst in func.layout.block_insts(block) {
            let func_ref = match func.dfg.insts[inst] {
                InstructionData::Call { func_ref, .. } | InstructionData::FuncAddr { func_ref, .. } => func_ref,
                _ => continue,
            };
            let ExternalName::User(name) = func.dfg.ext_funcs[func_ref].name else {
                continue;
            };
            let id = func.params.user_named_funcs()[name].index;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// `block3` from a header line like `block3(v1: i32):`
fn block_header(line: &str) -> Option<&str> {
    if !line.starts_with("block") || !line.ends_with(':') {
        return None;
    }
    let end = line.find(['(', ':'])?;
    Some(&line[..end])
}

/// the function id `K` of a `fnN = ... u0:K ...` line
fn extern_func_id(line: &str) -> Option<u32> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with("fn") {
        return None;
    }
    let rest = &trimmed[trimmed.find("u0:")? + 3..];
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn write_function(
    f: &mut fmt::Formatter<'_>,
    text: &str,
    labels: &HashMap<String, &str>,
    names: &HashMap<u32, String>,
) -> fmt::Result {
    for line in text.lines() {
        if let Some(label) = block_header(line).and_then(|b| labels.get(b)) {
            writeln!(f, "{line}  ; {label}")?;
        } else if let Some(name) = extern_func_id(line).and_then(|id| names.get(&id)) {
            writeln!(f, "{line}  ; {name}")?;
        } else {
            writeln!(f, "{line}")?;
        }
    }
    Ok(())
}

impl fmt::Display for GeneratedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; module {}", self.name)?;
        for import in &self.imports {
            writeln!(f, "; import {import}")?;
        }
        for data in &self.data_objects {
            let kind = if data.writable { "global" } else { "const" };
            match (&data.points_to, &data.contents) {
                (Some(target), _) => writeln!(f, "; {kind} {} [{} bytes] &{target}", data.name, data.size)?,
                (None, Some(bytes)) => writeln!(f, "; {kind} {} [{} bytes] {:?}", data.name, data.size, String::from_utf8_lossy(bytes))?,
                (None, None) => writeln!(f, "; {kind} {} [{} bytes] zeroed", data.name, data.size)?,
            }
        }

        for func in &self.functions {
            writeln!(f)?;
            let labels: HashMap<String, &str> = func
                .labels
                .iter()
                .map(|(block, label)| (block.to_string(), label.as_str()))
                .collect();
            write_function(f, &func.func.display().to_string(), &labels, &self.func_names)?;
        }

        if let Some(debug) = &self.debug {
            writeln!(f)?;
            write!(f, "{debug}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_headers_with_and_without_params() {
        assert_eq!(block_header("block0(v0: i32, v1: i64):"), Some("block0"));
        assert_eq!(block_header("block12:"), Some("block12"));
        assert_eq!(block_header("    v3 = iadd v1, v2"), None);
    }

    #[test]
    fn extern_function_ids() {
        assert_eq!(extern_func_id("    fn0 = u0:3 sig0"), Some(3));
        assert_eq!(extern_func_id("    fn2 = colocated u0:17 sig1"), Some(17));
        assert_eq!(extern_func_id("    gv0 = symbol colocated userextname1"), None);
    }
}
