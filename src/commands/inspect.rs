//! The module that implements the `hostlink inspect` command.

use crate::common::{read_module, CommonOptions};
use anyhow::Result;
use clap::Parser;
use hostlink::{environment, new_store, Import, ImportTable, Instantiator, Signature, TracingSink};
use std::path::PathBuf;
use wasmtime::{Engine, ExternType};

/// Lists a module's imports and exports and whether the standard host
/// environment satisfies each import
#[derive(Parser, Clone, Debug)]
pub struct InspectCommand {
    #[command(flatten)]
    common: CommonOptions,

    /// The path of the WebAssembly module to inspect
    #[arg(required = true, value_name = "MODULE")]
    module: PathBuf,
}

impl InspectCommand {
    /// Executes the command.
    pub fn execute(self) -> Result<()> {
        self.common.init_logging();

        let bytes = read_module(&self.module)?;
        let engine = Engine::default();
        let module = Instantiator::new(&engine).compile_blocking(&bytes)?;

        let mut store = new_store(&engine, self.common.config(), TracingSink);
        let (resolver, _memory) = environment::standard_imports(&mut store)?;
        let table = resolver.build();

        for import in module.imports() {
            let ty = import.ty();
            println!(
                "import {}.{}: {} ({})",
                import.module(),
                import.name(),
                describe(&ty),
                status(&table, import.module(), import.name(), &ty),
            );
        }
        for export in module.exports() {
            println!("export {}: {}", export.name(), describe(&export.ty()));
        }
        Ok(())
    }
}

fn describe(ty: &ExternType) -> String {
    match ty {
        ExternType::Func(f) => match Signature::from_func_type(f) {
            Some(sig) => format!("func {sig}"),
            None => format!("func {f:?}"),
        },
        ExternType::Memory(m) => match m.maximum() {
            Some(max) => format!("memory {}..{max} pages", m.minimum()),
            None => format!("memory {}.. pages", m.minimum()),
        },
        ExternType::Global(g) => format!("global {:?}", g.content()),
        ExternType::Table(t) => format!("table of {} elements", t.minimum()),
        #[allow(unreachable_patterns)]
        other => format!("{other:?}"),
    }
}

fn status(table: &ImportTable, namespace: &str, name: &str, ty: &ExternType) -> &'static str {
    match (table.get(namespace, name), ty) {
        (None, _) => "unresolved",
        (Some(Import::Func(func)), ExternType::Func(f)) => {
            if Signature::from_func_type(f).as_ref() == Some(func.signature()) {
                "resolved"
            } else {
                "signature mismatch"
            }
        }
        (Some(Import::Memory(_)), ExternType::Memory(_)) => "resolved",
        (Some(_), _) => "kind mismatch",
    }
}
