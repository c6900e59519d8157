//! The module that implements the `hostlink run` command.

use crate::common::{read_module, CommonOptions};
use anyhow::{bail, Context as _, Result};
use clap::Parser;
use hostlink::{
    environment, format_value, new_store, ExportRegistry, HostState, Instantiator, ModuleInstance,
    ValKind, WriterSink,
};
use std::path::{Path, PathBuf};
use tracing::warn;
use wasmtime::{Engine, Store, Val};

/// Runs a WebAssembly module
#[derive(Parser, Clone, Debug)]
pub struct RunCommand {
    #[command(flatten)]
    common: CommonOptions,

    /// The name of the function to run
    #[arg(long, value_name = "FUNCTION")]
    invoke: Option<String>,

    /// The path of the WebAssembly module to run
    // Left empty by the top-level parser when a subcommand is given.
    #[arg(required = true, value_name = "MODULE")]
    module: Option<PathBuf>,

    // NOTE: this must come last for trailing varargs
    /// The arguments to pass to the invoked function
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    module_args: Vec<String>,
}

impl RunCommand {
    /// Executes the command.
    pub fn execute(self) -> Result<()> {
        self.common.init_logging();

        let module = self.module.as_deref().context("no module was given")?;
        let bytes = read_module(module)?;
        let runtime = tokio::runtime::Builder::new_current_thread().build()?;
        let result = runtime.block_on(self.run(module, &bytes));
        // The registry outlives the store the instance belongs to.
        ExportRegistry::global().clear();
        result
    }

    async fn run(&self, module: &Path, bytes: &[u8]) -> Result<()> {
        let engine = Engine::default();
        let mut store = new_store(
            &engine,
            self.common.config(),
            WriterSink::new(std::io::stdout()),
        );
        let (resolver, _memory) = environment::standard_imports(&mut store)?;

        let instance = Instantiator::new(&engine)
            .instantiate_and_register(
                &mut store,
                bytes,
                &resolver.build(),
                ExportRegistry::global(),
            )
            .await
            .with_context(|| format!("failed to instantiate `{}`", module.display()))?;

        match &self.invoke {
            Some(name) => self.invoke_export(&mut store, &instance, name)?,
            None if instance.get_func("_start").is_some() => {
                self.invoke_export(&mut store, &instance, "_start")?
            }
            None if !self.module_args.is_empty() => {
                bail!("arguments were given but no function was selected with `--invoke`")
            }
            None => {}
        }

        let faults = store.data().faults();
        if faults > 0 {
            warn!("{faults} host call(s) failed and were ignored");
        }
        Ok(())
    }

    fn invoke_export(
        &self,
        store: &mut Store<HostState>,
        instance: &ModuleInstance,
        name: &str,
    ) -> Result<()> {
        let func = instance
            .get_func(name)
            .with_context(|| format!("failed to find function export `{name}`"))?;
        let ty = func.ty(&*store);

        let mut args = self.module_args.iter();
        let mut values = Vec::new();
        for param in ty.params() {
            let arg = match args.next() {
                Some(s) => s,
                None => bail!("not enough arguments for `{name}`"),
            };
            let kind = match ValKind::from_val_type(&param) {
                Some(kind) => kind,
                None => bail!("unsupported argument type {param:?} for `{name}`"),
            };
            values.push(
                parse_arg(kind, arg)
                    .with_context(|| format!("invalid {kind} argument `{arg}` for `{name}`"))?,
            );
        }
        if args.next().is_some() {
            bail!("too many arguments for `{name}`");
        }

        let results = instance
            .call(&mut *store, name, &values)
            .with_context(|| format!("failed to invoke `{name}`"))?;
        for result in results {
            println!("{}", format_value(&result));
        }
        Ok(())
    }
}

fn parse_arg(kind: ValKind, arg: &str) -> Result<Val> {
    Ok(match kind {
        ValKind::I32 => Val::I32(arg.parse()?),
        ValKind::I64 => Val::I64(arg.parse()?),
        ValKind::F32 => Val::F32(arg.parse::<f32>()?.to_bits()),
        ValKind::F64 => Val::F64(arg.parse::<f64>()?.to_bits()),
    })
}
