use super::{instantiate, store, store_with};
use anyhow::Result;
use hostlink::environment::{self, CONSOLE, JS, LOG_MEMORY, LOG_NUMBER, LOG_STRING};
use hostlink::{log_number, Config, Error, Import, Instantiator, Signature, ValKind};

#[test]
fn provides_the_three_standard_imports() -> Result<()> {
    let (mut store, _) = store();
    let (resolver, arena) = environment::standard_imports(&mut store)?;
    let table = resolver.build();
    assert_eq!(table.len(), 3);

    for name in [LOG_NUMBER, LOG_STRING] {
        match table.get(CONSOLE, name) {
            Some(Import::Func(f)) => {
                assert_eq!(f.signature(), &Signature::new([ValKind::I32], None));
                assert_eq!(f.name(), name);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
    match table.get(JS, LOG_MEMORY) {
        Some(Import::Memory(m)) => assert_eq!(m.size_pages(&store), arena.size_pages(&store)),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(arena.size_pages(&store), 1);
    assert_eq!(arena.maximum_pages(&store), None);
    Ok(())
}

#[test]
fn memory_size_comes_from_config() -> Result<()> {
    let mut config = Config::new();
    config.initial_pages(2).max_pages(Some(3));
    let (mut store, _) = store_with(config);
    let (_, arena) = environment::standard_imports(&mut store)?;
    assert_eq!(arena.size_pages(&store), 2);
    assert_eq!(arena.maximum_pages(&store), Some(3));

    let mut config = Config::new();
    config.initial_pages(4).max_pages(Some(3));
    let (mut store, _) = store_with(config);
    let err = environment::standard_imports(&mut store).unwrap_err();
    assert!(matches!(err, Error::Allocation { pages: 4, .. }));
    Ok(())
}

#[test]
fn resolver_stays_open_for_extension() -> Result<()> {
    let (mut store, sink) = store();
    let (mut resolver, _) = environment::standard_imports(&mut store)?;
    resolver.register_function(CONSOLE, "logDouble", log_number(ValKind::F64))?;
    assert!(resolver
        .register_function(CONSOLE, LOG_NUMBER, log_number(ValKind::I64))
        .is_err());

    let instantiator = Instantiator::new(store.engine());
    let module = instantiator.compile_blocking(
        br#"
        (module
          (import "console" "logDouble" (func $log (param f64)))
          (import "console" "logNumber" (func (param i32)))
          (func (export "half")
            f64.const 0.5
            call $log))
        "#,
    )?;
    let instance = instantiator.instantiate_module(&mut store, &module, &resolver.build())?;
    instance.call(&mut store, "half", &[])?;
    assert_eq!(sink.take(), ["0.5"]);
    Ok(())
}

#[test]
fn unused_imports_need_not_be_declared() -> Result<()> {
    let (mut store, sink) = store();
    let (instance, _) = instantiate(&mut store, "(module)")?;
    assert!(instance.exports().next().is_none());
    assert!(instance.imported_memories().is_empty());
    assert!(sink.lines().is_empty());
    Ok(())
}
