use super::{instantiate, store, GUEST};
use anyhow::Result;
use hostlink::{environment, ExportRegistry, Instantiator};
use std::sync::Arc;

#[test]
fn starts_empty() {
    let registry = ExportRegistry::new();
    assert!(!registry.is_registered());
    assert!(registry.get().is_none());
    assert!(registry.clear().is_none());
}

#[test]
fn registration_replaces_and_clear_withdraws() -> Result<()> {
    let (mut store, _) = store();
    let registry = ExportRegistry::default();

    let (first, _) = instantiate(&mut store, GUEST)?;
    let first = registry.register(first);
    assert!(Arc::ptr_eq(&first, &registry.get().unwrap()));

    let (second, _) = instantiate(&mut store, GUEST)?;
    let second = registry.register(second);
    assert!(Arc::ptr_eq(&second, &registry.get().unwrap()));
    assert!(!Arc::ptr_eq(&first, &second));

    // Handles taken earlier stay valid.
    let add = first.typed_func::<(i32, i32), i32>(&store, "add")?;
    assert_eq!(add.call(&mut store, (1, 1))?, 2);

    let cleared = registry.clear().unwrap();
    assert!(Arc::ptr_eq(&cleared, &second));
    assert!(!registry.is_registered());
    Ok(())
}

#[tokio::test]
async fn failed_instantiation_keeps_previous_registration() -> Result<()> {
    let (mut store, _) = store();
    let (resolver, _) = environment::standard_imports(&mut store)?;
    let table = resolver.build();
    let registry = ExportRegistry::new();
    let instantiator = Instantiator::new(store.engine());

    let good = instantiator
        .instantiate_and_register(&mut store, GUEST.as_bytes(), &table, &registry)
        .await?;

    assert!(instantiator
        .instantiate_and_register(&mut store, b"garbage", &table, &registry)
        .await
        .is_err());
    assert!(instantiator
        .instantiate_and_register(
            &mut store,
            br#"(module (import "env" "missing" (func)))"#,
            &table,
            &registry,
        )
        .await
        .is_err());

    assert!(Arc::ptr_eq(&good, &registry.get().unwrap()));
    Ok(())
}

#[test]
fn global_registry_is_shared() -> Result<()> {
    let (mut store, _) = store();
    let (instance, _) = instantiate(&mut store, GUEST)?;

    let registered = ExportRegistry::global().register(instance);
    let seen = std::thread::spawn(|| ExportRegistry::global().is_registered())
        .join()
        .unwrap();
    assert!(seen);

    let cleared = ExportRegistry::global().clear().unwrap();
    assert!(Arc::ptr_eq(&registered, &cleared));
    Ok(())
}
