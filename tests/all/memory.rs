use super::{store, store_with};
use anyhow::Result;
use hostlink::{Config, Error, MemoryArena, MAX_PAGES, WASM_PAGE_SIZE};

#[test]
fn created_memory_is_zeroed() -> Result<()> {
    let (mut store, _) = store();
    for (initial, max) in [(0, Some(0)), (1, None), (2, Some(4)), (3, Some(3))] {
        let arena = MemoryArena::create(&mut store, initial, max)?;
        assert_eq!(arena.size_pages(&store), u64::from(initial));
        assert_eq!(arena.maximum_pages(&store), max.map(u64::from));

        let len = u64::from(initial) * WASM_PAGE_SIZE;
        let bytes = arena.view_bytes(&store, 0, len)?;
        assert_eq!(bytes.len() as u64, len);
        assert!(bytes.iter().all(|&b| b == 0));
    }
    Ok(())
}

#[test]
fn create_rejects_bad_limits() {
    let (mut store, _) = store();
    let err = MemoryArena::create(&mut store, 3, Some(2)).unwrap_err();
    assert!(matches!(err, Error::Allocation { pages: 3, .. }));

    let err = MemoryArena::create(&mut store, MAX_PAGES + 1, None).unwrap_err();
    assert!(matches!(err, Error::Allocation { .. }));

    let err = MemoryArena::create(&mut store, 1, Some(MAX_PAGES + 1)).unwrap_err();
    assert!(matches!(err, Error::Allocation { pages: 1, .. }));
}

#[test]
fn grow_returns_previous_size() -> Result<()> {
    let (mut store, _) = store();
    let arena = MemoryArena::create(&mut store, 1, Some(4))?;

    assert_eq!(arena.grow(&mut store, 1)?, 1);
    assert_eq!(arena.grow(&mut store, 0)?, 2);
    assert_eq!(arena.grow(&mut store, 2)?, 2);
    assert_eq!(arena.size_pages(&store), 4);
    assert_eq!(arena.data_size(&store) as u64, 4 * WASM_PAGE_SIZE);

    let err = arena.grow(&mut store, 1).unwrap_err();
    assert!(matches!(
        err,
        Error::Growth {
            current: 4,
            delta: 1,
            ..
        }
    ));
    assert_eq!(arena.size_pages(&store), 4);

    assert!(arena.grow(&mut store, u64::MAX).is_err());
    assert_eq!(arena.size_pages(&store), 4);
    Ok(())
}

#[test]
fn growth_keeps_contents_and_zeroes_new_pages() -> Result<()> {
    let (mut store, _) = store();
    let arena = MemoryArena::create(&mut store, 1, None)?;
    arena.write(&mut store, 100, b"abc")?;

    arena.grow(&mut store, 1)?;

    let mut buf = [0; 3];
    arena.read(&store, 100, &mut buf)?;
    assert_eq!(&buf, b"abc");
    let fresh = arena.view_bytes(&store, WASM_PAGE_SIZE, WASM_PAGE_SIZE)?;
    assert!(fresh.iter().all(|&b| b == 0));
    Ok(())
}

#[test]
fn views_are_bounds_checked() -> Result<()> {
    let (mut store, _) = store();
    let arena = MemoryArena::create(&mut store, 1, None)?;
    let size = WASM_PAGE_SIZE;

    for (offset, length) in [
        (0, 0),
        (0, size),
        (size, 0),
        (size - 1, 1),
        (10, 20),
        (size, 1),
        (size - 1, 2),
        (0, size + 1),
        (size + 1, 0),
        (u64::MAX, 1),
    ] {
        let in_bounds = offset.checked_add(length).is_some_and(|end| end <= size);
        match arena.view_bytes(&store, offset, length) {
            Ok(view) => {
                assert!(in_bounds, "{offset}+{length} should be out of bounds");
                assert_eq!(view.len() as u64, length);
            }
            Err(Error::OutOfBounds {
                offset: o,
                length: l,
                size: s,
            }) => {
                assert!(!in_bounds, "{offset}+{length} should be in bounds");
                assert_eq!((o, l, s), (offset, length, size));
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
        assert_eq!(
            arena.view_bytes_mut(&mut store, offset, length).is_ok(),
            in_bounds
        );
    }
    Ok(())
}

#[test]
fn write_past_end_leaves_memory_untouched() -> Result<()> {
    let (mut store, _) = store();
    let arena = MemoryArena::create(&mut store, 1, None)?;
    let err = arena
        .write(&mut store, WASM_PAGE_SIZE - 1, b"xy")
        .unwrap_err();
    assert!(matches!(err, Error::OutOfBounds { length: 2, .. }));
    assert_eq!(arena.data(&store)[WASM_PAGE_SIZE as usize - 1], 0);
    Ok(())
}

#[test]
fn budget_limits_creation_and_growth() -> Result<()> {
    let mut config = Config::new();
    config.max_memory_bytes(Some(WASM_PAGE_SIZE as usize));
    let (mut store, _) = store_with(config);

    let err = MemoryArena::create(&mut store, 2, None).unwrap_err();
    assert!(matches!(err, Error::Allocation { pages: 2, .. }));

    let arena = MemoryArena::create(&mut store, 1, None)?;
    let err = arena.grow(&mut store, 1).unwrap_err();
    assert!(matches!(err, Error::Growth { current: 1, .. }));
    assert_eq!(arena.size_pages(&store), 1);
    Ok(())
}
