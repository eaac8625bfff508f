//! Property-based tests for allocator correctness
//!
//! Drives random save/delete/rename/defrag sequences against a small store
//! and checks it against a plain map model after every step

use imffs::{FileStore, ImffsError, BLOCK_SIZE};
use proptest::prelude::*;
use std::collections::BTreeMap;

const ARENA_BLOCKS: usize = 32;

#[derive(Debug, Clone)]
enum Op {
    Save { name: usize, size: usize, byte: u8 },
    Delete { name: usize },
    Rename { from: usize, to: usize },
    Defrag,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..8, 0usize..(6 * BLOCK_SIZE), any::<u8>())
            .prop_map(|(name, size, byte)| Op::Save { name, size, byte }),
        2 => (0usize..8).prop_map(|name| Op::Delete { name }),
        1 => (0usize..8, 0usize..8).prop_map(|(from, to)| Op::Rename { from, to }),
        1 => Just(Op::Defrag),
    ]
}

fn name(i: usize) -> String {
    format!("file{}", i)
}

fn pattern(size: usize, byte: u8) -> Vec<u8> {
    (0..size).map(|i| byte.wrapping_add(i as u8)).collect()
}

fn assert_matches_model(store: &FileStore, model: &BTreeMap<String, Vec<u8>>) {
    store.verify().unwrap();
    assert_eq!(store.list().len(), model.len());

    for (name, content) in model {
        assert_eq!(&store.load_bytes(name).unwrap(), content, "content of {}", name);
        assert_eq!(store.metadata(name).unwrap().size, content.len() as u64);
    }

    let used: u64 = model
        .values()
        .map(|c| (c.len() as u64).div_ceil(BLOCK_SIZE as u64))
        .sum();
    assert_eq!(store.stats().used_blocks, used);
}

proptest! {
    #[test]
    fn prop_store_matches_model(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut store = FileStore::new(ARENA_BLOCKS).unwrap();
        let mut model: BTreeMap<String, Vec<u8>> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Save { name: i, size, byte } => {
                    let content = pattern(size, byte);
                    match store.save_bytes(&name(i), &content) {
                        Ok(written) => {
                            prop_assert_eq!(written, size as u64);
                            prop_assert!(model.insert(name(i), content).is_none());
                        }
                        Err(ImffsError::AlreadyExists(_)) => {
                            prop_assert!(model.contains_key(&name(i)));
                        }
                        Err(ImffsError::OutOfSpace) => {
                            let free = store.stats().free_blocks;
                            prop_assert!((size as u64).div_ceil(BLOCK_SIZE as u64) > free);
                        }
                        Err(e) => return Err(TestCaseError::fail(e.to_string())),
                    }
                }
                Op::Delete { name: i } => {
                    let result = store.delete(&name(i));
                    prop_assert_eq!(result.is_ok(), model.remove(&name(i)).is_some());
                }
                Op::Rename { from, to } => {
                    let result = store.rename(&name(from), &name(to));
                    if from == to {
                        prop_assert_eq!(result.is_ok(), model.contains_key(&name(from)));
                    } else if !model.contains_key(&name(from)) {
                        prop_assert!(matches!(result, Err(ImffsError::NotFound(_))));
                    } else if model.contains_key(&name(to)) {
                        prop_assert!(matches!(result, Err(ImffsError::AlreadyExists(_))));
                    } else {
                        prop_assert!(result.is_ok());
                        let content = model.remove(&name(from)).unwrap();
                        model.insert(name(to), content);
                    }
                }
                Op::Defrag => {
                    store.defrag().unwrap();
                }
            }

            assert_matches_model(&store, &model);
        }
    }

    #[test]
    fn prop_defrag_never_moves_first_run_up(
        sizes in prop::collection::vec(1usize..(4 * BLOCK_SIZE), 2..12),
        deletions in prop::collection::vec(any::<bool>(), 12)
    ) {
        let mut store = FileStore::new(ARENA_BLOCKS).unwrap();
        let mut model = BTreeMap::new();

        for (i, size) in sizes.iter().enumerate() {
            let content = pattern(*size, i as u8);
            if store.save_bytes(&name(i), &content).is_ok() {
                model.insert(name(i), content);
            }
        }
        for (i, delete) in deletions.iter().enumerate() {
            if *delete && model.remove(&name(i)).is_some() {
                store.delete(&name(i)).unwrap();
            }
        }
        // Refill holes so that some files end up split
        for i in 8..12 {
            let content = pattern(3 * BLOCK_SIZE, i as u8);
            if store.save_bytes(&name(i), &content).is_ok() {
                model.insert(name(i), content);
            }
        }

        let starts_before: BTreeMap<String, u64> = model
            .keys()
            .filter_map(|n| store.runs(n).unwrap().first().map(|r| (n.clone(), r.start)))
            .collect();
        let runs_before: usize = model.keys().map(|n| store.runs(n).unwrap().len()).sum();

        let report = store.defrag().unwrap();
        assert_matches_model(&store, &model);

        for (n, before) in &starts_before {
            let after = store.runs(n).unwrap()[0].start;
            prop_assert!(after <= *before, "{} moved up from {} to {}", n, before, after);
        }

        let runs_after: usize = model.keys().map(|n| store.runs(n).unwrap().len()).sum();
        prop_assert!(runs_after <= runs_before);
        prop_assert_eq!(report.runs_merged, runs_before - runs_after);
    }
}
