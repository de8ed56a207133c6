#![cfg(test)]

// Property tests for RawTable kept inside the crate so they can reach the
// structural layer and its chain recount directly.

use crate::config::TableConfig;
use crate::error::TableError;
use crate::raw_table::RawTable;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

// Pool-indexed operations shrink toward earlier keys and shorter op lists.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Replace(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(Vec<u8>),
    Resize(usize),
    Walk,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<OpI>)> {
    // Short keys (0..=5 bytes) so odd lengths, the empty key and shared
    // prefixes of different length all show up.
    proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..=5), 1..=12)
        .prop_flat_map(|pool| {
            let idxs: Vec<usize> = (0..pool.len()).collect();
            let idx = proptest::sample::select(idxs);
            let contains_pool = proptest::sample::select(pool.clone());
            let op = prop_oneof![
                3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
                1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Replace(i, v)),
                2 => idx.clone().prop_map(OpI::Remove),
                1 => idx.clone().prop_map(OpI::Get),
                1 => prop_oneof![
                    contains_pool,
                    proptest::collection::vec(any::<u8>(), 0..=5)
                ]
                .prop_map(OpI::Contains),
                1 => (1usize..=40).prop_map(OpI::Resize),
                1 => Just(OpI::Walk),
                1 => Just(OpI::Iterate),
            ];
            proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
        })
}

fn run(config: TableConfig, pool: Vec<Vec<u8>>, ops: Vec<OpI>) -> Result<(), TestCaseError> {
    let mut sut: RawTable<Vec<u8>, i32> = RawTable::with_config(config).unwrap();
    let mut model: HashMap<Vec<u8>, i32> = HashMap::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = pool[i].clone();
                let displaced = sut.insert(k.clone(), v).unwrap();
                let prev = model.insert(k.clone(), v);
                prop_assert_eq!(displaced, prev.map(|pv| (k, pv)));
            }
            OpI::Replace(i, v) => {
                let k = pool[i].clone();
                match model.get_mut(&k) {
                    Some(slot) => {
                        let old = *slot;
                        *slot = v;
                        prop_assert_eq!(sut.replace(k.clone(), v), Ok((k, old)));
                    }
                    None => {
                        prop_assert_eq!(sut.replace(k, v), Err(TableError::NotFound));
                    }
                }
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                match sut.remove(k) {
                    Ok((kk, vv)) => {
                        prop_assert_eq!(&kk, k);
                        prop_assert_eq!(Some(vv), model.remove(k));
                    }
                    Err(e) => {
                        prop_assert_eq!(e, TableError::NotFound);
                        prop_assert!(!model.contains_key(k));
                    }
                }
            }
            OpI::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k).map(|(_, v)| *v), model.get(k).copied());
            }
            OpI::Contains(k) => {
                prop_assert_eq!(sut.contains_key(&k), model.contains_key(&k));
            }
            OpI::Resize(n) => {
                let res = sut.resize(n);
                if n < config.initial_buckets {
                    let out_of_range = matches!(res, Err(TableError::CapacityOutOfRange { .. }));
                    prop_assert!(out_of_range, "resize below the floor accepted");
                } else {
                    prop_assert!(res.is_ok());
                    prop_assert_eq!(sut.bucket_count(), n);
                }
            }
            OpI::Walk => {
                let mut cursor = sut.cursor();
                let mut seen = Vec::new();
                while !sut.cursor_is_done(&cursor) {
                    seen.push(sut.cursor_next(&mut cursor).clone());
                }
                let unique: BTreeSet<_> = seen.iter().cloned().collect();
                prop_assert_eq!(unique.len(), seen.len(), "cursor yielded a key twice");
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(unique, m_keys);
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.iter().map(|(k, _)| k.clone()).collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.chained_len(), model.len());
        prop_assert!(sut.bucket_count() >= config.initial_buckets);
    }
    Ok(())
}

// Property: State-machine equivalence against std::collections::HashMap on a
// tiny table that grows and shrinks constantly.
// - Duplicate inserts replace and return the displaced pair.
// - remove hands back the stored pair or NotFound.
// - Cursor walks and iteration yield the model's key set exactly once.
// - len() and the chain recount agree with the model after every op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run(TableConfig { initial_buckets: 1, growth_ratio: 1 }, pool, ops)?;
    }
}

// Property: Same invariants with every key forced into one chain (one
// bucket, growth effectively disabled) to stress chain search and unlinking.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_single_chain((pool, ops) in arb_scenario()) {
        let ops: Vec<OpI> = ops.into_iter().filter(|op| !matches!(op, OpI::Resize(_))).collect();
        run(TableConfig { initial_buckets: 1, growth_ratio: usize::MAX }, pool, ops)?;
    }
}
