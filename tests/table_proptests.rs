use chain_table::{BorrowedAll, Owned, Table, TableError};
use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

const KEYS: usize = 8;
const VALUES: usize = 6;

// Model borrowed-entry accounting: every entry that leaves an all-reference
// table through insert-over, remove or destroy is reported exactly once;
// replace reports only the displaced key; steal never reports.
proptest! {
    #[test]
    fn prop_all_ref_finalizer_accounting(
        ratio in 1usize..=3,
        ops in proptest::collection::vec((0u8..=4u8, 0..KEYS, 0..VALUES), 1..120),
    ) {
        let keys: Vec<u32> = (0..KEYS as u32).collect();
        let values: Vec<u32> = (0..VALUES as u32).map(|i| 1000 + i).collect();
        let fin_keys = RefCell::new(Vec::new());
        let fin_values = RefCell::new(Vec::new());
        let mut expect_keys = Vec::new();
        let mut expect_values = Vec::new();
        // key index -> value index
        let mut model: HashMap<usize, usize> = HashMap::new();

        let mut t: Table<u32, u32, BorrowedAll> = Table::builder(BorrowedAll)
            .initial_buckets(1)
            .growth_ratio(ratio)
            .key_finalizer(|k: &u32| fin_keys.borrow_mut().push(*k))
            .value_finalizer(|v: &u32| fin_values.borrow_mut().push(*v))
            .build()
            .unwrap();

        for (op, k, v) in ops {
            match op {
                // Insert over an existing key reports the displaced pair
                0 => {
                    t.insert(&keys[k], &values[v]).unwrap();
                    if let Some(old) = model.insert(k, v) {
                        expect_keys.push(keys[k]);
                        expect_values.push(values[old]);
                    }
                }
                // Remove reports the pair or fails untouched
                1 => match model.remove(&k) {
                    Some(old) => {
                        t.remove(&keys[k]).unwrap();
                        expect_keys.push(keys[k]);
                        expect_values.push(values[old]);
                    }
                    None => prop_assert_eq!(t.remove(&keys[k]), Err(TableError::NotFound)),
                },
                // Steal hands back the caller's references silently
                2 => match model.remove(&k) {
                    Some(old) => {
                        let (sk, sv) = t.steal(&keys[k]).unwrap();
                        prop_assert!(std::ptr::eq(sk, &keys[k]));
                        prop_assert!(std::ptr::eq(sv, &values[old]));
                    }
                    None => prop_assert!(t.steal(&keys[k]).is_err()),
                },
                // Replace reports the displaced key but never the value
                3 => {
                    let res = t.replace(&keys[k], &values[v]);
                    match model.get_mut(&k) {
                        Some(slot) => {
                            prop_assert!(res.is_ok());
                            expect_keys.push(keys[k]);
                            *slot = v;
                        }
                        None => prop_assert_eq!(res, Err(TableError::NotFound)),
                    }
                }
                4 => {
                    prop_assert_eq!(t.lookup(&keys[k]), model.get(&k).map(|&i| &values[i]));
                }
                _ => unreachable!(),
            }

            // Invariants after each step
            prop_assert_eq!(t.len(), model.len());
            prop_assert_eq!(t.chained_len(), model.len());
            prop_assert_eq!(fin_keys.borrow().len(), expect_keys.len());
            prop_assert_eq!(fin_values.borrow().len(), expect_values.len());
        }

        for (&k, &v) in &model {
            expect_keys.push(keys[k]);
            expect_values.push(values[v]);
        }
        t.destroy();

        let mut got_keys = fin_keys.borrow().clone();
        let mut got_values = fin_values.borrow().clone();
        got_keys.sort_unstable();
        got_values.sort_unstable();
        expect_keys.sort_unstable();
        expect_values.sort_unstable();
        prop_assert_eq!(got_keys, expect_keys);
        prop_assert_eq!(got_values, expect_values);
    }
}

// Cursor walks over an owned table yield exactly the inserted key set, no
// matter how often the table grew or shrank on the way there.
proptest! {
    #[test]
    fn prop_owned_cursor_walk_matches_key_set(
        inserts in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..6), 0..200),
        removals in proptest::collection::vec(any::<prop::sample::Index>(), 0..100),
    ) {
        let mut t: Table<[u8], [u8], Owned> = Table::builder(Owned)
            .initial_buckets(2)
            .growth_ratio(2)
            .build()
            .unwrap();
        let mut model: BTreeSet<Vec<u8>> = BTreeSet::new();
        for k in &inserts {
            t.insert(&k[..], &k[..]).unwrap();
            model.insert(k.clone());
        }
        if !inserts.is_empty() {
            for ix in removals {
                let k = ix.get(&inserts);
                prop_assert_eq!(t.remove(k).is_ok(), model.remove(k));
            }
        }

        let mut walked = Vec::new();
        t.iter_reset();
        while !t.iter_is_done() {
            walked.push(t.iter_next().to_vec());
        }
        let unique: BTreeSet<Vec<u8>> = walked.iter().cloned().collect();
        prop_assert_eq!(unique.len(), walked.len(), "cursor yielded a key twice");
        prop_assert_eq!(&unique, &model);
        for k in &model {
            prop_assert_eq!(t.lookup(k), Some(&k[..]));
        }
    }
}
