#![no_main]

use libfuzzer_sys::fuzz_target;
use strata_ospkg::{DebComparator, VersionComparator};

fuzz_target!(|input: (&str, &str)| {
    let (a, b) = input;
    let cmp = DebComparator;
    if let (Ok(ab), Ok(ba)) = (cmp.compare(a, b), cmp.compare(b, a)) {
        assert_eq!(ab, ba.reverse(), "comparison must be antisymmetric: {a:?} {b:?}");
    }
    if let Ok(aa) = cmp.compare(a, a) {
        assert!(aa.is_eq(), "comparison must be reflexive: {a:?}");
    }
});
