//! Fuzz target: `wire::decode_variables`
//!
//! Feeds arbitrary text to the pull decoder and asserts that a decoded
//! list is well formed and survives a snapshot re-encode unchanged.
//!
//! cargo fuzz run fuzz_pull_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use varsync::VariableCache;
use varsync::sync::wire::{decode_variables, encode_variables};

fuzz_target!(|data: &[u8]| {
    let Ok(body) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(vars) = decode_variables(body) else {
        return;
    };

    let mut cache = VariableCache::new();
    for v in &vars {
        assert!(!v.name.is_empty(), "decoder yielded an empty name");
        cache.set(&v.name, v.var_type, &v.value);
    }

    // Last entry per name wins in the cache; the snapshot must reflect it.
    let again = decode_variables(&encode_variables(cache.iter()))
        .expect("snapshot of decoded variables must decode");
    assert_eq!(again.len(), cache.len());
    for v in again {
        let held = cache.get(&v.name).expect("snapshot name missing from cache");
        assert_eq!(v.var_type, held.var_type);
        assert_eq!(v.value, held.value);
    }
});
