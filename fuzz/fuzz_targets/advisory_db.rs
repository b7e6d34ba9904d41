#![no_main]

use libfuzzer_sys::fuzz_target;
use strata_ospkg::{AdvisoryDb, AdvisorySource};

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data)
        && let Ok(db) = AdvisoryDb::from_json(content)
    {
        let _ = db.get("alma 8", "httpd");
        let _ = db.get("amazon linux 2", "curl");
    }
});
