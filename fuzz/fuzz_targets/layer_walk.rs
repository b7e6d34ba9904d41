#![no_main]

use std::io::{Cursor, Read};

use libfuzzer_sys::fuzz_target;
use strata_walker::{LayerTar, WalkerConfigBuilder};
use tokio_util::sync::CancellationToken;

fuzz_target!(|data: &[u8]| {
    // 작은 임계값으로 메모리/임시 파일 경로를 모두 거치게 함
    let Ok(config) = WalkerConfigBuilder::new()
        .skip_dirs(vec!["usr/share/doc".to_owned()])
        .memory_threshold(64)
        .build()
    else {
        return;
    };
    let Ok(walker) = LayerTar::new(&config) else {
        return;
    };

    let _ = walker.walk("fuzz", Cursor::new(data), &CancellationToken::new(), |path, _, file| {
        assert!(!path.starts_with('/'), "paths must be relative: {path}");
        let mut first = Vec::new();
        file.open()?.read_to_end(&mut first)?;
        let mut second = Vec::new();
        file.open()?.read_to_end(&mut second)?;
        assert_eq!(first, second, "reopened content must match");
        Ok(())
    });
});
