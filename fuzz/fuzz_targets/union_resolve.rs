#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use strata_walker::{LayerContents, resolve_bottom_up, resolve_top_down};

/// 퍼저용 레이어 입력
#[derive(Arbitrary, Debug)]
struct FuzzLayer {
    files: Vec<(FuzzPath, u8)>,
    whiteouts: Vec<FuzzPath>,
    opaque_dirs: Vec<FuzzPath>,
}

/// 작은 경로 공간 (충돌이 자주 일어나도록)
#[derive(Arbitrary, Debug)]
struct FuzzPath(Vec<u8>);

impl FuzzPath {
    fn render(&self) -> String {
        const SEGMENTS: &[&str] = &["etc", "usr", "lib", "bin", "a", "b"];
        self.0
            .iter()
            .take(4)
            .map(|b| SEGMENTS[*b as usize % SEGMENTS.len()])
            .collect::<Vec<_>>()
            .join("/")
    }
}

fuzz_target!(|input: Vec<FuzzLayer>| {
    // 레이어 수 제한 (퍼징 성능)
    let layers: Vec<LayerContents<u8>> = input
        .iter()
        .take(8)
        .enumerate()
        .map(|(i, l)| {
            let mut contents = LayerContents::new(format!("layer-{i}"));
            for (path, value) in &l.files {
                let path = path.render();
                if !path.is_empty() {
                    contents.files.insert(path, *value);
                }
            }
            contents.whiteout_files = l.whiteouts.iter().map(FuzzPath::render).collect();
            contents.opaque_dirs = l.opaque_dirs.iter().map(FuzzPath::render).collect();
            contents
        })
        .collect();

    let bottom_up = resolve_bottom_up(&layers);
    let top_down = resolve_top_down(&layers);
    assert_eq!(bottom_up, top_down, "both resolution orders must agree");
});
