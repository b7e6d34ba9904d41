//! In-memory tar fixtures shared by the walker integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use tar::{EntryType, Header};

/// One entry of a fixture layer.
pub enum Node<'a> {
    File(&'a str, &'a [u8]),
    Dir(&'a str),
    Symlink(&'a str, &'a str),
    Hardlink(&'a str, &'a str),
    /// Entry whose name is written verbatim (no path validation by the builder).
    Raw(&'a str, &'a [u8]),
}

fn header(kind: EntryType, size: u64, mode: u32) -> Header {
    let mut h = Header::new_gnu();
    h.set_entry_type(kind);
    h.set_size(size);
    h.set_mode(mode);
    h.set_mtime(1_700_000_000);
    h
}

/// Builds an uncompressed tar archive from `nodes` in order.
pub fn build_tar(nodes: &[Node<'_>]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for node in nodes {
        match node {
            Node::File(path, data) => {
                let mut h = header(EntryType::Regular, data.len() as u64, 0o644);
                builder.append_data(&mut h, path, *data).unwrap();
            }
            Node::Dir(path) => {
                let mut h = header(EntryType::Directory, 0, 0o755);
                builder.append_data(&mut h, path, std::io::empty()).unwrap();
            }
            Node::Symlink(path, target) => {
                let mut h = header(EntryType::Symlink, 0, 0o777);
                h.set_link_name(target).unwrap();
                builder.append_data(&mut h, path, std::io::empty()).unwrap();
            }
            Node::Hardlink(path, target) => {
                let mut h = header(EntryType::Link, 0, 0o644);
                h.set_link_name(target).unwrap();
                builder.append_data(&mut h, path, std::io::empty()).unwrap();
            }
            Node::Raw(path, data) => {
                let mut h = header(EntryType::Regular, data.len() as u64, 0o644);
                let name = &mut h.as_old_mut().name;
                name[..path.len()].copy_from_slice(path.as_bytes());
                h.set_cksum();
                builder.append(&h, *data).unwrap();
            }
        }
    }
    builder.into_inner().unwrap()
}

/// Gzip-compresses `data`.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Writes `data` to `dir/name` and returns the full path.
pub fn write_layer(dir: &Path, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}
