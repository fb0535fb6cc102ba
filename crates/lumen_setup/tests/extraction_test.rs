//! Integration tests for asset extraction.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use lumen_core::SetupError;
use lumen_setup::{extract, DirectorySource, ManifestSource};

fn temp_dir(tag: &str) -> PathBuf {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("lumen_extract_{tag}_{id}"))
}

/// Builds a small bundle with nested dirs, a dotted directory and an
/// undotted file.
fn make_bundle(root: &Path) {
    fs::create_dir_all(root.join("data/shaders")).unwrap();
    fs::create_dir_all(root.join("data/models/v2.0")).unwrap();
    fs::write(root.join("data/shaders/color.vert"), b"void main() {}").unwrap();
    fs::write(root.join("data/models/v2.0/cube.obj"), b"v 0 0 0\n").unwrap();
    fs::write(root.join("data/LICENSE"), b"GPL").unwrap();
    fs::write(root.join("outside.txt"), b"not extracted").unwrap();
}

/// Relative path -> contents for every file below `root`.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut out = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_path_buf();
                out.insert(rel, fs::read(&path).unwrap());
            }
        }
    }
    out
}

#[test]
fn test_extraction_copies_tree_by_metadata() {
    let bundle = temp_dir("bundle");
    let dest = temp_dir("dest");
    make_bundle(&bundle);

    let report = extract(&DirectorySource::new(&bundle), Path::new("data"), &dest).unwrap();

    assert_eq!(report.root, dest.join("data"));
    assert_eq!(report.files, 3);
    assert_eq!(report.dirs, 3);
    assert!(dest.join("data/models/v2.0").is_dir());
    assert!(dest.join("data/LICENSE").is_file());
    assert!(!dest.join("outside.txt").exists());
    assert_eq!(snapshot(&dest.join("data")), snapshot(&bundle.join("data")));

    fs::remove_dir_all(&bundle).ok();
    fs::remove_dir_all(&dest).ok();
}

#[test]
fn test_extraction_is_deterministic_and_removes_stray_files() {
    let bundle = temp_dir("bundle_det");
    let dest = temp_dir("dest_det");
    make_bundle(&bundle);
    let source = DirectorySource::new(&bundle);

    extract(&source, Path::new("data"), &dest).unwrap();
    let first = snapshot(&dest);

    fs::write(dest.join("data/stray.tmp"), b"left over").unwrap();
    fs::write(dest.join("data/shaders/color.vert"), b"corrupted").unwrap();
    extract(&source, Path::new("data"), &dest).unwrap();

    assert_eq!(snapshot(&dest), first);
    assert!(!dest.join("data/stray.tmp").exists());

    fs::remove_dir_all(&bundle).ok();
    fs::remove_dir_all(&dest).ok();
}

#[test]
fn test_missing_folder_is_setup_failure() {
    let bundle = temp_dir("bundle_missing");
    let dest = temp_dir("dest_missing");
    make_bundle(&bundle);

    let err = extract(&DirectorySource::new(&bundle), Path::new("nope"), &dest).unwrap_err();
    assert!(matches!(err, SetupError::MissingFolder(_)));
    assert!(!dest.join("nope").exists());

    fs::remove_dir_all(&bundle).ok();
}

#[test]
fn test_manifest_extraction_copies_only_listed_files() {
    let bundle = temp_dir("bundle_manifest");
    let dest = temp_dir("dest_manifest");
    make_bundle(&bundle);

    let source = ManifestSource::from_toml(
        &bundle,
        r#"
        files = ["data/shaders/color.vert", "data/LICENSE"]
        dirs = ["data/cache"]
        "#,
    )
    .unwrap();
    let report = extract(&source, Path::new("data"), &dest).unwrap();

    assert_eq!(report.files, 2);
    assert!(dest.join("data/cache").is_dir());
    assert!(!dest.join("data/models").exists());

    fs::remove_dir_all(&bundle).ok();
    fs::remove_dir_all(&dest).ok();
}

#[test]
fn test_failed_copy_aborts_and_leaves_no_partial_tree() {
    let bundle = temp_dir("bundle_fail");
    let dest = temp_dir("dest_fail");
    make_bundle(&bundle);

    // Listed but absent on disk.
    let source = ManifestSource::from_toml(
        &bundle,
        r#"files = ["data/LICENSE", "data/missing.bin"]"#,
    )
    .unwrap();
    let err = extract(&source, Path::new("data"), &dest).unwrap_err();

    assert!(matches!(err, SetupError::Source { .. }));
    assert!(!dest.join("data").exists());

    fs::remove_dir_all(&bundle).ok();
    fs::remove_dir_all(&dest).ok();
}

#[test]
fn test_escaping_folder_is_rejected_before_clearing() {
    let root = temp_dir("escape");
    let bundle = root.join("bundle");
    let dest = root.join("dest");
    make_bundle(&bundle);
    fs::create_dir_all(root.join("victim")).unwrap();
    fs::write(root.join("victim/keep.txt"), b"keep").unwrap();
    let source = DirectorySource::new(&bundle);

    for folder in [
        PathBuf::from(".."),
        PathBuf::from("../victim"),
        PathBuf::from("data/../.."),
        root.join("victim"),
    ] {
        let err = extract(&source, &folder, &dest).unwrap_err();
        assert!(
            matches!(err, SetupError::InvalidFolder(ref p) if *p == folder),
            "{folder:?}: {err}"
        );
        assert_eq!(fs::read(root.join("victim/keep.txt")).unwrap(), b"keep");
        assert!(bundle.join("data/LICENSE").is_file());
    }
    assert!(!dest.exists());

    fs::remove_dir_all(&root).ok();
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_names_are_copied_verbatim() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let bundle = temp_dir("bundle_bytes");
    let dest = temp_dir("dest_bytes");
    make_bundle(&bundle);
    let name = OsStr::from_bytes(b"tex\xff.bin");
    fs::write(bundle.join("data").join(name), b"raw").unwrap();

    let report = extract(&DirectorySource::new(&bundle), Path::new("data"), &dest).unwrap();

    assert_eq!(report.files, 4);
    assert_eq!(fs::read(dest.join("data").join(name)).unwrap(), b"raw");
    assert!(!dest.join("data/tex\u{fffd}.bin").exists());

    fs::remove_dir_all(&bundle).ok();
    fs::remove_dir_all(&dest).ok();
}

#[cfg(unix)]
#[test]
fn test_linked_directory_cycle_aborts() {
    let bundle = temp_dir("bundle_cycle");
    let dest = temp_dir("dest_cycle");
    make_bundle(&bundle);
    std::os::unix::fs::symlink(bundle.join("data"), bundle.join("data/loop")).unwrap();

    let err = extract(&DirectorySource::new(&bundle), Path::new("data"), &dest).unwrap_err();

    assert!(
        matches!(err, SetupError::DirectoryCycle(ref p) if p == Path::new("data/loop")),
        "{err}"
    );
    assert!(!dest.join("data").exists());

    fs::remove_dir_all(&bundle).ok();
    fs::remove_dir_all(&dest).ok();
}

#[cfg(unix)]
#[test]
fn test_linked_directory_outside_folder_is_copied() {
    let root = temp_dir("linked");
    let bundle = root.join("bundle");
    let dest = root.join("dest");
    make_bundle(&bundle);
    fs::create_dir_all(root.join("shared")).unwrap();
    fs::write(root.join("shared/palette.bin"), b"rgb").unwrap();
    std::os::unix::fs::symlink(root.join("shared"), bundle.join("data/shared")).unwrap();
    // The same directory reached twice on separate paths is not a cycle.
    std::os::unix::fs::symlink(root.join("shared"), bundle.join("data/models/shared")).unwrap();

    let report = extract(&DirectorySource::new(&bundle), Path::new("data"), &dest).unwrap();

    assert_eq!(report.files, 5);
    assert!(dest.join("data/shared").is_dir());
    assert!(!fs::symlink_metadata(dest.join("data/shared")).unwrap().is_symlink());
    assert_eq!(fs::read(dest.join("data/models/shared/palette.bin")).unwrap(), b"rgb");

    fs::remove_dir_all(&root).ok();
}
