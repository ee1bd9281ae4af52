use std::borrow::Cow;
use std::iter::repeat;
use std::path::{Component, Path, PathBuf};

use url::Url;

fn is_abs_path(s: &str) -> bool {
    if s.starts_with('/') {
        return true;
    } else if s.len() > 3 {
        let b = s.as_bytes();
        if b[1] == b':'
            && (b[2] == b'/' || b[2] == b'\\')
            && ((b[0] >= b'a' && b[0] <= b'z') || (b[0] >= b'A' && b[0] <= b'Z'))
        {
            return true;
        }
    }
    false
}

fn find_common_prefix_of_sorted_vec<'a>(items: &'a [Cow<'a, [&'a str]>]) -> Option<&'a [&'a str]> {
    if items.is_empty() {
        return None;
    }

    let shortest = &items[0];
    let mut max_idx = None;
    for seq in items.iter() {
        let mut seq_max_idx = None;
        for (idx, &comp) in shortest.iter().enumerate() {
            if seq.get(idx) != Some(&comp) {
                break;
            }
            seq_max_idx = Some(idx);
        }
        if max_idx.is_none() || seq_max_idx < max_idx {
            max_idx = seq_max_idx;
        }
    }

    max_idx.map(|max_idx| &shortest[..=max_idx])
}

/// Calculates the path from a base file to a target file.
///
/// Composed documents use this to express the sources of an inner
/// document relative to the outer document.
///
/// ```
/// # use sourcemap_verify::make_relative_path;
/// assert_eq!(&make_relative_path(
///     "/foo/bar/baz.js", "/foo/baz.map"), "../baz.map");
/// ```
pub fn make_relative_path(base: &str, target: &str) -> String {
    let target_path: Vec<_> = target
        .split(&['/', '\\'][..])
        .filter(|x| !x.is_empty())
        .collect();
    let mut base_path: Vec<_> = base
        .split(&['/', '\\'][..])
        .filter(|x| !x.is_empty())
        .collect();
    base_path.pop();

    let mut items = vec![
        Cow::Borrowed(target_path.as_slice()),
        Cow::Borrowed(base_path.as_slice()),
    ];
    items.sort_by_key(|x| x.len());

    let prefix = find_common_prefix_of_sorted_vec(&items)
        .map(|x| x.len())
        .unwrap_or(0);
    let mut rel_list: Vec<_> = repeat("../").take(base_path.len() - prefix).collect();
    let rest = target_path[prefix..].join("/");
    if !rest.is_empty() {
        rel_list.push(&rest);
    }
    if rel_list.is_empty() {
        ".".into()
    } else {
        rel_list.concat()
    }
}

/// Removes `.` and resolvable `..` components without touching the disk.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut rv = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !rv.pop() {
                    rv.push("..");
                }
            }
            other => rv.push(other.as_os_str()),
        }
    }
    rv
}

/// Resolves a source reference to a local file path.
///
/// Relative references resolve against `base_dir`, `file:` URLs are
/// converted and anything with another scheme is not a local file.
pub fn resolve_source_path(base_dir: Option<&Path>, source: &str) -> Option<PathBuf> {
    if source.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(source) {
        // single letter schemes are windows drive letters
        if url.scheme().len() > 1 {
            if url.scheme() != "file" {
                return None;
            }
            return url.to_file_path().ok().map(|x| normalize_path(&x));
        }
    }
    let path = Path::new(source);
    if is_abs_path(source) || path.is_absolute() {
        return Some(normalize_path(path));
    }
    let base_dir = base_dir?;
    Some(normalize_path(&base_dir.join(path)))
}

/// Returns a key identifying a source independent of the referring map.
///
/// Sources that resolve to a local path are keyed by that path.
pub fn source_key(base_dir: Option<&Path>, source: &str) -> String {
    match resolve_source_path(base_dir, source) {
        Some(path) => path.to_string_lossy().into_owned(),
        None => source.to_string(),
    }
}

/// Rewrites `source`, relative to `from_dir`, to be relative to `to_dir`.
pub fn rebase_source(source: &str, from_dir: Option<&Path>, to_dir: Option<&Path>) -> String {
    let (from_dir, to_dir) = match (from_dir, to_dir) {
        (Some(from_dir), Some(to_dir)) => (from_dir, to_dir),
        _ => return source.to_string(),
    };
    match resolve_source_path(Some(from_dir), source) {
        Some(abs) if !is_abs_path(source) => {
            let base = to_dir.join("_");
            make_relative_path(&base.to_string_lossy(), &abs.to_string_lossy())
        }
        _ => source.to_string(),
    }
}

#[test]
fn test_is_abs_path() {
    assert_eq!(is_abs_path("C:\\foo.txt"), true);
    assert_eq!(is_abs_path("d:/foo.txt"), true);
    assert_eq!(is_abs_path("foo.txt"), false);
    assert_eq!(is_abs_path("/foo.txt"), true);
    assert_eq!(is_abs_path("/"), true);
}

#[test]
fn test_make_relative_path() {
    assert_eq!(
        &make_relative_path("/foo/bar/baz.js", "/foo/bar/baz.map"),
        "baz.map"
    );
    assert_eq!(
        &make_relative_path("/foo/bar/.", "/foo/bar/baz.map"),
        "baz.map"
    );
    assert_eq!(
        &make_relative_path("/foo/bar/baz.js", "/foo/baz.map"),
        "../baz.map"
    );
    assert_eq!(&make_relative_path("foo.txt", "foo.js"), "foo.js");
    assert_eq!(&make_relative_path("blah/foo.txt", "foo.js"), "../foo.js");
    assert_eq!(
        &make_relative_path("/w/chain/_", "/w/src/a/b.js"),
        "../src/a/b.js"
    );
}

#[test]
fn test_resolve_source_path() {
    let base = Path::new("/w/out");
    assert_eq!(
        resolve_source_path(Some(base), "../src/./a.js"),
        Some(PathBuf::from("/w/src/a.js"))
    );
    assert_eq!(
        resolve_source_path(None, "file:///w/src/a.js"),
        Some(PathBuf::from("/w/src/a.js"))
    );
    assert_eq!(resolve_source_path(Some(base), "https://x.invalid/a.js"), None);
    assert_eq!(resolve_source_path(None, "a.js"), None);
    assert_eq!(
        rebase_source("../src/a.js", Some(Path::new("/w/out")), Some(Path::new("/w/chain/out"))),
        "../../src/a.js"
    );
}
