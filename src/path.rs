//! File name helpers shared by the loader and format modules.

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Replaces the extension of the file name portion of `path`.
///
/// An empty `ext` removes the extension. A name without an extension gets
/// `.ext` appended. Dots in directory names are never touched.
pub fn set_extension(path: &str, ext: &str) -> String {
    let file_start = path.rfind(is_separator).map_or(0, |i| i + 1);
    let dot = path[file_start..].rfind('.').map(|i| file_start + i);

    match (dot, ext.is_empty()) {
        (Some(dot), true) => path[..dot].to_string(),
        (Some(dot), false) => format!("{}.{}", &path[..dot], ext),
        (None, true) => path.to_string(),
        (None, false) => format!("{}.{}", path, ext),
    }
}

/// Converts DOS separators to `/`.
pub fn unixify(path: &str) -> String {
    path.replace('\\', "/")
}

/// Directory portion of `path` including the trailing separator, unixified.
/// Empty when `path` has no directory.
pub fn directory(path: &str) -> String {
    match path.rfind(is_separator) {
        Some(i) => unixify(&path[..=i]),
        None => String::new(),
    }
}
