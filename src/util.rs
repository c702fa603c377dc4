/// Small helpers shared across modules: offset/line conversion and
/// FQSEN string manipulation.

/// Return the 1-based line number of a byte offset in `content`.
pub fn offset_to_line(content: &str, offset: u32) -> u32 {
    let end = (offset as usize).min(content.len());
    memchr::memchr_iter(b'\n', &content.as_bytes()[..end]).count() as u32 + 1
}

/// Extract the short (unqualified) name from a possibly namespace-qualified
/// name.
///
/// `"Foo\\Bar\\Baz"` becomes `"Baz"`, `"Baz"` stays `"Baz"`.
pub fn short_name(name: &str) -> &str {
    name.rsplit('\\').next().unwrap_or(name)
}

/// Prefix a name with `\` unless it already has one.
pub fn to_fqsen(name: &str) -> String {
    if name.starts_with('\\') {
        name.to_string()
    } else {
        format!("\\{name}")
    }
}

/// Join a namespace and a relative name into an FQSEN.
pub fn join_namespace(namespace: Option<&str>, name: &str) -> String {
    match namespace.map(|ns| ns.trim_matches('\\')).filter(|ns| !ns.is_empty()) {
        Some(ns) => format!("\\{ns}\\{name}"),
        None => format!("\\{name}"),
    }
}

/// Case-insensitive lookup key for classlikes and functions.
pub fn lookup_key(fqsen: &str) -> String {
    to_fqsen(fqsen).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_one_based() {
        let src = "<?php\n$a = 1;\n$b = 2;\n";
        assert_eq!(offset_to_line(src, 0), 1);
        assert_eq!(offset_to_line(src, 6), 2);
        assert_eq!(offset_to_line(src, 15), 3);
    }

    #[test]
    fn namespace_joining() {
        assert_eq!(join_namespace(Some("A\\B"), "C"), "\\A\\B\\C");
        assert_eq!(join_namespace(None, "C"), "\\C");
        assert_eq!(short_name("\\A\\B\\C"), "C");
    }
}
