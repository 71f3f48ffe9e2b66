/// Converts an internal binary name (`java/lang/Object`) to its canonical
/// dotted form (`java.lang.Object`).
pub fn canonical_name(internal: &str) -> String {
    internal
        .strip_suffix(".class")
        .unwrap_or(internal)
        .replace('/', ".")
}

/// Derives a canonical class name from an archive entry path such as
/// `com/example/Widget.class`.
pub fn canonical_name_from_entry(entry_name: &str) -> String {
    canonical_name(entry_name.trim_start_matches('/'))
}
