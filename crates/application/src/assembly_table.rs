//! Static registration table replacing runtime assembly scanning.

/// One registered extension assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyRef {
    /// Simple assembly name.
    pub name: &'static str,
    /// Fully qualified names of the types the assembly exposes to bindings.
    pub exported_types: &'static [&'static str],
}

/// Lookup table from symbolic names to registered assemblies.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyTable {
    entries: &'static [AssemblyRef],
}

impl AssemblyTable {
    /// Creates a table over a static registration list.
    #[must_use]
    pub const fn new(entries: &'static [AssemblyRef]) -> Self {
        Self { entries }
    }

    /// Resolves an assembly name or an exported type name.
    ///
    /// Assembly names may be fully qualified (`Name, Version=..., Culture=...`);
    /// only the simple name takes part in matching, ignoring ASCII case.
    #[must_use]
    pub fn lookup(&self, requested: &str) -> Option<AssemblyRef> {
        let simple_name = simple_assembly_name(requested);
        if simple_name.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .find(|entry| {
                entry.name.eq_ignore_ascii_case(simple_name)
                    || entry
                        .exported_types
                        .iter()
                        .any(|type_name| type_name.eq_ignore_ascii_case(simple_name))
            })
            .copied()
    }
}

/// Returns the simple name of a possibly fully-qualified assembly name.
fn simple_assembly_name(requested: &str) -> &str {
    requested
        .split(',')
        .next()
        .map(str::trim)
        .unwrap_or_default()
}
