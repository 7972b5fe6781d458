//! NewsgroupView: the `<name>.deleted` / `<name>.pending` virtual catalog
//! convention (§3, §4.4, §6). Every real catalog implicitly carries two
//! addressable views over its own rows; this module is the single place
//! that decides whether a dotted suffix names a virtual view or is just
//! part of an ordinary hierarchical catalog name.

/// Which subset of a catalog's rows a name addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualKind {
    /// The catalog itself: non-cancelled, non-pending rows.
    Real,
    /// `<name>.deleted`: the cancelled subset.
    Deleted,
    /// `<name>.pending`: the pending subset.
    Pending,
}

/// Split a possibly-virtual catalog name into its real name and the
/// view it addresses. A name is only treated as virtual if stripping the
/// suffix leaves a non-empty remainder, so `deleted` and `pending` alone
/// remain ordinary (if unusual) catalog names.
pub fn split_virtual_name(name: &str) -> (&str, VirtualKind) {
    if let Some(real) = name.strip_suffix(".deleted") {
        if !real.is_empty() {
            return (real, VirtualKind::Deleted);
        }
    }
    if let Some(real) = name.strip_suffix(".pending") {
        if !real.is_empty() {
            return (real, VirtualKind::Pending);
        }
    }
    (name, VirtualKind::Real)
}
