//! Shortcut identifier allocation.

use crate::error::RegistryError;
use crate::model::{Domain, ItemRecord, ShortcutId};
use crate::tracker::InstalledSet;

pub const SEPARATOR: char = '-';

/// Picks the identifier a new shortcut for `item` is installed under.
///
/// Multi-instance items get `<base>-<n>` with the lowest free `n`, so freed
/// slots are reused. Single-instance items get `<base>` and are refused when
/// already installed, whatever the caller checked beforehand. Domains whose
/// identifiers must equal the item key never get a suffix.
pub fn allocate(domain: Domain, item: &ItemRecord, installed: &InstalledSet) -> Result<ShortcutId, RegistryError> {
    let base = domain.shortcut_base(&item.key);

    if item.multiple && !domain.single_instance_only() {
        let id = (0u64..)
            .map(|n| format!("{}{}{}", base, SEPARATOR, n))
            .find(|candidate| !installed.contains(candidate))
            .map(ShortcutId::new);
        // the probe is bounded by installed.len() + 1 candidates
        return id.ok_or_else(|| RegistryError::IdentifierInUse(ShortcutId::new(base)));
    }

    if let Some(existing) = installed.ids_for_key(&item.key).next() {
        return Err(RegistryError::AlreadyInstalled {
            domain,
            key: item.key.clone(),
            id: existing.clone(),
        });
    }
    if installed.contains(&base) {
        return Err(RegistryError::IdentifierInUse(ShortcutId::new(base)));
    }
    Ok(ShortcutId::new(base))
}
