//! Current-directory controller interface

use crate::entry::Entry;
use crate::roots::RootDescriptor;

/// Owns navigation. The tree reads the current directory and asks it to
/// change; it never navigates on its own.
pub trait DirectoryModel: Send + Sync {
    fn current_directory(&self) -> Option<Entry>;

    /// Switch the current directory to `entry`.
    fn change_directory(&self, entry: &Entry);

    /// User picked `entry` in the tree.
    fn activate_directory(&self, entry: &Entry);

    /// A root could not be resolved on activation. The controller usually
    /// falls back to a default directory.
    fn on_item_not_found(&self, root: &RootDescriptor);
}
