//! Visibility filter applied to children before reconciliation

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::entry::Entry;
use crate::settings::TreeSettings;

/// Externally supplied predicate deciding which directories are shown.
pub trait EntryFilter: Send + Sync {
    fn accept(&self, entry: &Entry) -> bool;
}

impl<F> EntryFilter for F
where
    F: Fn(&Entry) -> bool + Send + Sync,
{
    fn accept(&self, entry: &Entry) -> bool {
        self(entry)
    }
}

/// Hidden-directory and ignore-pattern filter built from settings.
pub struct VisibilityFilter {
    show_hidden: bool,
    ignore: Option<Gitignore>,
}

impl VisibilityFilter {
    /// Accept everything.
    pub fn show_all() -> Self {
        Self {
            show_hidden: true,
            ignore: None,
        }
    }

    pub fn from_settings(settings: &TreeSettings) -> Self {
        Self {
            show_hidden: settings.show_hidden_dirs,
            ignore: build_ignore_matcher(&settings.ignore_patterns),
        }
    }
}

impl EntryFilter for VisibilityFilter {
    fn accept(&self, entry: &Entry) -> bool {
        if !self.show_hidden && entry.name().starts_with('.') {
            return false;
        }
        match &self.ignore {
            Some(matcher) => !matcher
                .matched_path_or_any_parents(entry.full_path(), entry.is_directory())
                .is_ignore(),
            None => true,
        }
    }
}

fn build_ignore_matcher(patterns: &[String]) -> Option<Gitignore> {
    if patterns.is_empty() {
        return None;
    }

    let mut builder = GitignoreBuilder::new("/");
    for pattern in patterns {
        if let Err(err) = builder.add_line(None, pattern) {
            tracing::warn!("[Filter] Invalid ignore pattern '{}': {}", pattern, err);
        }
    }

    match builder.build() {
        Ok(matcher) => Some(matcher),
        Err(err) => {
            tracing::warn!("[Filter] Failed to build ignore matcher: {}", err);
            None
        }
    }
}
