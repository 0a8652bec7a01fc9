use super::query::Options;
use super::record::FileRecord;
use super::security::PathGuard;

/// Decides which enumerated entries are discarded before matching.
pub struct EntryFilter<'a> {
    show_hidden: bool,
    dirs_only: bool,
    guard: &'a PathGuard,
}

impl<'a> EntryFilter<'a> {
    pub fn new(options: &Options, guard: &'a PathGuard) -> Self {
        Self {
            show_hidden: options.show_hidden_files,
            dirs_only: options.dirs_only,
            guard,
        }
    }

    /// Filter used by rename and delete: hidden files are visible.
    pub fn for_mutation(guard: &'a PathGuard) -> Self {
        Self {
            show_hidden: true,
            dirs_only: false,
            guard,
        }
    }

    pub fn excludes(&self, record: &FileRecord) -> bool {
        if record.name == "." || record.name == ".." {
            return true;
        }
        if !self.show_hidden && (record.is_hidden || record.name.starts_with('.')) {
            return true;
        }
        if self.dirs_only && !record.is_directory {
            return true;
        }
        self.guard.is_denied(&record.path)
    }
}
