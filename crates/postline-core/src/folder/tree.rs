//! Builds the folder hierarchy from a flat listing.

use std::collections::HashSet;

use super::{Folder, INBOX, PROVIDER_ROOT, natural_cmp};

/// An ordered forest of folders. Each node owns its children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderTree {
    roots: Vec<Folder>,
}

impl FolderTree {
    /// Top-level folders, in display order.
    #[must_use]
    pub fn roots(&self) -> &[Folder] {
        &self.roots
    }

    /// Consumes the tree, returning the top-level folders.
    #[must_use]
    pub fn into_roots(self) -> Vec<Folder> {
        self.roots
    }

    /// Finds a folder anywhere in the tree by raw name.
    #[must_use]
    pub fn find(&self, raw_name: &str) -> Option<&Folder> {
        find_in(&self.roots, raw_name)
    }

    /// Removes and returns a folder anywhere in the tree by raw name.
    pub fn take(&mut self, raw_name: &str) -> Option<Folder> {
        take_from(&mut self.roots, raw_name)
    }

    /// Depth-first iteration over every folder.
    pub fn walk(&self) -> impl Iterator<Item = &Folder> {
        let mut stack: Vec<&Folder> = self.roots.iter().rev().collect();
        std::iter::from_fn(move || {
            let folder = stack.pop()?;
            stack.extend(folder.children.iter().rev());
            Some(folder)
        })
    }

    /// Returns true if the tree holds no folder.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

fn find_in<'a>(folders: &'a [Folder], raw_name: &str) -> Option<&'a Folder> {
    folders.iter().find_map(|f| {
        if f.raw_name == raw_name {
            Some(f)
        } else {
            find_in(&f.children, raw_name)
        }
    })
}

fn take_from(folders: &mut Vec<Folder>, raw_name: &str) -> Option<Folder> {
    if let Some(i) = folders.iter().position(|f| f.raw_name == raw_name) {
        return Some(folders.remove(i));
    }
    folders
        .iter_mut()
        .find_map(|f| take_from(&mut f.children, raw_name))
}

/// Arranges a flat folder listing into a tree.
///
/// Missing intermediate levels are filled with placeholders. Siblings are
/// ordered naturally by decoded name, except that the inbox comes first,
/// the provider root follows it, and names starting with a modified UTF-7
/// escape go last.
#[must_use]
pub fn build_tree(folders: Vec<Folder>) -> FolderTree {
    let mut entries: Vec<Folder> = Vec::with_capacity(folders.len());
    for folder in folders {
        match entries.iter().position(|f| f.raw_name == folder.raw_name) {
            Some(i) => entries[i] = folder,
            None => entries.push(folder),
        }
    }

    let placeholders = missing_levels(&entries);
    entries.extend(placeholders);
    entries.sort_by(|a, b| natural_cmp(&a.full_name, &b.full_name));

    let mut top = Vec::new();
    let mut middle = Vec::with_capacity(entries.len());
    let mut foot = Vec::new();
    for folder in entries {
        if folder.raw_name.starts_with('&') {
            foot.push(folder);
        } else if folder.raw_name.eq_ignore_ascii_case(INBOX) {
            top.insert(0, folder);
        } else if folder.raw_name.eq_ignore_ascii_case(PROVIDER_ROOT) {
            top.push(folder);
        } else {
            middle.push(folder);
        }
    }

    let mut roots = Vec::new();
    for folder in top.into_iter().chain(middle).chain(foot) {
        insert(&mut roots, folder);
    }

    tracing::trace!(folders = roots.len(), "built folder tree");
    FolderTree { roots }
}

fn missing_levels(entries: &[Folder]) -> Vec<Folder> {
    let known: HashSet<&str> = entries.iter().map(|f| f.raw_name.as_str()).collect();
    let mut added: Vec<Folder> = Vec::new();
    let mut added_names: HashSet<String> = HashSet::new();

    for folder in entries {
        let Some(delimiter) = folder.delimiter else {
            continue;
        };
        let segments: Vec<&str> = folder.raw_name.split(delimiter).collect();
        let mut path = String::new();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            if !path.is_empty() {
                path.push(delimiter);
            }
            path.push_str(segment);
            if path.is_empty() || known.contains(path.as_str()) || added_names.contains(&path) {
                continue;
            }
            added_names.insert(path.clone());
            added.push(Folder::placeholder(path.clone(), Some(delimiter)));
        }
    }

    added
}

fn insert(siblings: &mut Vec<Folder>, folder: Folder) {
    match siblings.iter().position(|s| s.contains(&folder.raw_name)) {
        Some(i) => insert(&mut siblings[i].children, folder),
        None => siblings.push(folder),
    }
}
