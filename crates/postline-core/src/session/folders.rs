//! Folder management.

use std::collections::HashSet;

use super::MailSession;
use crate::cache::ListingCache;
use crate::folder::{Folder, FolderTree, INBOX, build_tree, encode_name};
use crate::search::SearchCriteria;
use crate::transport::{Flag, IdSet, ListedFolder, MailboxTransport, StoreAction};
use crate::{Error, Result};

impl<T: MailboxTransport, C: ListingCache> MailSession<T, C> {
    /// Lists folders under `parent` matching `pattern` as a tree.
    ///
    /// The inbox always counts as subscribed.
    ///
    /// # Errors
    ///
    /// Returns an error if a listing command fails.
    pub async fn folders(&mut self, parent: &str, pattern: &str) -> Result<FolderTree> {
        let listed = self
            .transport
            .list_folders(parent, pattern)
            .await
            .map_err(|e| self.fail(e))?;
        let subscribed = self.subscribed_names(parent, pattern).await?;
        Ok(build_tree(with_subscriptions(listed, &subscribed)))
    }

    /// Lists the direct children of `folder` and their children.
    ///
    /// An empty `folder` lists the top level. Returns an empty list when
    /// `folder` has no children.
    ///
    /// # Errors
    ///
    /// Returns an error if a listing command fails.
    pub async fn folders_level(&mut self, folder: &str, delimiter: char) -> Result<Vec<Folder>> {
        let level = if folder.is_empty() {
            String::new()
        } else {
            format!("{folder}{delimiter}")
        };
        let nested = format!("%{delimiter}%");

        let mut listed = self
            .transport
            .list_folders(&level, "%")
            .await
            .map_err(|e| self.fail(e))?;
        let mut subscribed = self.subscribed_names(&level, "%").await?;

        let below = self
            .transport
            .list_folders(&level, &nested)
            .await
            .map_err(|e| self.fail(e))?;
        listed.extend(below);
        subscribed.extend(self.subscribed_names(&level, &nested).await?);

        let mut tree = build_tree(with_subscriptions(listed, &subscribed));
        if folder.is_empty() {
            return Ok(tree.into_roots());
        }
        Ok(tree.take(folder).map(|f| f.children).unwrap_or_default())
    }

    /// Creates `name` under `parent` and returns the new raw name.
    ///
    /// An empty `parent` creates a top-level folder. The hierarchy
    /// delimiter is learned by listing the parent (or the inbox).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty name, a name that
    /// contains the delimiter, or a parent that does not exist.
    pub async fn create_folder(&mut self, name: &str, parent: &str, subscribe: bool) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(self.fail(Error::InvalidArgument("folder name is empty".into())));
        }

        let parent = parent.trim();
        let lookup = if parent.is_empty() { INBOX } else { parent };
        let listed = self
            .transport
            .list_folders("", lookup)
            .await
            .map_err(|e| self.fail(e))?;
        let Some(first) = listed.first() else {
            let err = if parent.is_empty() {
                Error::ProtocolViolation("cannot determine the hierarchy delimiter".into())
            } else {
                Error::InvalidArgument(format!("parent folder {parent} does not exist"))
            };
            return Err(self.fail(err));
        };
        let delimiter = first.delimiter;

        let encoded = encode_name(name);
        if delimiter.is_some_and(|d| encoded.contains(d)) {
            return Err(self.fail(Error::InvalidArgument(format!(
                "folder name {name} contains the hierarchy delimiter"
            ))));
        }

        let raw_name = match delimiter {
            Some(d) if !parent.is_empty() => format!("{parent}{d}{encoded}"),
            _ => format!("{parent}{encoded}"),
        };

        self.transport
            .create_folder(&raw_name)
            .await
            .map_err(|e| self.fail(e))?;
        if subscribe {
            self.transport
                .subscribe(&raw_name)
                .await
                .map_err(|e| self.fail(e))?;
        }

        tracing::info!(parent: &self.span, folder = %raw_name, "folder created");
        Ok(raw_name)
    }

    /// Renames the last segment of `prev_raw` to `new_name` and returns
    /// the new raw name.
    ///
    /// Subscriptions of the folder and its subfolders move with it;
    /// siblings sharing its name as a prefix are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for empty names, a folder that
    /// does not exist, or a new name containing the delimiter.
    pub async fn rename_folder(&mut self, prev_raw: &str, new_name: &str) -> Result<String> {
        if prev_raw.is_empty() || new_name.is_empty() {
            return Err(self.fail(Error::InvalidArgument(
                "current and new folder names are required".into(),
            )));
        }

        let listed = self
            .transport
            .list_folders("", prev_raw)
            .await
            .map_err(|e| self.fail(e))?;
        let Some(first) = listed.first() else {
            return Err(self.fail(Error::InvalidArgument(format!(
                "folder {prev_raw} does not exist"
            ))));
        };
        let delimiter = first.delimiter;

        let encoded = encode_name(new_name);
        if delimiter.is_some_and(|d| encoded.contains(d)) {
            return Err(self.fail(Error::InvalidArgument(format!(
                "folder name {new_name} contains the hierarchy delimiter"
            ))));
        }

        let parent_prefix = delimiter
            .and_then(|d| prev_raw.rfind(d).map(|i| &prev_raw[..i + d.len_utf8()]))
            .unwrap_or("");
        let new_raw = format!("{parent_prefix}{encoded}");

        let subscriptions: Vec<String> = self
            .transport
            .list_subscribed(prev_raw, "*")
            .await
            .map_err(|e| self.fail(e))?
            .into_iter()
            .filter_map(|folder| {
                let rest = folder.raw_name.strip_prefix(prev_raw)?;
                let inside = rest.is_empty() || delimiter.is_some_and(|d| rest.starts_with(d));
                inside.then(|| rest.to_string())
            })
            .collect();
        for rest in &subscriptions {
            self.transport
                .unsubscribe(&format!("{prev_raw}{rest}"))
                .await
                .map_err(|e| self.fail(e))?;
        }

        self.transport
            .rename_folder(prev_raw, &new_raw)
            .await
            .map_err(|e| self.fail(e))?;

        for rest in &subscriptions {
            self.transport
                .subscribe(&format!("{new_raw}{rest}"))
                .await
                .map_err(|e| self.fail(e))?;
        }

        tracing::info!(parent: &self.span, from = prev_raw, to = %new_raw, "folder renamed");
        Ok(new_raw)
    }

    /// Deletes an empty folder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty name or the inbox,
    /// and [`Error::NonEmptyFolder`] if the folder still holds messages.
    pub async fn delete_folder(&mut self, raw_name: &str, unsubscribe: bool) -> Result<()> {
        if raw_name.is_empty() || raw_name.eq_ignore_ascii_case(INBOX) {
            return Err(self.fail(Error::InvalidArgument(format!(
                "folder {raw_name:?} cannot be deleted"
            ))));
        }

        self.select(raw_name, true).await?;
        let remaining = self
            .transport
            .search(&SearchCriteria::All, false, None)
            .await
            .map_err(|e| self.fail(e))?;
        if !remaining.is_empty() {
            return Err(self.fail(Error::NonEmptyFolder(raw_name.to_string())));
        }

        // A selected folder cannot be deleted on every server.
        self.select(INBOX, true).await?;
        if unsubscribe {
            self.transport
                .unsubscribe(raw_name)
                .await
                .map_err(|e| self.fail(e))?;
        }
        self.transport
            .delete_folder(raw_name)
            .await
            .map_err(|e| self.fail(e))?;

        tracing::info!(parent: &self.span, folder = raw_name, "folder deleted");
        Ok(())
    }

    /// Removes every message from a folder.
    ///
    /// # Errors
    ///
    /// Returns an error if a transport command fails.
    pub async fn clear_folder(&mut self, raw_name: &str) -> Result<()> {
        let selected = self.select(raw_name, false).await?;
        if selected.exists == 0 {
            return Ok(());
        }

        self.transport
            .store_flags(&IdSet::All, false, &[Flag::Deleted], StoreAction::AddSilent)
            .await
            .map_err(|e| self.fail(e))?;
        self.transport
            .expunge(None, false)
            .await
            .map_err(|e| self.fail(e))?;

        tracing::info!(parent: &self.span, folder = raw_name, removed = selected.exists, "folder cleared");
        Ok(())
    }

    /// Subscribes to or unsubscribes from a folder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty name.
    pub async fn subscribe_folder(&mut self, raw_name: &str, subscribe: bool) -> Result<()> {
        if raw_name.is_empty() {
            return Err(self.fail(Error::InvalidArgument("folder name is empty".into())));
        }

        let result = if subscribe {
            self.transport.subscribe(raw_name).await
        } else {
            self.transport.unsubscribe(raw_name).await
        };
        result.map_err(|e| self.fail(e))
    }

    async fn subscribed_names(&mut self, reference: &str, pattern: &str) -> Result<HashSet<String>> {
        let listed = self
            .transport
            .list_subscribed(reference, pattern)
            .await
            .map_err(|e| self.fail(e))?;
        Ok(listed.into_iter().map(|f| f.raw_name).collect())
    }
}

fn with_subscriptions(listed: Vec<ListedFolder>, subscribed: &HashSet<String>) -> Vec<Folder> {
    listed
        .into_iter()
        .map(|entry| {
            let is_subscribed =
                subscribed.contains(&entry.raw_name) || entry.raw_name.eq_ignore_ascii_case(INBOX);
            Folder::from_listing(entry, is_subscribed)
        })
        .collect()
}
