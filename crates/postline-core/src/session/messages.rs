//! Single-message operations and flag changes.

use super::{MailSession, MessageDetail, MessageSummary};
use crate::cache::ListingCache;
use crate::search::SearchCriteria;
use crate::transport::{BodyPart, FetchItem, Flag, IdSet, MailboxTransport, Quota, StoreAction};
use crate::{Error, Result};

impl<T: MailboxTransport, C: ListingCache> MailSession<T, C> {
    /// Fetches one message together with its display part.
    ///
    /// When `text_part` is `None` the preferred part is chosen from the
    /// body structure: HTML if present, else plain text. Returns `None`
    /// if the message does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `id` is zero, and transport
    /// errors as they occur.
    pub async fn message(
        &mut self,
        folder: &str,
        id: u32,
        by_uid: bool,
        text_part: Option<&str>,
    ) -> Result<Option<MessageDetail>> {
        if id < 1 {
            return Err(self.fail(Error::InvalidArgument("message id must be positive".into())));
        }

        self.select(folder, true).await?;
        let ids = IdSet::List(vec![id]);

        let mut structure = None;
        let mut part = text_part.filter(|p| !p.is_empty()).map(str::to_string);
        if part.is_none() {
            let fetched = self
                .transport
                .fetch(&[FetchItem::BodyStructure], &ids, by_uid)
                .await
                .map_err(|e| self.fail(e))?;
            structure = fetched.into_iter().next().and_then(|f| f.body_structure);
            part = structure
                .as_ref()
                .and_then(BodyPart::preferred_text_part)
                .map(|p| p.part_id.clone());
        }

        let mut items = vec![
            FetchItem::Uid,
            FetchItem::Rfc822Size,
            FetchItem::InternalDate,
            FetchItem::Flags,
            FetchItem::Header,
        ];
        if let Some(part) = &part {
            items.push(FetchItem::BodyPeek(part.clone()));
        }
        if structure.is_none() {
            items.push(FetchItem::BodyStructure);
        }

        let fetched = self
            .transport
            .fetch(&items, &ids, by_uid)
            .await
            .map_err(|e| self.fail(e))?;
        let Some(mut item) = fetched.into_iter().next() else {
            return Ok(None);
        };

        let text = item.body.take();
        let mut summary = MessageSummary::from_fetch(folder, item);
        if summary.body_structure.is_none() {
            summary.body_structure = structure;
        }

        Ok(Some(MessageDetail {
            summary,
            text_part: part,
            text,
        }))
    }

    /// Adds or removes `flag` on messages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `ids` is empty or the folder
    /// does not store `flag` permanently.
    pub async fn set_flag(
        &mut self,
        folder: &str,
        ids: &[u32],
        by_uid: bool,
        flag: Flag,
        set: bool,
    ) -> Result<()> {
        if ids.is_empty() {
            return Err(self.fail(Error::InvalidArgument("no messages given".into())));
        }

        let selected = self.select(folder, false).await?;
        if !selected.allows_flag(&flag) {
            return Err(self.fail(Error::InvalidArgument(format!(
                "flag {flag} is not supported in {folder}"
            ))));
        }

        let action = if set {
            StoreAction::AddSilent
        } else {
            StoreAction::RemoveSilent
        };
        self.transport
            .store_flags(&IdSet::from(ids), by_uid, &[flag], action)
            .await
            .map_err(|e| self.fail(e))
    }

    /// Marks messages read or unread.
    ///
    /// # Errors
    ///
    /// See [`MailSession::set_flag`].
    pub async fn set_seen(&mut self, folder: &str, ids: &[u32], by_uid: bool, seen: bool) -> Result<()> {
        self.set_flag(folder, ids, by_uid, Flag::Seen, seen).await
    }

    /// Flags or unflags messages.
    ///
    /// # Errors
    ///
    /// See [`MailSession::set_flag`].
    pub async fn set_flagged(
        &mut self,
        folder: &str,
        ids: &[u32],
        by_uid: bool,
        flagged: bool,
    ) -> Result<()> {
        self.set_flag(folder, ids, by_uid, Flag::Flagged, flagged)
            .await
    }

    /// Marks messages `\Deleted`, then expunges when `expunge` is set.
    ///
    /// With UIDs only the given messages are expunged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty folder name or id
    /// list.
    pub async fn delete_messages(
        &mut self,
        folder: &str,
        ids: &[u32],
        by_uid: bool,
        expunge: bool,
    ) -> Result<()> {
        if folder.is_empty() || ids.is_empty() {
            return Err(self.fail(Error::InvalidArgument(
                "folder and messages are required".into(),
            )));
        }

        self.select(folder, false).await?;
        let set = IdSet::from(ids);
        self.transport
            .store_flags(&set, by_uid, &[Flag::Deleted], StoreAction::AddSilent)
            .await
            .map_err(|e| self.fail(e))?;

        if expunge {
            self.transport
                .expunge(by_uid.then_some(&set), by_uid)
                .await
                .map_err(|e| self.fail(e))?;
        }
        Ok(())
    }

    /// Copies messages to `to`, then deletes them from `from`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for empty names or id list.
    pub async fn move_messages(
        &mut self,
        from: &str,
        to: &str,
        ids: &[u32],
        by_uid: bool,
    ) -> Result<()> {
        if from.is_empty() || to.is_empty() || ids.is_empty() {
            return Err(self.fail(Error::InvalidArgument(
                "source, destination and messages are required".into(),
            )));
        }

        self.select(from, false).await?;
        self.transport
            .copy(&IdSet::from(ids), by_uid, to)
            .await
            .map_err(|e| self.fail(e))?;
        self.delete_messages(from, ids, by_uid, true).await
    }

    /// Appends a raw message to `folder`; returns the new UID if known.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty folder or message.
    pub async fn append_message(
        &mut self,
        folder: &str,
        message: &[u8],
        flags: &[Flag],
    ) -> Result<Option<u32>> {
        if folder.is_empty() || message.is_empty() {
            return Err(self.fail(Error::InvalidArgument(
                "folder and message are required".into(),
            )));
        }

        let uid = self
            .transport
            .append(folder, message, flags)
            .await
            .map_err(|e| self.fail(e))?;
        tracing::debug!(parent: &self.span, folder, bytes = message.len(), ?uid, "message appended");
        Ok(uid)
    }

    /// Finds a message's UID by its `Message-ID` header.
    ///
    /// Returns `None` unless exactly one message matches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty message id.
    pub async fn find_uid_by_message_id(
        &mut self,
        folder: &str,
        message_id: &str,
    ) -> Result<Option<u32>> {
        if message_id.is_empty() {
            return Err(self.fail(Error::InvalidArgument("message id is empty".into())));
        }

        self.select(folder, true).await?;
        let criteria = SearchCriteria::Header("MESSAGE-ID".into(), message_id.to_string());
        let uids = self
            .transport
            .search(&criteria, true, None)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(match uids.as_slice() {
            [uid] => Some(*uid),
            _ => None,
        })
    }

    /// Storage quota of the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if the quota query fails.
    pub async fn quota(&mut self) -> Result<Option<Quota>> {
        self.transport.quota().await.map_err(|e| self.fail(e))
    }
}
