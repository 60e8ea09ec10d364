//! Mailbox orchestration.
//!
//! [`MailSession`] sits on one [`MailboxTransport`] and decides how to
//! enumerate messages: plain sequence ranges, searches, server-side sorts
//! or server-side threads. UID listings are cached under the folder's
//! [`FolderFingerprint`], so they stay valid until messages arrive or
//! leave.

mod folders;
mod messages;
mod model;

pub use model::{
    FolderInformation, MessageCollection, MessageDetail, MessageListRequest, MessageSummary,
    NewMessage, ThreadInfo,
};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::Span;

use crate::cache::{CacheKey, ListingCache, MemoryListingCache};
use crate::config::ListingConfig;
use crate::fingerprint::FolderFingerprint;
use crate::search::{SearchCriteria, SearchQueryBuilder};
use crate::thread::{ThreadAnchorMap, ThreadMembers};
use crate::transport::{
    FetchItem, Flag, IdSet, MailboxTransport, SelectedFolder, SortKey, StatusField,
    ThreadAlgorithm,
};
use crate::{Error, ErrorKind, Result};

/// Items fetched for every listed message.
const SUMMARY_ITEMS: [FetchItem; 6] = [
    FetchItem::Uid,
    FetchItem::Rfc822Size,
    FetchItem::InternalDate,
    FetchItem::Flags,
    FetchItem::BodyStructure,
    FetchItem::Header,
];

/// Folder counters from a status query.
#[derive(Debug, Clone)]
struct FolderState {
    count: u32,
    unseen: u32,
    uid_next: u32,
    fingerprint: FolderFingerprint,
}

/// A mailbox session over one transport connection.
///
/// Operations take `&mut self` and run one after another. The optional
/// listing cache is the only state shared with other sessions.
pub struct MailSession<T, C = MemoryListingCache> {
    transport: T,
    cache: Option<Arc<C>>,
    config: ListingConfig,
    span: Span,
}

impl<T: MailboxTransport> MailSession<T> {
    /// Creates a session without a listing cache.
    #[must_use]
    pub fn new(transport: T, config: ListingConfig) -> Self {
        let span = session_span(&transport);
        Self {
            transport,
            cache: None,
            config,
            span,
        }
    }
}

impl<T: MailboxTransport, C: ListingCache> MailSession<T, C> {
    /// Creates a session that caches listings in `cache`.
    #[must_use]
    pub fn with_cache(transport: T, config: ListingConfig, cache: Arc<C>) -> Self {
        let span = session_span(&transport);
        Self {
            transport,
            cache: Some(cache),
            config,
            span,
        }
    }

    /// Replaces the span events of this session are recorded under.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Listing options.
    #[must_use]
    pub const fn config(&self) -> &ListingConfig {
        &self.config
    }

    /// A first-page request for `folder` with the configured sort and
    /// thread options.
    #[must_use]
    pub fn list_request(&self, folder: impl Into<String>) -> MessageListRequest {
        MessageListRequest::new(folder)
            .sorted(self.config.use_sort)
            .threaded(self.config.use_threads)
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// The underlying transport, mutably.
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consumes the session, returning the transport.
    #[must_use]
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Computes the current fingerprint of `folder`.
    ///
    /// # Errors
    ///
    /// Returns an error if the status query fails.
    pub async fn folder_fingerprint(&mut self, folder: &str) -> Result<FolderFingerprint> {
        Ok(self.folder_state(folder).await?.fingerprint)
    }

    /// Reports counters, flags of `uids` and newly arrived messages.
    ///
    /// New messages are looked for only when `prev_uid_next` is given and
    /// differs from the folder's current next UID.
    ///
    /// # Errors
    ///
    /// Returns an error if a transport command fails.
    pub async fn folder_information(
        &mut self,
        folder: &str,
        prev_uid_next: Option<u32>,
        uids: &[u32],
    ) -> Result<FolderInformation> {
        let mut flags = BTreeMap::new();
        if !uids.is_empty() {
            self.select(folder, true).await?;
            let fetched = self
                .transport
                .fetch(&[FetchItem::Uid, FetchItem::Flags], &IdSet::from(uids), true)
                .await
                .map_err(|e| self.fail(e))?;
            for item in fetched {
                flags.insert(item.uid.unwrap_or_default(), item.flags);
            }
        }

        let state = self.folder_state(folder).await?;
        let new_messages = self
            .new_messages(folder, prev_uid_next, state.uid_next)
            .await?;

        Ok(FolderInformation {
            folder: folder.to_string(),
            fingerprint: state.fingerprint,
            message_count: state.count,
            unseen_count: state.unseen,
            uid_next: state.uid_next,
            flags,
            new_messages,
        })
    }

    /// Lists one page of a folder.
    ///
    /// A search, or a sort without threads, lists UIDs from the server (or
    /// the cache). Threads without a search list thread anchors from the
    /// folder's thread map. Otherwise, or when the server refuses THREAD,
    /// messages are listed by descending sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a limit above the configured
    /// maximum or an empty folder name, and transport or cache errors as
    /// they occur.
    pub async fn message_list(&mut self, request: &MessageListRequest) -> Result<MessageCollection> {
        let folder = request.folder.as_str();
        let search = request.search.trim();
        let max = self.config.page_limit_max as usize;
        if folder.is_empty() {
            return Err(self.fail(Error::InvalidArgument("folder name is empty".into())));
        }
        if request.limit > max {
            return Err(self.fail(Error::InvalidArgument(format!(
                "limit {} exceeds {max}",
                request.limit
            ))));
        }

        self.select(folder, true).await?;

        let use_sort = request.use_sort && self.transport.capability_supported("SORT");
        let algorithm = if request.use_threads {
            self.thread_algorithm()
        } else {
            None
        };
        let use_threads = algorithm.is_some();

        let state = self.folder_state(folder).await?;
        let new_messages = self
            .new_messages(folder, request.prev_uid_next, state.uid_next)
            .await?;

        let mut collection = MessageCollection {
            folder: folder.to_string(),
            fingerprint: state.fingerprint.clone(),
            uid_next: state.uid_next,
            offset: request.offset,
            limit: request.limit,
            search: search.to_string(),
            message_count: state.count,
            unseen_count: state.unseen,
            search_count: 0,
            new_messages,
            messages: Vec::new(),
        };

        let mut threads = ThreadAnchorMap::default();
        if state.count > 0 {
            let (ids, by_uid) = if !search.is_empty() || (use_sort && !use_threads) {
                let criteria = SearchQueryBuilder::new()
                    .timezone_offset(self.config.timezone_offset_secs)
                    .build(search);
                let ids = self
                    .listed_uids(folder, &state, &criteria, use_sort, algorithm, &mut threads)
                    .await?;
                (ids, true)
            } else if use_threads
                && state.count > 1
                && let Some(map) = self.load_thread_map(folder, &state.fingerprint).await?
            {
                threads = map;
                (threads.anchors().collect(), true)
            } else {
                ((1..=state.count).rev().collect::<Vec<_>>(), false)
            };

            collection.search_count = if search.is_empty() {
                state.count as usize
            } else {
                ids.len()
            };

            let page: Vec<u32> = ids
                .into_iter()
                .skip(request.offset)
                .take(request.limit)
                .collect();
            collection.messages = self.fetch_summaries(folder, &page, by_uid).await?;
        }

        if use_threads && !threads.is_empty() {
            for message in &mut collection.messages {
                if let Some(ThreadMembers::Others(members)) = threads.get(message.uid) {
                    message.threads.clone_from(members);
                }
            }
        }

        tracing::debug!(
            parent: &self.span,
            folder,
            count = state.count,
            listed = collection.messages.len(),
            use_sort,
            use_threads,
            "message list"
        );
        Ok(collection)
    }

    /// Returns the compiled thread map of `folder`, cached under
    /// `fingerprint`.
    ///
    /// A rejected or malformed THREAD response yields an empty map that is
    /// not cached; a broken connection is still an error.
    ///
    /// # Errors
    ///
    /// Returns connection and cache errors.
    pub async fn thread_map(
        &mut self,
        folder: &str,
        fingerprint: &FolderFingerprint,
    ) -> Result<ThreadAnchorMap> {
        Ok(self
            .load_thread_map(folder, fingerprint)
            .await?
            .unwrap_or_default())
    }

    /// Cached or freshly compiled thread map; `None` when the server
    /// refused THREAD.
    async fn load_thread_map(
        &mut self,
        folder: &str,
        fingerprint: &FolderFingerprint,
    ) -> Result<Option<ThreadAnchorMap>> {
        let key = self
            .ready_cache()
            .map(|_| CacheKey::thread_map(&self.transport.endpoint(), folder, fingerprint));
        if let Some(key) = &key
            && let Some(map) = self.cached::<ThreadAnchorMap>(key).await?
        {
            return Ok(Some(map));
        }

        self.select(folder, true).await?;
        let map = match self.thread_algorithm() {
            Some(algorithm) => match self.transport.thread(algorithm, None, true).await {
                Ok(nodes) => ThreadAnchorMap::compile(&nodes),
                Err(err) if err.kind() != ErrorKind::Connection => {
                    tracing::warn!(parent: &self.span, error = %err, folder, "THREAD refused");
                    return Ok(None);
                }
                Err(err) => return Err(self.fail(err)),
            },
            None => ThreadAnchorMap::default(),
        };

        if let Some(key) = &key {
            self.store(key, &map).await?;
        }
        Ok(Some(map))
    }

    /// Returns the other members of `uid`'s thread with their summaries.
    ///
    /// Both are empty when `uid` is not part of a multi-message thread.
    ///
    /// # Errors
    ///
    /// Returns an error if a transport command fails.
    pub async fn message_thread_info(
        &mut self,
        folder: &str,
        fingerprint: &FolderFingerprint,
        uid: u32,
    ) -> Result<ThreadInfo> {
        let map = self.thread_map(folder, fingerprint).await?;
        let Some(members) = map.companions(uid) else {
            return Ok(ThreadInfo {
                members: Vec::new(),
                messages: Vec::new(),
            });
        };

        self.select(folder, true).await?;
        let messages = self.fetch_summaries(folder, &members, true).await?;
        Ok(ThreadInfo { members, messages })
    }

    async fn listed_uids(
        &mut self,
        folder: &str,
        state: &FolderState,
        criteria: &SearchCriteria,
        use_sort: bool,
        algorithm: Option<ThreadAlgorithm>,
        threads: &mut ThreadAnchorMap,
    ) -> Result<Vec<u32>> {
        let key = self.ready_cache().map(|_| {
            CacheKey::listing(
                use_sort,
                algorithm.is_some(),
                &self.transport.endpoint(),
                folder,
                &state.fingerprint,
                &criteria.to_string(),
            )
        });
        if let Some(key) = &key
            && let Some(ids) = self.cached::<Vec<u32>>(key).await?
        {
            tracing::debug!(parent: &self.span, %key, "listing served from cache");
            return Ok(ids);
        }

        let ids = if let Some(algorithm) = algorithm {
            let nodes = self
                .transport
                .thread(algorithm, Some(criteria), true)
                .await
                .map_err(|e| self.fail(e))?;
            *threads = ThreadAnchorMap::compile(&nodes);
            threads.anchors().collect()
        } else if use_sort {
            self.transport
                .sort(&[SortKey::Reverse, SortKey::Arrival], criteria, true)
                .await
                .map_err(|e| self.fail(e))?
        } else {
            self.search_uids(criteria).await?
        };

        if let Some(key) = &key {
            self.store(key, &ids).await?;
        }
        Ok(ids)
    }

    /// UID search, newest first. Non-ASCII criteria try the UTF-8 charset
    /// first and fall back to a plain search if the server rejects it.
    async fn search_uids(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>> {
        let mut found = None;
        if criteria.has_non_ascii() {
            match self.transport.search(criteria, true, Some("UTF-8")).await {
                Ok(ids) => found = Some(ids),
                Err(err) if err.is_negative_reply() => {
                    tracing::debug!(parent: &self.span, error = %err, "UTF-8 search refused, retrying without charset");
                }
                Err(err) => return Err(self.fail(err)),
            }
        }

        let mut ids = match found {
            Some(ids) => ids,
            None => self
                .transport
                .search(criteria, true, None)
                .await
                .map_err(|e| self.fail(e))?,
        };
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    async fn new_messages(
        &mut self,
        folder: &str,
        prev_uid_next: Option<u32>,
        uid_next: u32,
    ) -> Result<Vec<NewMessage>> {
        let Some(prev) = prev_uid_next.filter(|prev| *prev != uid_next) else {
            return Ok(Vec::new());
        };

        self.select(folder, true).await?;
        let items = [
            FetchItem::Uid,
            FetchItem::Flags,
            FetchItem::HeaderFields(vec!["FROM".into(), "SUBJECT".into(), "CONTENT-TYPE".into()]),
        ];
        let fetched = self
            .transport
            .fetch(&items, &IdSet::From(prev), true)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(fetched
            .into_iter()
            .filter(|item| item.flags.contains(&Flag::Recent))
            .filter_map(|item| {
                Some(NewMessage {
                    folder: folder.to_string(),
                    uid: item.uid?,
                    subject: item.headers.get("Subject").map(str::to_string),
                    from: item.headers.get("From").map(str::to_string),
                })
            })
            .collect())
    }

    /// Fetches summaries for `ids`, returned in the order of `ids`.
    async fn fetch_summaries(
        &mut self,
        folder: &str,
        ids: &[u32],
        by_uid: bool,
    ) -> Result<Vec<MessageSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let fetched = self
            .transport
            .fetch(&SUMMARY_ITEMS, &IdSet::from(ids), by_uid)
            .await
            .map_err(|e| self.fail(e))?;

        let mut by_id: HashMap<u32, _> = fetched
            .into_iter()
            .map(|item| {
                let id = if by_uid {
                    item.uid.unwrap_or_default()
                } else {
                    item.seq
                };
                (id, item)
            })
            .collect();

        Ok(ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(|item| MessageSummary::from_fetch(folder, item))
            .collect())
    }

    async fn folder_state(&mut self, folder: &str) -> Result<FolderState> {
        let status = self
            .transport
            .folder_status(
                folder,
                &[StatusField::Messages, StatusField::Unseen, StatusField::UidNext],
            )
            .await
            .map_err(|e| self.fail(e))?;

        let count = status.messages.unwrap_or_default();
        let unseen = status.unseen.unwrap_or_default();
        let uid_next = status.uid_next.unwrap_or_default();
        Ok(FolderState {
            count,
            unseen,
            uid_next,
            fingerprint: FolderFingerprint::from_status(folder, count, unseen, uid_next),
        })
    }

    async fn select(&mut self, folder: &str, read_only: bool) -> Result<SelectedFolder> {
        self.transport
            .select_folder(folder, read_only)
            .await
            .map_err(|e| self.fail(e))
    }

    fn thread_algorithm(&self) -> Option<ThreadAlgorithm> {
        [ThreadAlgorithm::References, ThreadAlgorithm::OrderedSubject]
            .into_iter()
            .find(|a| self.transport.capability_supported(a.capability()))
    }

    fn ready_cache(&self) -> Option<Arc<C>> {
        self.cache.as_ref().filter(|c| c.is_ready()).map(Arc::clone)
    }

    /// Reads and decodes a cache entry. An undecodable entry is treated
    /// as a miss.
    async fn cached<V: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<V>> {
        let Some(cache) = self.ready_cache() else {
            return Ok(None);
        };
        let Some(bytes) = cache.get(key.as_str()).await.map_err(|e| self.fail(e))? else {
            return Ok(None);
        };
        if bytes.is_empty() {
            return Ok(None);
        }
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                tracing::warn!(parent: &self.span, %key, error = %err, "discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    async fn store<V: Serialize + ?Sized>(&self, key: &CacheKey, value: &V) -> Result<()> {
        let Some(cache) = self.ready_cache() else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(value)?;
        cache
            .set(key.as_str(), &bytes)
            .await
            .map_err(|e| self.fail(e))
    }

    /// Logs an error at the point it is raised.
    fn fail(&self, err: Error) -> Error {
        match err.kind() {
            ErrorKind::InvalidArgument | ErrorKind::NonEmptyFolder => {
                tracing::error!(parent: &self.span, error = %err, "mail session misuse");
            }
            _ => {
                tracing::warn!(parent: &self.span, error = %err, "mail session failure");
            }
        }
        err
    }
}

fn session_span<T: MailboxTransport>(transport: &T) -> Span {
    let endpoint = transport.endpoint();
    tracing::info_span!(
        "mail",
        user = %endpoint.user,
        host = %endpoint.host,
        port = endpoint.port
    )
}
