//! Record storage.
//!
//! [`SharingRepository`] is the storage contract the engine relies on. Every
//! method is a single atomic operation; the engine never reads a record and
//! writes it back. [`MemoryRepository`] implements the contract under one lock.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::identifier::{LookupKey, ShareIdentifier};
use crate::types::{
    NewSharingRecord, OrgId, Page, Pagination, RecordId, SharingKind, SharingRecord, UserId,
};

/// Outcome of an atomic view consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewConsumption {
    /// A view was taken; `remaining_views` is the counter after the decrement.
    Consumed {
        /// Views left, or `None` if the record is not view-limited.
        remaining_views: Option<u32>,
    },
    /// The counter was already zero.
    Exhausted,
    /// No live record has this id.
    Missing,
}

/// Outcome of a one-time secret write.
#[derive(Debug, Clone)]
pub enum SetSecretOutcome {
    /// The value was stored; carries the updated record.
    Set(SharingRecord),
    /// A value was already present; nothing changed.
    AlreadySet,
    /// No live record has this id.
    Missing,
}

/// Selects the records owned by one user within one organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedRecordsQuery {
    /// The owning user.
    pub owner: UserId,
    /// The owning organization.
    pub org: OrgId,
    /// Restrict to one flow.
    pub kind: Option<SharingKind>,
}

/// Hook run inside the commit of [`SharingRepository::set_secret_once`].
pub type CommitHook<'a> = &'a dyn Fn(&SharingRecord) -> Result<()>;

/// The transactional record store.
pub trait SharingRepository: Send + Sync {
    /// Persists a new record and returns it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the external identifier is already in use.
    fn create(&self, record: NewSharingRecord) -> Result<SharingRecord>;

    /// Finds a live record of the given kind.
    ///
    /// Soft-deleted records are never returned.
    fn find(&self, kind: SharingKind, key: &LookupKey) -> Result<Option<SharingRecord>>;

    /// Atomically takes one view: decrements the counter if positive and
    /// stamps `last_viewed_at`.
    fn consume_view(&self, id: RecordId, now: DateTime<Utc>) -> Result<ViewConsumption>;

    /// Flags a record deleted. Returns false if it was already gone.
    fn soft_delete(&self, id: RecordId) -> Result<bool>;

    /// Removes a record and returns its last state.
    fn delete(&self, id: RecordId) -> Result<Option<SharingRecord>>;

    /// Stores `ciphertext` only if the record has no value yet.
    ///
    /// `on_commit` runs with the updated record before the write becomes
    /// visible; if it fails the write is rolled back and its error returned.
    /// While the hook runs the record is reserved: other writers see
    /// [`SetSecretOutcome::AlreadySet`], readers still see no value, and
    /// unrelated operations are not blocked.
    fn set_secret_once(
        &self,
        id: RecordId,
        ciphertext: Vec<u8>,
        on_commit: CommitHook<'_>,
    ) -> Result<SetSecretOutcome>;

    /// Lists live records matching `query`, newest first.
    fn list_owned(&self, query: &OwnedRecordsQuery, page: Pagination) -> Result<Page<SharingRecord>>;
}

#[derive(Clone)]
struct StoredRecord {
    record: SharingRecord,
    /// Insertion order; breaks ties between equal `created_at` values.
    seq: u64,
    /// Ciphertext reserved by a `set_secret_once` whose hook is still running.
    pending_secret: Option<Vec<u8>>,
}

#[derive(Default)]
struct Tables {
    records: HashMap<RecordId, StoredRecord>,
    by_identifier: HashMap<ShareIdentifier, RecordId>,
    next_seq: u64,
}

impl Tables {
    fn live_stored_mut(&mut self, id: RecordId) -> Option<&mut StoredRecord> {
        self.records
            .get_mut(&id)
            .filter(|stored| !stored.record.is_deleted)
    }

    fn live_mut(&mut self, id: RecordId) -> Option<&mut SharingRecord> {
        self.live_stored_mut(id).map(|stored| &mut stored.record)
    }
}

/// An in-memory [`SharingRepository`].
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records, including soft-deleted ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a record in whatever state it is in, deleted or not.
    #[must_use]
    pub fn snapshot(&self, id: RecordId) -> Option<SharingRecord> {
        self.read().records.get(&id).map(|stored| stored.record.clone())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SharingRepository for MemoryRepository {
    fn create(&self, new: NewSharingRecord) -> Result<SharingRecord> {
        let mut tables = self.write();

        if let Some(identifier) = new.identifier {
            if tables.by_identifier.contains_key(&identifier) {
                return Err(Error::storage("share identifier already exists"));
            }
        }

        let record = SharingRecord {
            id: RecordId::new(),
            kind: new.kind,
            name: new.name,
            identifier: new.identifier,
            hashed_hex: new.hashed_hex,
            encrypted_secret: new.encrypted_secret,
            password_hash: new.password_hash,
            expires_at: new.expires_at,
            expires_after_views: new.expires_after_views,
            access_type: new.access_type,
            owner_user_id: new.owner_user_id,
            owner_org_id: new.owner_org_id,
            last_viewed_at: None,
            is_deleted: false,
            created_at: Utc::now(),
        };

        let seq = tables.next_seq;
        tables.next_seq += 1;
        if let Some(identifier) = record.identifier {
            tables.by_identifier.insert(identifier, record.id);
        }
        tables.records.insert(
            record.id,
            StoredRecord {
                record: record.clone(),
                seq,
                pending_secret: None,
            },
        );
        Ok(record)
    }

    fn find(&self, kind: SharingKind, key: &LookupKey) -> Result<Option<SharingRecord>> {
        let tables = self.read();
        let id = match key {
            LookupKey::ByInternalId(id) => Some(*id),
            LookupKey::ByToken(identifier) => tables.by_identifier.get(identifier).copied(),
        };
        Ok(id
            .and_then(|id| tables.records.get(&id))
            .map(|stored| &stored.record)
            .filter(|record| !record.is_deleted && record.kind == kind)
            .cloned())
    }

    fn consume_view(&self, id: RecordId, now: DateTime<Utc>) -> Result<ViewConsumption> {
        let mut tables = self.write();
        let Some(record) = tables.live_mut(id) else {
            return Ok(ViewConsumption::Missing);
        };

        let remaining_views = match record.expires_after_views {
            Some(0) => return Ok(ViewConsumption::Exhausted),
            Some(n) => Some(n - 1),
            None => None,
        };
        record.expires_after_views = remaining_views;
        record.last_viewed_at = Some(now);
        Ok(ViewConsumption::Consumed { remaining_views })
    }

    fn soft_delete(&self, id: RecordId) -> Result<bool> {
        let mut tables = self.write();
        Ok(tables.live_mut(id).is_some_and(|record| {
            record.is_deleted = true;
            true
        }))
    }

    fn delete(&self, id: RecordId) -> Result<Option<SharingRecord>> {
        let mut tables = self.write();
        let Some(stored) = tables.records.remove(&id) else {
            return Ok(None);
        };
        if let Some(identifier) = stored.record.identifier {
            tables.by_identifier.remove(&identifier);
        }
        Ok((!stored.record.is_deleted).then_some(stored.record))
    }

    fn set_secret_once(
        &self,
        id: RecordId,
        ciphertext: Vec<u8>,
        on_commit: CommitHook<'_>,
    ) -> Result<SetSecretOutcome> {
        // Reserve under the lock, run the hook without it.
        let updated = {
            let mut tables = self.write();
            let Some(stored) = tables.live_stored_mut(id) else {
                return Ok(SetSecretOutcome::Missing);
            };
            if stored.record.encrypted_secret.is_some() || stored.pending_secret.is_some() {
                return Ok(SetSecretOutcome::AlreadySet);
            }
            stored.pending_secret = Some(ciphertext.clone());
            let mut updated = stored.record.clone();
            updated.encrypted_secret = Some(ciphertext);
            updated
        };

        let hook_result = on_commit(&updated);

        let mut tables = self.write();
        let Some(stored) = tables.records.get_mut(&id) else {
            // Hard-deleted while the hook ran; nothing left to commit.
            return hook_result.map(|()| SetSecretOutcome::Missing);
        };
        let reserved = stored.pending_secret.take();
        hook_result?;
        stored.record.encrypted_secret = reserved;
        Ok(SetSecretOutcome::Set(updated))
    }

    fn list_owned(&self, query: &OwnedRecordsQuery, page: Pagination) -> Result<Page<SharingRecord>> {
        let tables = self.read();
        let mut matches: Vec<&StoredRecord> = tables
            .records
            .values()
            .filter(|stored| {
                let record = &stored.record;
                !record.is_deleted
                    && record.owner_user_id.as_ref() == Some(&query.owner)
                    && record.owner_org_id.as_ref() == Some(&query.org)
                    && query.kind.is_none_or(|kind| record.kind == kind)
            })
            .collect();

        matches.sort_by(|a, b| {
            b.record
                .created_at
                .cmp(&a.record.created_at)
                .then(b.seq.cmp(&a.seq))
        });

        let total_count = matches.len();
        let items = matches
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .map(|stored| stored.record.clone())
            .collect();
        Ok(Page { items, total_count })
    }
}

impl std::fmt::Debug for MemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRepository")
            .field("records", &self.len())
            .finish()
    }
}
