use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;

use super::{Member, StoreError};
use crate::model::{MemberId, MemberRef};

/// Shared handle to one member; holding its lock serializes every balance
/// change for that member.
pub type MemberHandle = Arc<Mutex<Member>>;

/// Concurrent member registry keyed by membership number, with a phone index.
///
/// There is no lock over the whole store: lookups go through sharded maps and
/// each member carries its own mutex.
#[derive(Debug, Default)]
pub struct MemberStore {
    members: DashMap<MemberId, MemberHandle>,
    phones: DashMap<String, MemberId>,
}

impl MemberStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member. Membership number and phone must both be unused,
    /// and wallet and rolling spend must not be negative.
    pub fn insert(&self, member: Member) -> Result<(), StoreError> {
        for (field, value) in [
            ("wallet", member.wallet),
            ("rolling spend", member.rolling_spend),
        ] {
            if value.is_negative() {
                return Err(StoreError::NegativeBalance {
                    member: member.membership_no,
                    field,
                    value,
                });
            }
        }

        let id = member.membership_no.clone();
        let phone = member.phone.clone();

        let Entry::Vacant(slot) = self.members.entry(id.clone()) else {
            return Err(StoreError::DuplicateMembershipNo(id));
        };
        let Entry::Vacant(phone_slot) = self.phones.entry(phone.clone()) else {
            return Err(StoreError::DuplicatePhone(phone));
        };

        phone_slot.insert(id);
        slot.insert(Arc::new(Mutex::new(member)));
        Ok(())
    }

    pub fn resolve(&self, member: &MemberRef) -> Option<MemberHandle> {
        let id = match member {
            MemberRef::MembershipNo(id) => id.clone(),
            MemberRef::Phone(phone) => self.phones.get(phone)?.value().clone(),
        };
        self.members.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Copy of every member, each read under its own lock. Members settled
    /// while the snapshot is taken may appear before or after the change.
    pub async fn snapshot(&self) -> Vec<Member> {
        let handles: Vec<MemberHandle> = self
            .members
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut members = Vec::with_capacity(handles.len());
        for handle in handles {
            members.push(handle.lock().await.clone());
        }
        members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
