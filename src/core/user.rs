use crate::core::item::ItemId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for a marketplace participant.
///
/// Ordered so that pools, graphs, and tie-breaks iterate deterministically.
///
/// # Examples
///
/// ```
/// use chariot_engine::core::user::UserId;
///
/// let a = UserId::new("U-0001");
/// let b = UserId::new("U-0002");
/// assert!(a < b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Lifecycle state of a participant.
///
/// `Queued` users have been admitted but not yet entered into matching;
/// `Active` users are eligible for the current round; `Matched` users
/// executed a loop; `Declined` users are permanently excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Queued,
    Active,
    Matched,
    Declined,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserStatus::Queued => "queued",
            UserStatus::Active => "active",
            UserStatus::Matched => "matched",
            UserStatus::Declined => "declined",
        };
        write!(f, "{}", s)
    }
}

/// A marketplace participant.
///
/// Each user holds at most one item, carries a cash balance, and ranks the
/// item models they would accept most-to-least preferred. Users are created
/// by the population source and mutated only by the round controller
/// (status, holdings, cash) when loops settle. Users are never deleted —
/// permanent exclusion is the `Declined` status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    /// Currently held item. A user holding nothing is inactive for matching.
    held_item: Option<ItemId>,
    /// Ranked wishlist of desired item models, most preferred first.
    wishlist: Vec<ItemId>,
    cash_balance: Decimal,
    status: UserStatus,
    /// Consecutive rounds this user stayed active without executing a loop.
    #[serde(default)]
    unmatched_rounds: u32,
}

impl User {
    /// Create a new user, admitted as `Queued`.
    pub fn new(id: UserId, held_item: ItemId, cash_balance: Decimal) -> Self {
        Self {
            id,
            held_item: Some(held_item),
            wishlist: Vec::new(),
            cash_balance,
            status: UserStatus::Queued,
            unmatched_rounds: 0,
        }
    }

    /// Set the ranked wishlist.
    pub fn with_wishlist(mut self, wishlist: Vec<ItemId>) -> Self {
        self.wishlist = wishlist;
        self
    }

    // --- Accessors ---

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn held_item(&self) -> Option<&ItemId> {
        self.held_item.as_ref()
    }

    pub fn wishlist(&self) -> &[ItemId] {
        &self.wishlist
    }

    pub fn cash_balance(&self) -> Decimal {
        self.cash_balance
    }

    pub fn status(&self) -> UserStatus {
        self.status
    }

    pub fn unmatched_rounds(&self) -> u32 {
        self.unmatched_rounds
    }

    /// Eligible for matching: active and holding an item.
    pub fn is_matchable(&self) -> bool {
        self.status == UserStatus::Active && self.held_item.is_some()
    }

    /// True if this user currently holds exactly `item`.
    pub fn holds(&self, item: &ItemId) -> bool {
        self.held_item.as_ref() == Some(item)
    }

    // --- Mutation (round controller only) ---

    pub fn set_status(&mut self, status: UserStatus) {
        self.status = status;
    }

    /// Replace the held item, returning the previous one.
    pub fn swap_item(&mut self, item: ItemId) -> Option<ItemId> {
        self.held_item.replace(item)
    }

    /// Apply a settlement cash delta: positive means the user paid cash.
    pub fn settle_cash(&mut self, paid: Decimal) {
        self.cash_balance -= paid;
    }

    pub fn record_unmatched_round(&mut self) {
        self.unmatched_rounds += 1;
    }
}

/// The population of a simulation run, keyed by user id.
///
/// A `BTreeMap` keeps iteration order deterministic, which the enumerator,
/// selector tie-breaks, and reports all rely on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPool {
    users: BTreeMap<UserId, User>,
}

impl UserPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a user into the pool. Replaces any user with the same id.
    pub fn admit(&mut self, user: User) {
        self.users.insert(user.id().clone(), user);
    }

    pub fn get(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    pub fn get_mut(&mut self, id: &UserId) -> Option<&mut User> {
        self.users.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut User> {
        self.users.values_mut()
    }

    /// Users eligible for matching this round, in id order.
    pub fn matchable(&self) -> impl Iterator<Item = &User> {
        self.users.values().filter(|u| u.is_matchable())
    }

    /// Flip all queued users to active. Returns how many were activated.
    pub fn activate_queued(&mut self) -> usize {
        let mut activated = 0;
        for user in self.users.values_mut() {
            if user.status() == UserStatus::Queued {
                user.set_status(UserStatus::Active);
                activated += 1;
            }
        }
        activated
    }

    pub fn count_by_status(&self, status: UserStatus) -> usize {
        self.users.values().filter(|u| u.status() == status).count()
    }
}

impl FromIterator<User> for UserPool {
    fn from_iter<T: IntoIterator<Item = User>>(iter: T) -> Self {
        let mut pool = Self::new();
        for user in iter {
            pool.admit(user);
        }
        pool
    }
}
