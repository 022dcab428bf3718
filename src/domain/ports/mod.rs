//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces the core depends on:
//! - GroupRepository / UserRepository: group membership and display names
//! - GoalRepository: goal lifecycle persistence
//! - ActivityRepository: the append-only activity ledger
//! - CacheStore: optional key-value accelerator
//! - Clock: source of `now`

pub mod activity_repository;
pub mod cache_store;
pub mod clock;
pub mod goal_repository;
pub mod group_repository;

pub use activity_repository::{ActivityRepository, ActivityWindow};
pub use cache_store::{CacheError, CacheStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use goal_repository::GoalRepository;
pub use group_repository::{GroupRepository, UserRepository};
