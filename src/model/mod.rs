// File: ./src/model/mod.rs
pub mod adapter;
pub mod item;
pub mod recurrence;

pub use adapter::{ParseError, load};
pub use item::{Calendar, DateType, Entry, Event, Task, TaskStatus};
