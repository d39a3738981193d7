//! Operations that combine Google calls with local storage.

pub mod calendar;
pub mod sync;
