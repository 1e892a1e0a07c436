//! Time-tracking rules shared by the API and by clients driving a timer.
//!
//! Flow: [`idle`] feeds [`timer`], a finished timer yields a worklog payload
//! that [`reconcile`] normalizes, [`earnings`] prices it and [`aggregate`]
//! rolls many of them up for dashboards.

pub mod aggregate;
pub mod earnings;
pub mod idle;
pub mod reconcile;
pub mod timer;
