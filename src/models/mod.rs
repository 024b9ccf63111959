//! Data Transfer Objects for the command driver
//!
//! Contains command and reply structures used by the stdin driver.

mod requests;
mod responses;

pub use requests::Command;
pub use responses::Reply;
