#[macro_use]
extern crate serde;

mod ballot;
mod cells;
mod credential;
mod decryption;
mod election;
mod elgamal;
mod error;
mod field;
mod group;
mod hash;
mod mix;
mod proof;
mod report;
mod result;
mod tally;
mod trustee;
mod verify;

pub use ballot::*;
pub use cells::*;
pub use credential::*;
pub use decryption::*;
pub use election::*;
pub use elgamal::*;
pub use error::*;
pub use field::*;
pub use group::*;
pub use hash::*;
pub use mix::*;
pub use proof::*;
pub use report::*;
pub use result::*;
pub use tally::*;
pub use trustee::*;
pub use verify::*;

#[cfg(test)]
mod tests;
