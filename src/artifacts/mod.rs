//! Generated artifacts: ID cards and reference numbers.

pub mod id_card;
pub mod reference;
