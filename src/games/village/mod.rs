//! Minimal village game for exercising the kernel.
//!
//! A stripped-down social-deduction setup that touches every kernel
//! surface:
//! - every actor can vote; votes land on a shared ordered tally
//! - killers can kill; a kill sets the target's `dead` status
//! - protectors grant one-phase protection: a self-expiring aux object
//!   that vetoes kills on its ward
//! - phase changes run through the try/pre/post phase-change protocol

mod game;

pub use game::{VillageBuilder, VillageGame, VillageKinds};
