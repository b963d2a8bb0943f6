//! Poster (Nyuu) invocation.

mod command;

pub use command::{PASSWORD_MASK, PosterCommand};
