pub mod catalog;
pub mod index;
pub mod intent;
pub mod sales;
pub mod text;

mod error;

pub use error::{Error, Result};
