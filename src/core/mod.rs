// Core modules implementing id allocation, record tables, page tokens, and errors.
pub mod clock;
pub mod collection;
pub mod cursor;
pub mod error;
pub mod ids;
pub mod listing;
pub mod mask;
pub mod name;
