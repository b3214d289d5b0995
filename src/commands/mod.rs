pub mod compare;
pub mod convert;
pub mod diff;
pub mod evaluate;
pub mod export;
pub mod import;
