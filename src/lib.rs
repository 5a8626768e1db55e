pub mod bundle;
pub mod cli;
pub mod error;
pub mod net;
pub mod policy;
pub mod profile;
pub mod runtime;
