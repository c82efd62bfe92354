pub mod invite;
pub mod keys;
pub mod serve;
