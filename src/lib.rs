// Library for tests to access modules

pub mod client;
pub mod collector;
pub mod config;
pub mod duration;
pub mod routes;
pub mod version;
