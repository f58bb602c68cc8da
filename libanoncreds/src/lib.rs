#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate log;

#[macro_use]
extern crate serde_derive;

#[macro_use]
pub mod utils;

pub mod common;
pub mod identifiers;
pub mod math;

pub mod cl;
pub mod domain;
pub mod services;
