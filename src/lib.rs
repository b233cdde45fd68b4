extern crate tokio;
extern crate enum_dispatch;

pub mod util;

pub mod model;
pub mod engine;
pub mod io;
pub mod python;
pub mod view;
