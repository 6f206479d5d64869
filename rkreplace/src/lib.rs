pub mod builddata;
pub mod dockerfile;
pub mod driver;
pub mod fetch;
pub mod info;
pub mod promote;
pub mod prune;
pub mod replace;
mod util;
