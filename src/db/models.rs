mod activity;
mod client;
mod history;

pub use activity::*;
pub use client::*;
pub use history::*;
