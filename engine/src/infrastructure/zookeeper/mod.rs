//! Just enough of the ZooKeeper client protocol to ask whether a broker has
//! registered.

pub mod client;
pub mod codec;

pub use client::{ZooKeeperClient, ZooKeeperConnector};
