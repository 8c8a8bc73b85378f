// SPDX-License-Identifier: MIT

pub mod config;
pub mod newsletter;
pub mod server;
pub mod stock;
pub mod tools;
pub mod types;
pub mod workflow;
