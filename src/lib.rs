//! Heavy Horizon - equipment rental and sales website
//!
//! Server-rendered public site and admin CMS in front of the listings REST API.

pub mod api;
pub mod backend;
pub mod config;
pub mod models;
pub mod services;
pub mod theme;
