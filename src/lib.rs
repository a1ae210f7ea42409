pub mod api;
pub mod calendar;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod mail;
pub mod models;
pub mod seed;
pub mod services;
pub mod session;
pub mod state;
pub mod uploads;
