pub mod adapt;
pub mod app;
pub mod config;
pub mod dag;
pub mod db;
pub mod domain;
pub mod error;
pub mod fasta;
pub mod filter;
pub mod fs_util;
pub mod output;
pub mod submit;
pub mod tsv;
pub mod update;
