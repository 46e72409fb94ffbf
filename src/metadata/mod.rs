//! ECMA-335 metadata: headers, streams and the tables the patcher reads and rewrites.
//!
//! # Key Components
//!
//! - [`cor20header`] - The CLR header pointing at the metadata
//! - [`root`] - The metadata root and its stream directory
//! - [`streams`] - The `#Strings` heap and the tables stream header
//! - [`tables`] - Table ids, index widths and raw rows
//! - [`layout`] - Absolute locations of all of the above within an image
//! - [`attributes`] - Type, field and method attribute bitmasks
//! - [`token`] - Metadata table row references

pub mod attributes;
pub mod cor20header;
pub mod layout;
pub mod root;
pub mod streams;
pub mod tables;
pub mod token;
