// Copyright (c) 2017 Blockfreight, Inc. MIT License.
// See LICENSE for details.

//! # BF_TX Protocol Core Library
//!
//! Identity and lifecycle engine for Blockfreight shipment transactions.
//! A BF_TX record is a bill of lading plus the chain-anchored ID it was
//! assigned at construction and a small set of lifecycle flags. This crate
//! derives those IDs, enforces the order in which records may be signed,
//! broadcast and amended, and keeps the local store and the consensus
//! network in step.
//!
//! ## Architecture
//!
//! - **transaction**: Content, records, ID derivation, validation, signing.
//! - **lifecycle**: The state machine over the three collaborators below.
//! - **storage**: `RecordStore` trait and the sled-backed `BftxDb`.
//! - **network**: `ChainClient` trait and the Tendermint JSON-RPC client.
//! - **crypto**: Hashing and Ed25519 keys.
//! - **config**: Record format constants and defaults.
//!
//! ## Design Philosophy
//!
//! 1. Collaborators are passed in, never looked up. Tests swap any of them.
//! 2. Guards are checked against the store on every call; there is no
//!    in-process cache of record state.
//! 3. `verified` and `transmitted` only ever go from false to true.

pub mod config;
pub mod crypto;
pub mod lifecycle;
pub mod network;
pub mod storage;
pub mod transaction;

pub use lifecycle::{Lifecycle, LifecycleError};
