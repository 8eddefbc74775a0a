//! # Triage Kit
//!
//! Core of a diagnosis-assistant service: users submit symptoms, get
//! diagnoses from an external medical knowledge service, and accumulate a
//! per-user history of diagnosis sessions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐      ┌───────────────┐
//! │  operations  │─────▶│ HistoryStore  │──┐
//! │ (per request)│      └───────────────┘  │   ┌─────────────┐
//! │              │      ┌───────────────┐  ├──▶│  BlobStore  │
//! │              │─────▶│ CatalogCache  │──┘   │ S3 / FS /   │
//! │              │      └──────┬────────┘      │ in-memory   │
//! │              │             ▼               └─────────────┘
//! │              │      ┌───────────────┐
//! │              │─────▶│ KnowledgeClnt │──▶ external service
//! └──────────────┘      └───────────────┘
//! ```
//!
//! The blob backend has no transactions: history mutations are full
//! read-modify-write document replaces and race under concurrent writers for
//! the same user (documented in [`history`]). The symptom catalog is cached
//! for a day of elapsed time and refreshed wholesale ([`catalog`]).
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`identity`] | Caller identity record and unverified token decoding |
//! | [`storage`] | Blob backend abstraction |
//! | [`storage_fs`] | Filesystem blob backend |
//! | [`storage_s3`] | Amazon S3 blob backend |
//! | [`storage_memory`] | In-memory blob backend for tests |
//! | [`history`] | Per-user diagnosis history |
//! | [`knowledge`] | External knowledge service client |
//! | [`catalog`] | Symptom catalog cache |
//! | [`ops`] | Per-request operations |

pub mod catalog;
pub mod config;
pub mod error;
pub mod history;
pub mod identity;
pub mod knowledge;
pub mod models;
pub mod ops;
pub mod storage;
pub mod storage_fs;
pub mod storage_memory;
pub mod storage_s3;
