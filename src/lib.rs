//! # DAWSON Extractor
//!
//! Incremental downloader for public court documents from the DAWSON
//! (U.S. Tax Court) case-management API.
//!
//! Each run searches for dockets by keyword, visits them in random order,
//! keeps the public PDF entries whose document type matches the configured
//! categories, and downloads the ones not already on disk. Documents are
//! stored as PDF + JSON sidecar pairs under a timestamped run folder.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌───────────────┐
//! │  ApiClient │──▶│  Extraction  │──▶│ DocumentWriter │
//! │ rate limit │   │ match+dedup  │   │  PDF + .json   │
//! └─────┬──────┘   └──────┬───────┘   └───────────────┘
//!       │                 │ ExistingIndex (walk of output root)
//!       ▼                 ▼
//!  ┌──────────┐     ┌──────────┐
//!  │ Discovery│     │ Summary  │
//!  │ catalog  │     │ counters │
//!  └──────────┘     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dawson                 # download using ./dawson.toml (or defaults)
//! dawson 25              # download 25 new documents
//! dawson --discover      # catalog document types seen on sampled dockets
//! dawson --list-types    # print the saved catalog
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`client`] | Rate-limited API client and HTTP transport |
//! | [`matcher`] | Document type matching |
//! | [`index`] | Existing-document index |
//! | [`extract`] | Extraction orchestration |
//! | [`download`] | Document download and file layout |
//! | [`discover`] | Type discovery and catalog |
//! | [`summary`] | Run counters and summaries |
//! | [`progress`] | Progress reporting |
//! | [`models`] | Wire and domain types |
//! | [`error`] | Error types |

pub mod client;
pub mod config;
pub mod discover;
pub mod download;
pub mod error;
pub mod extract;
pub mod index;
pub mod matcher;
pub mod models;
pub mod progress;
pub mod summary;
