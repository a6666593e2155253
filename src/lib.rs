//! This crate provides the client-side logic of a community events site.
//!
//! Visitors submit events without having an account. The server records them and assigns them an ID, that the visitor's browser
//! keeps in an ownership cookie, so that the same browser can edit these events later on.
//!
//! * the [`ledger`] module reads and writes this cookie, and prunes it against the canonical dataset (see [`ledger::load_ownership`])
//! * the [`annotator`] module adds "edit" links to the rows of a rendered page, for the events this visitor owns
//! * the [`validation`] module checks the submission form, with Swedish messages
//! * the [`submission`] module drives a form from its validation to the answer of the server
//!
//! Everything that talks to the outside world (browser, network, wall clock) goes through the [`traits`] module. \
//! The [`client`] module provides an HTTP implementation of these traits, the [`mock`] module an in-memory one.

pub mod traits;
pub mod config;

pub mod event;
pub use event::{Event, EventId};

pub mod cookie;
pub mod consent;
pub mod ledger;
pub mod annotator;
pub mod validation;
pub mod submission;

pub mod client;
pub mod mock;
