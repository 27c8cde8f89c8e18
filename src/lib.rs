// Library root
// -----------
// This crate exposes the upload core as a library; the binary (`main.rs`)
// only parses arguments, wires the pieces together and maps the result to
// an exit code.
//
// Module responsibilities:
// - `target`, `request`, `multipart`: what gets sent and how it is encoded.
// - `progress`: byte counting, throughput sampling and the status line.
// - `api`: the HTTP upload itself.
// - `credential`, `config`: the saved userhash and runtime settings.
// - `cli`, `ui`: argument parsing, prompts and the upload flow.
pub mod api;
pub mod cli;
pub mod config;
pub mod credential;
pub mod error;
pub mod multipart;
pub mod progress;
pub mod request;
pub mod target;
pub mod ui;
