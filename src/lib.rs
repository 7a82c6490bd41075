// src/lib.rs

#![doc = r#"
# mdpreview

Renders a markdown file to HTML and keeps a browser tab in sync with it.

In watch mode a filesystem watcher feeds a debouncer, which re-renders the
document once per burst of changes, swaps the result into a shared artifact
cell, and pushes a server-sent event to every open tab. The tab then fetches
the new artifact.

## Modules

- [`config`]: Configuration loading and merging from CLI, file, and environment.
- [`event`]: Change events and the settled-update signal.
- [`watcher`]: Filesystem watcher for the previewed document.
- [`debounce`]: Burst collapsing and re-rendering.
- [`artifact`]: The shared, lock-protected rendered artifact.
- [`fanout`]: Lossy one-slot broadcast of update signals.
- [`web`]: Snapshot and event-stream HTTP endpoints.
- [`lifecycle`]: Loopback binding and the session shutdown signal.
- [`render`], [`highlight`], [`page`]: Markdown to HTML.
- [`browser`]: Opening the result.
- [`observer`]: Where recoverable errors are reported.
"#]

pub mod artifact;
pub mod browser;
pub mod config;
pub mod debounce;
pub mod error;
pub mod event;
pub mod fanout;
pub mod highlight;
pub mod lifecycle;
pub mod observer;
pub mod page;
pub mod render;
pub mod watcher;
pub mod web;
