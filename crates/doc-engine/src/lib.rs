#![warn(missing_docs)]
//! Doc Engine - Headless Document Editing Kernel
//!
//! # Overview
//!
//! `doc-engine` is the editing core of a programmer's text editor with the
//! platform chrome cut away: no rendering, no windows, no I/O. A host feeds
//! it edits and commands, drains value events, and draws whatever the engine
//! reports as dirty. Everything that is hard about an editor lives here:
//! keeping the line index, lexer states, wrap points, selection, and undo
//! history consistent under every mutation, in the presence of multi-byte
//! text, rectangular selections, and pluggable language-aware styling.
//!
//! # Core Features
//!
//! - **Text buffer**: rope-backed storage with character-offset addressing,
//!   Unicode-aware word walks, and built-in search
//! - **Incremental rewrap**: per-edit line-index repair scoped to the
//!   affected soft-wrap paragraph, threading lexer state line to line
//! - **Selections**: stream (anchor/caret) and rectangular (line x visual
//!   column), with tab-splitting block edit semantics
//! - **Undo/redo**: named actions that coalesce keystroke runs, with
//!   save-point tracking
//! - **Search/replace**: literal and regex, single-match, find-all,
//!   aggregated replace-all, incremental "fast find"
//! - **Smart editing**: auto-indent, smart indent, bracket-match flash,
//!   entab/detab, comment toggle, cross-document word completion
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  DocumentRegistry (session)                 │  ← Cross-document features
//! ├─────────────────────────────────────────────┤
//! │  Document (façade + smart editing)          │  ← Host-facing API
//! ├─────────────────────────────────────────────┤
//! │  Selection │ UndoManager │ Search           │  ← Editing state
//! ├─────────────────────────────────────────────┤
//! │  LineIndex (incremental rewrap)             │  ← Line access
//! ├─────────────────────────────────────────────┤
//! │  TextBuffer (rope storage)                  │  ← Text storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The `Language` plugin (styling, balancing, keywords) and the `Device`
//! metrics provider (cell widths, break positions) plug in at the bottom;
//! plugin panics degrade to plain styling instead of aborting an edit.
//!
//! # Quick Start
//!
//! ```rust
//! use doc_engine::{Direction, Document, SearchOptions, Selection};
//!
//! let mut doc = Document::new("hello world\n");
//!
//! // Type at the end of the first word.
//! doc.set_selection(Selection::caret(5));
//! doc.type_char(',');
//! assert_eq!(doc.text(), "hello, world\n");
//!
//! // One undo removes the whole typing run.
//! assert!(doc.undo());
//! assert_eq!(doc.text(), "hello world\n");
//!
//! // Search selects matches.
//! assert!(doc.find_first("world", SearchOptions::default()));
//! assert_eq!(doc.selection(), Selection::stream(6, 11));
//! assert!(!doc.find_next(Direction::Forward));
//! ```

pub mod buffer;
pub mod device;
pub mod document;
pub mod line_ending;
pub mod line_index;
pub mod persist;
pub mod registry;
pub mod search;
pub mod selection;
pub mod undo;

pub use buffer::{Direction, Granularity, TextBuffer};
pub use device::{Device, MonospaceDevice, DEFAULT_TAB_WIDTH};
pub use document::{DocEvent, Document, FindAllMatch};
pub use line_ending::{Encoding, LineEnding};
pub use line_index::{Edit, LineFlag, LineIndex, LineInfo, WrapConfig};
pub use persist::{PersistedState, PERSISTED_STATE_LEN};
pub use registry::{DocId, DocumentRegistry};
pub use search::{FastFind, PatternError, SearchMatch, SearchOptions};
pub use selection::Selection;
pub use undo::{EditOp, UndoManager, UndoRecord};

pub use doc_engine_lang as lang;
