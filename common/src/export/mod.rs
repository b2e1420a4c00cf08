//! Export core modules shared by the layout engine and the PDF writer.

pub mod card_core;
