// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that name the concepts of moment grounding:
//   - the error taxonomy every lower layer reports with
//   - a temporal moment (start/end clip indices) and its IoU
//   - the sample-source abstraction the data layer implements
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Typed errors shared by the data and ml layers
pub mod error;

// A predicted or annotated moment inside a video
pub mod moment;

// One annotated (video, query) example
pub mod sample;

// Core abstractions (traits) that other layers implement
pub mod traits;
