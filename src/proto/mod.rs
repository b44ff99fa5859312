//! Hand-written protobuf message definitions for the wire protocol (spec
//! §6, module A: "wire codec shim").
//!
//! These are written directly against `prost::Message` rather than
//! generated from `.proto` sources via a `build.rs`/`protoc` step, the
//! same fallback the real SDK's own WASM build target uses when a
//! protobuf compiler isn't available. Only the message shapes this
//! crate's in-scope transaction/query types actually touch are included;
//! the full service catalog (file, smart-contract, schedule, token,
//! network, freeze, util) lives outside this crate's scope.

pub(crate) mod grpc;
pub(crate) mod services;
